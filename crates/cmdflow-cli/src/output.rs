use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an aligned table. Columns whose cells are all numeric are
/// right-aligned; widths count chars so arrows in sequences line up.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    for line in render_table(headers, &rows) {
        println!("{line}");
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    let mut numeric = vec![!rows.is_empty(); cols];
    for row in rows {
        for (i, cell) in row.iter().take(cols).enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
            numeric[i] &= is_numeric(cell);
        }
    }

    let pad = |i: usize, text: &str| {
        let fill = widths[i].saturating_sub(text.chars().count());
        if numeric[i] {
            format!("{}{text}", " ".repeat(fill))
        } else {
            format!("{text}{}", " ".repeat(fill))
        }
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let header: Vec<String> = headers.iter().enumerate().map(|(i, h)| pad(i, h)).collect();
    lines.push(header.join("  ").trim_end().to_string());
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    lines.push(rule.join("  "));
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .take(cols)
            .enumerate()
            .map(|(i, c)| pad(i, c))
            .collect();
        lines.push(cells.join("  ").trim_end().to_string());
    }
    lines
}

fn is_numeric(cell: &str) -> bool {
    let body = cell.trim_end_matches(['%', 's']);
    !body.is_empty() && body.parse::<f64>().is_ok()
}

/// Format an optional millisecond value as seconds, `-` when unknown.
pub fn fmt_ms(ms: Option<f64>) -> String {
    match ms {
        Some(ms) => format!("{:.1}s", ms / 1000.0),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_align_right() {
        let rows = vec![
            vec!["/fix → /test".to_string(), "3".to_string()],
            vec!["/a → /b".to_string(), "12".to_string()],
        ];
        let lines = render_table(&["PATTERN", "COUNT"], &rows);
        assert_eq!(lines[0], "PATTERN       COUNT");
        assert_eq!(lines[1], "------------  -----");
        assert_eq!(lines[2], "/fix → /test      3");
        assert_eq!(lines[3], "/a → /b          12");
    }

    #[test]
    fn placeholder_keeps_column_left_aligned() {
        let rows = vec![vec!["-".to_string()], vec!["1.5s".to_string()]];
        let lines = render_table(&["SAVES"], &rows);
        assert_eq!(lines[2], "-");
        assert_eq!(lines[3], "1.5s");
    }

    #[test]
    fn ms_formatting() {
        assert_eq!(fmt_ms(Some(1500.0)), "1.5s");
        assert_eq!(fmt_ms(None), "-");
    }
}
