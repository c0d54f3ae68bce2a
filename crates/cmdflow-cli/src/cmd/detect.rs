use super::{block_on, open_recognizer};
use crate::output::{fmt_ms, print_json, print_table};
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, window: Option<&str>, json: bool) -> anyhow::Result<()> {
    let recognizer = open_recognizer(root)?;
    let window = match window {
        Some(w) => w.to_string(),
        None => recognizer.config().default_window.to_string(),
    };

    let patterns = block_on(recognizer.detect_patterns(&window))?
        .with_context(|| format!("pattern detection over {window} failed"))?;

    if json {
        let value = serde_json::json!({
            "window": window,
            "patterns": patterns,
        });
        print_json(&value)?;
        return Ok(());
    }

    if patterns.is_empty() {
        println!("No patterns found in the last {window}.");
        return Ok(());
    }

    let rows = patterns
        .iter()
        .map(|p| {
            vec![
                p.sequence.describe(),
                p.count.to_string(),
                format!("{:.1}", p.score),
                format!("{:.0}%", p.avg_success_rate * 100.0),
                fmt_ms(p.suggestion.estimated_time_saved_ms),
                p.suggestion.name.clone(),
            ]
        })
        .collect();
    print_table(
        &["PATTERN", "COUNT", "SCORE", "SUCCESS", "SAVES", "SUGGESTED"],
        rows,
    );
    Ok(())
}
