use super::{block_on, open_recognizer};
use crate::output::{print_json, print_table};
use anyhow::Context;
use cmdflow_core::SuggestionContext;
use std::path::Path;

pub fn run(
    root: &Path,
    recent: Vec<String>,
    current: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let recognizer = open_recognizer(root)?;
    let ctx = SuggestionContext::new(recent, current);
    let suggestions = block_on(recognizer.suggest_commands(&ctx))?
        .context("failed to compute suggestions")?;

    if json {
        print_json(&suggestions)?;
        return Ok(());
    }

    if suggestions.is_empty() {
        println!("No suggestions for this context.");
        return Ok(());
    }

    let rows = suggestions
        .iter()
        .map(|s| {
            vec![
                s.next_commands.join(" → "),
                format!("{:.0}%", s.confidence * 100.0),
                s.frequency.to_string(),
                s.pattern.describe(),
            ]
        })
        .collect();
    print_table(&["NEXT", "CONFIDENCE", "SEEN", "PATTERN"], rows);
    Ok(())
}
