use super::{block_on, open_recognizer};
use crate::output::print_json;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, commands: Vec<String>, json: bool) -> anyhow::Result<()> {
    let recognizer = open_recognizer(root)?;
    let hit = block_on(recognizer.check_for_pattern(&commands))?
        .context("failed to check pattern")?;

    if json {
        let value = serde_json::json!({
            "matched": hit.is_some(),
            "match": hit,
        });
        print_json(&value)?;
        return Ok(());
    }

    match hit {
        Some(m) => {
            println!(
                "Known pattern: {} (seen {} times, last {})",
                m.pattern.describe(),
                m.frequency,
                m.last_seen.format("%Y-%m-%d %H:%M UTC")
            );
            println!(
                "  suggestion: {} ({:.0}% confidence)",
                m.suggestion.name,
                m.suggestion.confidence * 100.0
            );
        }
        None => println!("No matching pattern."),
    }
    Ok(())
}
