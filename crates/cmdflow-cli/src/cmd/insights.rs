use super::{block_on, open_recognizer};
use crate::output::{print_json, print_table};
use anyhow::Context;
use cmdflow_core::insights::TimeBucket;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let recognizer = open_recognizer(root)?;
    let report = block_on(recognizer.get_pattern_insights())?
        .context("failed to build insights")?;

    if json {
        print_json(&report)?;
        return Ok(());
    }

    println!("Frequent patterns: {}", report.total_patterns);

    if !report.top_patterns.is_empty() {
        println!();
        let rows = report
            .top_patterns
            .iter()
            .map(|p| {
                vec![
                    p.sequence().describe(),
                    p.frequency.to_string(),
                    p.last_seen.format("%Y-%m-%d %H:%M").to_string(),
                ]
            })
            .collect();
        print_table(&["TOP PATTERN", "FREQUENCY", "LAST SEEN"], rows);
    }

    if !report.error_patterns.is_empty() {
        println!();
        let rows = report
            .error_patterns
            .iter()
            .map(|e| {
                vec![
                    e.trigger_command.clone(),
                    e.failure_command.clone(),
                    e.count.to_string(),
                    e.error_messages.join(" | "),
                ]
            })
            .collect();
        print_table(&["AFTER", "FAILS", "COUNT", "MESSAGES"], rows);
    }

    if !report.time_patterns.is_empty() {
        println!();
        let rows = report
            .time_patterns
            .iter()
            .map(|t| {
                let when = match &t.bucket {
                    TimeBucket::HourOfDay { hour } => format!("{hour:02}:00 UTC"),
                    TimeBucket::DayOfWeek { day } => day.clone(),
                };
                vec![t.command.clone(), when, t.count.to_string()]
            })
            .collect();
        print_table(&["COMMAND", "PEAK", "COUNT"], rows);
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for r in &report.recommendations {
            println!("  - {}", r.message);
        }
    }
    Ok(())
}
