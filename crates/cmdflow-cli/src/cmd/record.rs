use super::{block_on, open_store};
use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use cmdflow_core::config::Config;
use cmdflow_core::types::{ExecutionRecord, ParameterMap, Parameters, Scalar};
use cmdflow_core::ExecutionStore;
use std::path::Path;

#[derive(Args)]
pub struct RecordArgs {
    /// Command that finished (e.g. /fix)
    pub command: String,

    /// Mark the execution as failed
    #[arg(long)]
    pub failed: bool,

    /// Wall-clock duration in milliseconds
    #[arg(long)]
    pub duration_ms: Option<u64>,

    /// Parameter as key=value (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Parameters as a raw JSON object (kept unparsed)
    #[arg(long, conflicts_with = "params")]
    pub params_json: Option<String>,

    /// Error message of a failed execution
    #[arg(long)]
    pub error: Option<String>,

    /// Completion time as RFC 3339 (default: now)
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run(root: &Path, args: RecordArgs, json: bool) -> anyhow::Result<()> {
    // Refuse to create a database in an uninitialized project.
    Config::load(root).context("failed to load config")?;

    let timestamp = match &args.at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --at timestamp '{raw}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let mut record = if args.failed {
        ExecutionRecord::failure(&args.command, timestamp, args.error.clone())
    } else {
        if args.error.is_some() {
            tracing::warn!("--error ignored for a successful execution");
        }
        ExecutionRecord::success(&args.command, timestamp)
    };
    if let Some(ms) = args.duration_ms {
        record = record.with_duration(ms);
    }
    if let Some(raw) = args.params_json {
        record = record.with_parameters(Parameters::Raw(raw));
    } else if !args.params.is_empty() {
        record = record.with_parameters(Parameters::Map(parse_params(&args.params)?));
    }

    let store = open_store(root)?;
    block_on(store.record_execution(&record))?.context("failed to record execution")?;

    if json {
        print_json(&record)?;
    } else {
        println!(
            "Recorded {} ({}) at {}",
            record.command,
            record.outcome,
            record.timestamp.to_rfc3339()
        );
    }
    Ok(())
}

fn parse_params(raw: &[String]) -> anyhow::Result<ParameterMap> {
    let mut map = ParameterMap::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            anyhow::bail!("parameter '{item}' must be KEY=VALUE");
        };
        if key.is_empty() {
            anyhow::bail!("parameter '{item}' has an empty key");
        }
        map.insert(key.to_string(), parse_scalar(value));
    }
    Ok(map)
}

fn parse_scalar(value: &str) -> Scalar {
    if let Ok(b) = value.parse::<bool>() {
        return Scalar::Bool(b);
    }
    if let Ok(i) = value.parse::<i64>() {
        return Scalar::Int(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return Scalar::Float(f);
    }
    Scalar::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_typed() {
        assert_eq!(parse_scalar("true"), Scalar::Bool(true));
        assert_eq!(parse_scalar("42"), Scalar::Int(42));
        assert_eq!(parse_scalar("0.5"), Scalar::Float(0.5));
        assert_eq!(parse_scalar("prod"), Scalar::Text("prod".into()));
    }

    #[test]
    fn params_need_equals() {
        assert!(parse_params(&["env".to_string()]).is_err());
        assert!(parse_params(&["=prod".to_string()]).is_err());
        let map = parse_params(&["env=prod".to_string(), "n=3".to_string()]).unwrap();
        assert_eq!(map.get("env"), Some(&Scalar::Text("prod".into())));
        assert_eq!(map.get("n"), Some(&Scalar::Int(3)));
    }

    #[test]
    fn value_may_contain_equals() {
        let map = parse_params(&["query=a=b".to_string()]).unwrap();
        assert_eq!(map.get("query"), Some(&Scalar::Text("a=b".into())));
    }
}
