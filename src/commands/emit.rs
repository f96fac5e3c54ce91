//! Emit an event document read from a file or stdin

use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use lineage_client::LineageEvent;

use crate::cli::TargetArgs;

pub fn run(file: Option<PathBuf>, target: &TargetArgs, config_path: Option<&Path>) -> Result<()> {
    let content = match file {
        Some(ref path) if path.as_os_str() != "-" => {
            fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?
        }
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            buf
        }
    };

    let value: serde_json::Value = serde_json::from_str(&content).context("Event is not valid JSON")?;
    let event = LineageEvent::from_json(value)?;

    let client = super::build_client(target, config_path)?;
    let summary = match event {
        LineageEvent::Run(ref run) => format!("{} {}.{}", run.event_type.as_str(), run.job.namespace, run.job.name),
        ref other => other.kind().to_string(),
    };
    client.emit(event).context("Failed to emit event")?;

    eprintln!("{} Emitted {} via {}", "✓".green(), summary, client.transport().kind().cyan());
    Ok(())
}
