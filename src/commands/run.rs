//! Build a run event from command line arguments and emit it

use colored::*;
use eyre::{Result, bail};
use std::path::Path;

use lineage_client::event::DEFAULT_PRODUCER;
use lineage_client::{Dataset, EventType, Job, Run, RunEvent};

use crate::cli::TargetArgs;

/// Inputs of the `run` command
pub struct RunArgs {
    pub event_type: EventType,
    pub namespace: String,
    pub job: String,
    pub run_id: Option<uuid::Uuid>,
    pub producer: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

pub fn run(args: RunArgs, print: bool, target: &TargetArgs, config_path: Option<&Path>) -> Result<()> {
    let event = build_event(args)?;

    if print {
        println!("{}", serde_json::to_string_pretty(&event)?);
        return Ok(());
    }

    let client = super::build_client(target, config_path)?;
    client.emit(event.clone())?;

    eprintln!(
        "{} {} run {} of {}.{}",
        "✓".green(),
        event.event_type.as_str().bold(),
        event.run.run_id.to_string().dimmed(),
        event.job.namespace,
        event.job.name.cyan()
    );
    Ok(())
}

fn build_event(args: RunArgs) -> Result<RunEvent> {
    let run = match args.run_id {
        Some(id) => Run::with_id(id),
        None => Run::new(),
    };
    let producer = args.producer.unwrap_or_else(|| DEFAULT_PRODUCER.to_string());
    let inputs = args.inputs.iter().map(|s| parse_dataset(s)).collect::<Result<Vec<_>>>()?;
    let outputs = args.outputs.iter().map(|s| parse_dataset(s)).collect::<Result<Vec<_>>>()?;

    Ok(RunEvent::new(args.event_type, run, Job::new(args.namespace, args.job), producer)
        .with_inputs(inputs)
        .with_outputs(outputs))
}

/// Parse `namespace:name`, splitting on the last colon so namespaces may be URIs
fn parse_dataset(spec: &str) -> Result<Dataset> {
    match spec.rsplit_once(':') {
        Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => Ok(Dataset::new(namespace, name)),
        _ => bail!("Invalid dataset '{}', expected namespace:name", spec),
    }
}
