use colored::*;
use eyre::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lineage_client::config::{self, LineageConfig};
use lineage_client::{HttpConfig, TransportFactory};
use lineage_client::transport::HttpTransport;

use crate::cli::{ConfigAction, OutputFormat};

pub fn run(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config_path),
    }
}

/// What `config show` reports
#[derive(Debug, Serialize)]
struct Resolved {
    config_file: Option<PathBuf>,
    log_level: String,
    transport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transport_config: Option<serde_yaml::Value>,
    environment: HashMap<String, String>,
}

fn resolve(config_path: Option<&Path>) -> Result<Resolved> {
    let env = config::lineage_env();
    let environment = env
        .iter()
        .map(|(k, v)| {
            let shown = if k.contains("API_KEY") { "****".to_string() } else { v.clone() };
            (k.clone(), shown)
        })
        .collect();

    let (file_config, config_file) = LineageConfig::load(config_path, &env, &config::default_search_paths())
        .context("Failed to load configuration")?;

    let transport = super::transport_factory(config_path)
        .create()
        .context("Failed to resolve transport")?;
    let target_url = transport
        .as_any()
        .downcast_ref::<HttpTransport>()
        .map(|http| http.config())
        .map(HttpConfig::target_url);

    Ok(Resolved {
        config_file,
        log_level: file_config.log_level.as_filter().to_string(),
        transport: transport.kind().to_string(),
        target_url,
        transport_config: file_config.transport,
        environment,
    })
}

fn show(format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
    let resolved = resolve(config_path)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&resolved)?);
        }
        OutputFormat::Text => {
            println!("{}", "Lineage Configuration".bold());
            println!();

            println!("{}:", "config".cyan());
            match resolved.config_file {
                Some(ref path) => println!("  file: {}", path.display()),
                None => println!("  file: {}", "(none found)".dimmed()),
            }
            println!("  log_level: {}", resolved.log_level);
            println!();

            println!("{}:", "transport".cyan());
            println!("  type: {}", resolved.transport.green());
            if let Some(ref url) = resolved.target_url {
                println!("  url: {}", url);
            }
            println!();

            if !resolved.environment.is_empty() {
                println!("{}:", "environment".cyan());
                let mut keys: Vec<&String> = resolved.environment.keys().collect();
                keys.sort();
                for key in keys {
                    println!("  {}={}", key, resolved.environment[key]);
                }
            }
        }
    }

    Ok(())
}
