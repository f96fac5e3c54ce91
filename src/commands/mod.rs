use eyre::{Context, Result};
use std::path::Path;

use lineage_client::{ClientInit, ClientOptions, DefaultTransportFactory, LineageClient};

use crate::cli::TargetArgs;

pub mod completions;
pub mod config;
pub mod emit;
pub mod run;

/// Factory honoring `--config` ahead of the environment and default locations
pub fn transport_factory(config_path: Option<&Path>) -> DefaultTransportFactory {
    let factory = DefaultTransportFactory::from_process_env();
    match config_path {
        Some(path) => factory.with_config_file(path.to_path_buf()),
        None => factory,
    }
}

/// Client for `--url` when given, otherwise from config and environment
pub fn build_client(target: &TargetArgs, config_path: Option<&Path>) -> Result<LineageClient> {
    let init = match target.url {
        Some(ref url) => {
            let defaults = ClientOptions::default();
            ClientInit::ByUrl {
                url: url.clone(),
                options: Some(ClientOptions {
                    timeout: target.timeout.unwrap_or(defaults.timeout),
                    verify: !target.insecure,
                    api_key: target.api_key.clone(),
                    adapter: None,
                }),
                session: None,
            }
        }
        None => ClientInit::Default,
    };

    let client =
        LineageClient::new(init, &transport_factory(config_path)).context("Failed to set up lineage transport")?;
    log::info!("Using {} transport", client.transport().kind());
    Ok(client)
}
