//! Transport resolution from ambient configuration
//!
//! [`DefaultTransportFactory`] picks a transport in this order:
//! 1. `OPENLINEAGE_DISABLED` set to a truthy value - noop
//! 2. a config file with a `transport` section - built through the registry
//! 3. `OPENLINEAGE_URL` - http
//! 4. console, with a warning
//!
//! The environment is captured when the factory is created, so a factory
//! built with [`DefaultTransportFactory::with_env`] never reads process state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, LineageConfig};
use crate::error::ClientError;
use crate::transport::composite::{CompositeConfig, CompositeTransport};
use crate::transport::console::{ConsoleConfig, ConsoleTransport};
use crate::transport::file::{FileConfig, FileTransport};
use crate::transport::http::{HttpConfig, HttpSession, HttpSettings, HttpTransport};
use crate::transport::noop::NoopTransport;
use crate::transport::Transport;

pub const ENV_DISABLED: &str = "OPENLINEAGE_DISABLED";
pub const ENV_URL: &str = "OPENLINEAGE_URL";
pub const ENV_ENDPOINT: &str = "OPENLINEAGE_ENDPOINT";
pub const ENV_API_KEY: &str = "OPENLINEAGE_API_KEY";
pub const ENV_TIMEOUT: &str = "OPENLINEAGE_TIMEOUT";

/// Produces a transport when the caller does not supply one
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Transport>, ClientError>;
}

/// Builds a transport from its raw config section
pub type TransportBuilder = fn(&serde_yaml::Value, &TransportRegistry) -> Result<Arc<dyn Transport>, ClientError>;

/// Maps transport `type` names to builders
#[derive(Clone)]
pub struct TransportRegistry {
    builders: HashMap<String, TransportBuilder>,
}

impl TransportRegistry {
    /// A registry with no transports at all
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// A registry with http, console, file, composite and noop
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("http", build_http);
        registry.register("console", build_console);
        registry.register("file", build_file);
        registry.register("composite", build_composite);
        registry.register("noop", build_noop);
        registry
    }

    /// Register a builder, replacing any existing one for `kind`
    pub fn register(&mut self, kind: impl Into<String>, builder: TransportBuilder) {
        let kind = kind.into();
        if self.builders.insert(kind.clone(), builder).is_some() {
            log::debug!("Replaced transport builder for type '{}'", kind);
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    /// Registered type names, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Build a transport from a config section carrying a `type` key
    pub fn build(&self, section: &serde_yaml::Value) -> Result<Arc<dyn Transport>, ClientError> {
        let kind = section
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ClientError::Config("transport section has no 'type'".to_string()))?;

        let builder = self.builders.get(kind).ok_or_else(|| {
            ClientError::Config(format!(
                "unknown transport type '{}' (known: {})",
                kind,
                self.kinds().join(", ")
            ))
        })?;

        log::debug!("Building '{}' transport", kind);
        builder(section, self)
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn parse_section<T: serde::de::DeserializeOwned>(kind: &str, section: &serde_yaml::Value) -> Result<T, ClientError> {
    serde_yaml::from_value(section.clone())
        .map_err(|e| ClientError::Config(format!("invalid '{}' transport config: {}", kind, e)))
}

fn build_http(section: &serde_yaml::Value, _: &TransportRegistry) -> Result<Arc<dyn Transport>, ClientError> {
    let settings: HttpSettings = parse_section("http", section)?;
    Ok(Arc::new(HttpTransport::new(settings.into_config(HttpSession::new()))))
}

fn build_console(section: &serde_yaml::Value, _: &TransportRegistry) -> Result<Arc<dyn Transport>, ClientError> {
    let config: ConsoleConfig = parse_section("console", section)?;
    Ok(Arc::new(ConsoleTransport::new(config)))
}

fn build_file(section: &serde_yaml::Value, _: &TransportRegistry) -> Result<Arc<dyn Transport>, ClientError> {
    let mut file_config: FileConfig = parse_section("file", section)?;
    file_config.log_file_path = config::expand_path(&file_config.log_file_path);
    Ok(Arc::new(FileTransport::new(file_config)))
}

fn build_composite(
    section: &serde_yaml::Value,
    registry: &TransportRegistry,
) -> Result<Arc<dyn Transport>, ClientError> {
    let config: CompositeConfig = parse_section("composite", section)?;
    let transports = config
        .transports
        .iter()
        .map(|member| registry.build(member))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Arc::new(CompositeTransport::new(transports, config.continue_on_failure)))
}

fn build_noop(_: &serde_yaml::Value, _: &TransportRegistry) -> Result<Arc<dyn Transport>, ClientError> {
    Ok(Arc::new(NoopTransport::new()))
}

/// Resolves a transport from environment variables and config files
#[derive(Clone)]
pub struct DefaultTransportFactory {
    registry: TransportRegistry,
    env: HashMap<String, String>,
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
}

impl DefaultTransportFactory {
    /// Factory reading the current process environment and default config locations
    pub fn from_process_env() -> Self {
        Self::with_env(config::lineage_env()).with_search_paths(config::default_search_paths())
    }

    /// Factory using the given variables and no config search paths
    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self {
            registry: TransportRegistry::with_builtins(),
            env,
            search_paths: Vec::new(),
            config_file: None,
        }
    }

    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.search_paths = search_paths;
        self
    }

    /// Use this config file instead of searching for one
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    pub fn with_registry(mut self, registry: TransportRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry_mut(&mut self) -> &mut TransportRegistry {
        &mut self.registry
    }

    fn is_disabled(&self) -> bool {
        self.env
            .get(ENV_DISABLED)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    fn http_from_env(&self, url: &str) -> Result<HttpConfig, ClientError> {
        let mut config = HttpConfig::new(url);
        if let Some(endpoint) = self.env.get(ENV_ENDPOINT) {
            config.endpoint = endpoint.clone();
        }
        if let Some(api_key) = self.env.get(ENV_API_KEY).filter(|k| !k.is_empty()) {
            config.api_key = Some(api_key.clone());
        }
        if let Some(timeout) = self.env.get(ENV_TIMEOUT) {
            config.timeout = timeout
                .trim()
                .parse()
                .map_err(|_| ClientError::Config(format!("{} is not a number: '{}'", ENV_TIMEOUT, timeout)))?;
        }
        Ok(config)
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn create(&self) -> Result<Arc<dyn Transport>, ClientError> {
        if self.is_disabled() {
            log::info!("{} is set, lineage events will be dropped", ENV_DISABLED);
            return Ok(Arc::new(NoopTransport::new()));
        }

        let (config, path) = LineageConfig::load(self.config_file.as_deref(), &self.env, &self.search_paths)?;
        if let Some(section) = config.transport.as_ref() {
            log::debug!(
                "Using transport from {}",
                path.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
            );
            return self.registry.build(section);
        }

        if let Some(url) = self.env.get(ENV_URL).filter(|u| !u.is_empty()) {
            log::debug!("Using http transport from {}", ENV_URL);
            return Ok(Arc::new(HttpTransport::new(self.http_from_env(url)?)));
        }

        log::warn!("No lineage transport configured, falling back to console");
        Ok(Arc::new(ConsoleTransport::new(ConsoleConfig::default())))
    }
}
