//! Configuration file handling
//!
//! A config file is YAML with an optional `transport` section (built through
//! the transport registry) and an optional `log_level` used by the CLI:
//!
//! ```yaml
//! transport:
//!   type: http
//!   url: http://localhost:5000
//!   auth:
//!     type: api_key
//!     api_key: secret
//! log_level: info
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ClientError;

pub const CONFIG_FILE_NAME: &str = "openlineage.yml";
pub const ENV_CONFIG: &str = "OPENLINEAGE_CONFIG";
pub const ENV_PREFIX: &str = "OPENLINEAGE_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Contents of a lineage config file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LineageConfig {
    /// Raw transport section; its `type` picks the registry builder
    pub transport: Option<serde_yaml::Value>,
    pub log_level: LogLevel,
}

impl LineageConfig {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise the first existing file of
    /// `$OPENLINEAGE_CONFIG` and `search_paths` is used, and defaults apply
    /// when none exists.
    pub fn load(
        config_path: Option<&Path>,
        env: &HashMap<String, String>,
        search_paths: &[PathBuf],
    ) -> Result<(Self, Option<PathBuf>), ClientError> {
        if let Some(path) = config_path {
            let path = expand_path(path);
            return Ok((Self::load_from_file(&path)?, Some(path)));
        }

        match Self::find(env, search_paths) {
            Some(path) => Ok((Self::load_from_file(&path)?, Some(path))),
            None => {
                log::debug!("No config file found, using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// First existing config file, `$OPENLINEAGE_CONFIG` before the search paths
    pub fn find(env: &HashMap<String, String>, search_paths: &[PathBuf]) -> Option<PathBuf> {
        if let Some(env_path) = env.get(ENV_CONFIG) {
            let path = expand_path(Path::new(env_path));
            if path.is_file() {
                return Some(path);
            }
            log::warn!("{} points to {}, which does not exist", ENV_CONFIG, path.display());
        }

        search_paths.iter().find(|p| p.is_file()).cloned()
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ClientError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read {}: {}", path.display(), e)))?;

        // An empty file is a valid, empty config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        log::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Transport `type` named in the file, if any
    pub fn transport_type(&self) -> Option<&str> {
        self.transport.as_ref()?.get("type")?.as_str()
    }
}

/// `OPENLINEAGE_*` variables of the current process
///
/// Variables whose name or value is not valid UTF-8 are skipped.
pub fn lineage_env() -> HashMap<String, String> {
    lineage_vars(std::env::vars_os())
}

fn lineage_vars<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(k, v)| {
            let key = k.into_string().ok()?;
            if !key.starts_with(ENV_PREFIX) {
                return None;
            }
            match v.into_string() {
                Ok(value) => Some((key, value)),
                Err(_) => {
                    log::warn!("Ignoring {}: value is not valid UTF-8", key);
                    None
                }
            }
        })
        .collect()
}

/// Config file locations searched when `$OPENLINEAGE_CONFIG` is unset
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CONFIG_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".openlineage").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Expand a path that may contain ~ or env vars
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = LineageConfig::default();
        assert!(config.transport.is_none());
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "openlineage.yml", "transport:\n  type: console\nlog_level: debug\n");

        let config = LineageConfig::load_from_file(&path).unwrap();
        assert_eq!(config.transport_type(), Some("console"));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "openlineage.yml", "\n");

        let config = LineageConfig::load_from_file(&path).unwrap();
        assert!(config.transport.is_none());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "openlineage.yml", "transport: [unclosed\n");

        let err = LineageConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_env_path_wins_over_search_paths() {
        let dir = TempDir::new().unwrap();
        let env_file = write_config(&dir, "env.yml", "transport:\n  type: noop\n");
        let searched = write_config(&dir, "searched.yml", "transport:\n  type: console\n");
        let env = HashMap::from([(ENV_CONFIG.to_string(), env_file.display().to_string())]);

        let found = LineageConfig::find(&env, &[searched]);
        assert_eq!(found, Some(env_file));
    }

    #[test]
    fn test_missing_env_path_falls_back_to_search_paths() {
        let dir = TempDir::new().unwrap();
        let searched = write_config(&dir, "searched.yml", "transport:\n  type: console\n");
        let env = HashMap::from([(
            ENV_CONFIG.to_string(),
            "/nonexistent/openlineage.yml".to_string(),
        )]);

        let found = LineageConfig::find(&env, &[dir.path().join("missing.yml"), searched.clone()]);
        assert_eq!(found, Some(searched));
    }

    #[test]
    fn test_load_without_any_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let (config, path) = LineageConfig::load(None, &HashMap::new(), &[dir.path().join(CONFIG_FILE_NAME)]).unwrap();
        assert!(path.is_none());
        assert!(config.transport.is_none());
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let result = LineageConfig::load(Some(Path::new("/nonexistent/lineage.yml")), &HashMap::new(), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/bin");
        assert_eq!(expand_path(&path), PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = expand_path(Path::new("~/test"));
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("test"));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Off.as_filter(), "off");
    }

    #[test]
    fn test_lineage_vars_skips_non_utf8_and_foreign_vars() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (OsString::from("OPENLINEAGE_URL"), OsString::from("http://marquez:5000")),
            (OsString::from("OPENLINEAGE_API_KEY"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(vec![0xff, 0xfe]), OsString::from("x")),
            (OsString::from("PATH"), OsString::from("/usr/bin")),
        ];

        let env = lineage_vars(vars);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("OPENLINEAGE_URL").map(String::as_str), Some("http://marquez:5000"));
    }
}
