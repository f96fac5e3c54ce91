//! Integration tests for clients built from the process environment
//!
//! These tests change process-wide state (variables, working directory, HOME),
//! so each one holds `ENV_LOCK` for its whole duration.

use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use lineage_client::transport::factory::{ENV_API_KEY, ENV_DISABLED, ENV_URL};
use lineage_client::transport::{FileTransport, HttpTransport};
use lineage_client::{ClientInit, DefaultTransportFactory, LineageClient};
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Lock the process environment and point it at `dir`
///
/// Every `OPENLINEAGE_*` variable is removed, HOME and the working directory
/// become `dir`, so no config file outside the test is discovered.
fn isolated_env(dir: &Path) -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let lineage_keys: Vec<_> = std::env::vars_os()
        .map(|(k, _)| k)
        .filter(|k| k.as_bytes().starts_with(b"OPENLINEAGE_"))
        .collect();
    unsafe {
        for key in lineage_keys {
            std::env::remove_var(key);
        }
        std::env::set_var("HOME", dir);
    }
    std::env::set_current_dir(dir).unwrap();

    guard
}

fn set_var(key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
    unsafe { std::env::set_var(key, value) }
}

fn remove_var(key: impl AsRef<OsStr>) {
    unsafe { std::env::remove_var(key) }
}

#[test]
fn test_from_environment_matches_default_init() {
    let dir = TempDir::new().unwrap();
    let _guard = isolated_env(dir.path());
    set_var(ENV_URL, "http://marquez:5000");

    let from_env = LineageClient::from_environment().unwrap();
    let by_default = LineageClient::new(ClientInit::Default, &DefaultTransportFactory::from_process_env()).unwrap();

    remove_var(ENV_URL);

    assert_eq!(from_env.transport().kind(), "http");
    assert_eq!(from_env.transport().kind(), by_default.transport().kind());
    let from_env_config = from_env.transport_as::<HttpTransport>().unwrap().config();
    let default_config = by_default.transport_as::<HttpTransport>().unwrap().config();
    assert_eq!(from_env_config.url, "http://marquez:5000");
    assert_eq!(from_env_config.url, default_config.url);
    assert_eq!(from_env_config.target_url(), default_config.target_url());
}

#[test]
fn test_from_environment_reads_config_in_working_directory() {
    let dir = TempDir::new().unwrap();
    let _guard = isolated_env(dir.path());
    let events = dir.path().join("events.jsonl");
    fs::write(
        dir.path().join("openlineage.yml"),
        format!("transport:\n  type: file\n  log_file_path: {}\n", events.display()),
    )
    .unwrap();

    let from_env = LineageClient::from_environment().unwrap();
    let by_default = LineageClient::new(ClientInit::Default, &DefaultTransportFactory::from_process_env()).unwrap();

    assert_eq!(from_env.transport().kind(), "file");
    assert_eq!(by_default.transport().kind(), "file");
    assert_eq!(from_env.transport_as::<FileTransport>().unwrap().config().log_file_path, events);
}

#[test]
fn test_from_environment_disabled_is_noop() {
    let dir = TempDir::new().unwrap();
    let _guard = isolated_env(dir.path());
    set_var(ENV_DISABLED, "true");
    set_var(ENV_URL, "http://marquez:5000");

    let client = LineageClient::from_environment();

    remove_var(ENV_DISABLED);
    remove_var(ENV_URL);

    assert_eq!(client.unwrap().transport().kind(), "noop");
}

#[test]
fn test_from_environment_skips_non_utf8_variables() {
    let dir = TempDir::new().unwrap();
    let _guard = isolated_env(dir.path());
    let not_utf8 = OsStr::from_bytes(b"\xff\xfe");
    set_var(ENV_URL, "http://marquez:5000");
    set_var(ENV_API_KEY, not_utf8);
    set_var("LINEAGE_TEST_UNRELATED", not_utf8);

    let client = LineageClient::from_environment();

    remove_var(ENV_URL);
    remove_var(ENV_API_KEY);
    remove_var("LINEAGE_TEST_UNRELATED");

    let client = client.unwrap();
    let config = client.transport_as::<HttpTransport>().unwrap().config();
    assert_eq!(config.url, "http://marquez:5000");
    assert!(config.api_key.is_none());
}
