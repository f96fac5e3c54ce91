//! File transport
//!
//! With `append` set, events go to a single JSONL file. Otherwise each event
//! is written to its own file named `<log_file_path>-<timestamp>.json`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::TransportError;
use crate::event::RunEvent;
use crate::transport::Transport;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileConfig {
    pub log_file_path: PathBuf,
    #[serde(default)]
    pub append: bool,
}

pub struct FileTransport {
    config: FileConfig,
    // serializes appends so concurrent emits never interleave lines
    write_lock: Mutex<()>,
}

impl FileTransport {
    pub fn new(config: FileConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// Timestamp suffix for per-event file names
    fn stamp() -> String {
        Utc::now().format("%Y%m%d-%H%M%S%.6f").to_string()
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// `<base>-<stamp>.json`, or `<base>-<stamp>-<n>.json` for later attempts
fn stamped_path(base: &Path, stamp: &str, attempt: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    if attempt == 0 {
        name.push(format!("-{}.json", stamp));
    } else {
        name.push(format!("-{}-{}.json", stamp, attempt));
    }
    PathBuf::from(name)
}

/// Create a per-event file that did not exist before
///
/// Two events stamped with the same instant get distinct files; an existing
/// file is never opened.
fn create_unique(base: &Path, stamp: &str) -> std::io::Result<(PathBuf, File)> {
    let mut attempt = 0;
    loop {
        let path = stamped_path(base, stamp, attempt);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

impl Transport for FileTransport {
    fn emit(&self, event: &RunEvent) -> Result<(), TransportError> {
        let json = serde_json::to_string(event)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let base = &self.config.log_file_path;
        ensure_parent(base)?;

        let (path, mut file) = if self.config.append {
            (base.clone(), OpenOptions::new().create(true).append(true).open(base)?)
        } else {
            create_unique(base, &Self::stamp())?
        };
        writeln!(file, "{}", json)?;

        log::debug!("Wrote {} event to {}", event.event_type.as_str(), path.display());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "file"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
