//! Console transport
//!
//! Prints each event to stdout, either as compact JSON (the default, so the
//! output can be piped) or as the one-line colored summary.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::error::TransportError;
use crate::event::RunEvent;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    #[default]
    Json,
    Display,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub format: ConsoleFormat,
}

pub struct ConsoleTransport {
    config: ConsoleConfig,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleTransport {
    pub fn new(config: ConsoleConfig) -> Self {
        Self::with_writer(config, Box::new(io::stdout()))
    }

    /// Console transport writing somewhere other than stdout
    pub fn with_writer(config: ConsoleConfig, out: Box<dyn Write + Send>) -> Self {
        Self {
            config,
            out: Mutex::new(out),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }
}

impl Transport for ConsoleTransport {
    fn emit(&self, event: &RunEvent) -> Result<(), TransportError> {
        let line = match self.config.format {
            ConsoleFormat::Json => serde_json::to_string(event)?,
            ConsoleFormat::Display => event.format_display(),
        };

        // A poisoned lock only means another writer panicked mid-line
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "console"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventType, Job, Run};
    use std::sync::Arc;

    /// Writer that shares its buffer with the test
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn sample_event() -> RunEvent {
        RunEvent::new(EventType::Complete, Run::new(), Job::new("etl", "load"), "test")
    }

    #[test]
    fn test_console_json_line() {
        let buf = SharedBuf::default();
        let transport = ConsoleTransport::with_writer(ConsoleConfig::default(), Box::new(buf.clone()));
        let event = sample_event();

        transport.emit(&event).unwrap();

        let output = buf.contents();
        assert_eq!(output.lines().count(), 1);
        let parsed: RunEvent = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_console_display_line() {
        let buf = SharedBuf::default();
        let config = ConsoleConfig {
            format: ConsoleFormat::Display,
        };
        let transport = ConsoleTransport::with_writer(config, Box::new(buf.clone()));

        transport.emit(&sample_event()).unwrap();

        let output = buf.contents();
        assert!(output.contains("COMPLETE"));
        assert!(output.contains("etl.load"));
    }

    #[test]
    fn test_console_config_from_yaml() {
        let config: ConsoleConfig = serde_yaml::from_str("format: display").unwrap();
        assert_eq!(config.format, ConsoleFormat::Display);

        let config: ConsoleConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.format, ConsoleFormat::Json);
    }
}
