//! Composite transport fanning one event out to several transports

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

use crate::error::TransportError;
use crate::event::RunEvent;
use crate::transport::Transport;

/// Config file shape; member transports stay raw until the registry builds them
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompositeConfig {
    pub transports: Vec<serde_yaml::Value>,
    #[serde(default = "default_continue_on_failure")]
    pub continue_on_failure: bool,
}

fn default_continue_on_failure() -> bool {
    true
}

pub struct CompositeTransport {
    transports: Vec<Arc<dyn Transport>>,
    continue_on_failure: bool,
}

impl CompositeTransport {
    pub fn new(transports: Vec<Arc<dyn Transport>>, continue_on_failure: bool) -> Self {
        Self {
            transports,
            continue_on_failure,
        }
    }

    pub fn transports(&self) -> &[Arc<dyn Transport>] {
        &self.transports
    }

    pub fn continue_on_failure(&self) -> bool {
        self.continue_on_failure
    }
}

impl Transport for CompositeTransport {
    fn emit(&self, event: &RunEvent) -> Result<(), TransportError> {
        let mut errors = Vec::new();

        for transport in &self.transports {
            if let Err(e) = transport.emit(event) {
                if !self.continue_on_failure {
                    return Err(e);
                }
                log::warn!("Failed to emit to {} transport: {}", transport.kind(), e);
                errors.push(format!("{}: {}", transport.kind(), e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TransportError::Composite {
                failed: errors.len(),
                total: self.transports.len(),
                errors,
            })
        }
    }

    fn kind(&self) -> &'static str {
        "composite"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
