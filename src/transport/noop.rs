//! Transport that drops every event

use std::any::Any;

use crate::error::TransportError;
use crate::event::RunEvent;
use crate::transport::Transport;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransport;

impl NoopTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for NoopTransport {
    fn emit(&self, event: &RunEvent) -> Result<(), TransportError> {
        log::trace!("Dropping {} event for {}.{}", event.event_type.as_str(), event.job.namespace, event.job.name);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "noop"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
