//! Transports deliver run events to a lineage backend
//!
//! Provides delivery over:
//! - HTTP - POSTs events to a lineage API endpoint
//! - Console - prints events to stdout
//! - File - appends events as JSONL or writes one file per event
//! - Composite - fans an event out to several transports
//! - Noop - drops events (lineage disabled)
//!
//! [`factory`] resolves one of these from ambient configuration.

use std::any::Any;

use crate::error::TransportError;
use crate::event::RunEvent;

pub mod composite;
pub mod console;
pub mod factory;
pub mod file;
pub mod http;
pub mod noop;

pub use composite::{CompositeConfig, CompositeTransport};
pub use console::{ConsoleConfig, ConsoleFormat, ConsoleTransport};
pub use factory::{DefaultTransportFactory, TransportBuilder, TransportFactory, TransportRegistry};
pub use file::{FileConfig, FileTransport};
pub use http::{HttpAdapter, HttpConfig, HttpSession, HttpTransport};
pub use noop::NoopTransport;

/// A delivery mechanism for run events
///
/// Implementations must be shareable across threads; the client holds them
/// behind an `Arc` and never synchronizes calls itself.
pub trait Transport: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: &RunEvent) -> Result<(), TransportError>;

    /// Short name of the backend, matching its `type` in config files
    fn kind(&self) -> &'static str;

    /// Access to the concrete type, for inspection by callers and tests
    fn as_any(&self) -> &dyn Any;
}
