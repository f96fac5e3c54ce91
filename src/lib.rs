//! Client for emitting lineage run events through pluggable transports
//!
//! ```no_run
//! use lineage_client::{EventType, Job, LineageClient, Run, RunEvent};
//!
//! let client = LineageClient::from_url("http://localhost:5000");
//! let event = RunEvent::new(EventType::Start, Run::new(), Job::new("etl", "daily_orders"), "my-scheduler");
//! client.emit(event)?;
//! # Ok::<(), lineage_client::ClientError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod transport;

pub use client::{ClientBuilder, ClientInit, ClientOptions, LineageClient};
pub use config::{LineageConfig, LogLevel};
pub use error::{ClientError, TransportError};
pub use event::{Dataset, DatasetEvent, EventType, Job, JobEvent, LineageEvent, Run, RunEvent};
pub use transport::{DefaultTransportFactory, HttpAdapter, HttpConfig, HttpSession, Transport, TransportFactory};
