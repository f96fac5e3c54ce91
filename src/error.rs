//! Error types for the lineage client
//!
//! [`ClientError`] covers everything the client facade and the transport
//! factory can report. Failures raised while delivering an event live in
//! [`TransportError`] and reach the caller unchanged.

use thiserror::Error;

/// Errors reported by the client facade and transport resolution.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The caller handed `emit` something other than a run event.
    ///
    /// This is misuse of the API, not a delivery failure; no transport is
    /// touched when it is returned.
    #[error("usage error: {0}")]
    Usage(String),

    /// Both a URL and a prebuilt transport were given to the builder.
    #[error("conflicting client inputs: a URL and a transport were both supplied")]
    ConflictingInputs,

    /// Transport configuration could not be resolved or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Delivery failure from the underlying transport.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised by transport implementations while delivering an event.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request could not be sent or no response was received.
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// The server answered with an error status.
    #[error("HTTP request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    /// One or more members of a composite transport failed.
    #[error("{failed} of {total} transports failed: {}", .errors.join("; "))]
    Composite {
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },
}

impl ClientError {
    /// True when the error came from the transport rather than the facade.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
