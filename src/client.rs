//! Client facade
//!
//! A [`LineageClient`] owns exactly one transport and forwards run events to
//! it. How that transport is obtained is chosen by the caller through
//! [`ClientInit`]:
//!
//! - [`ClientInit::ByUrl`] builds an HTTP transport from a URL and options
//!   (the setup used by callers that predate pluggable transports)
//! - [`ClientInit::ByTransport`] adopts a prebuilt transport
//! - [`ClientInit::Default`] asks a [`TransportFactory`]
//!
//! [`ClientBuilder`] accepts the same inputs as optional values and rejects
//! a URL combined with a transport.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ClientError;
use crate::event::LineageEvent;
use crate::transport::factory::{DefaultTransportFactory, TransportFactory};
use crate::transport::http::{
    DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS, HttpAdapter, HttpConfig, HttpSession, HttpTransport,
};
use crate::transport::Transport;

/// Options for the URL-based setup
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Request timeout in seconds
    pub timeout: f64,
    /// Verify TLS certificates
    pub verify: bool,
    pub api_key: Option<String>,
    pub adapter: Option<HttpAdapter>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            verify: true,
            api_key: None,
            adapter: None,
        }
    }
}

/// How a client obtains its transport
pub enum ClientInit {
    ByUrl {
        url: String,
        options: Option<ClientOptions>,
        session: Option<HttpSession>,
    },
    ByTransport(Arc<dyn Transport>),
    Default,
}

impl ClientInit {
    pub fn url(url: impl Into<String>) -> Self {
        Self::ByUrl {
            url: url.into(),
            options: None,
            session: None,
        }
    }
}

/// Sends run events through a single transport
#[derive(Clone)]
pub struct LineageClient {
    transport: Arc<dyn Transport>,
}

impl LineageClient {
    /// Resolve `init` into a transport; `factory` is consulted only for [`ClientInit::Default`]
    pub fn new(init: ClientInit, factory: &dyn TransportFactory) -> Result<Self, ClientError> {
        let transport = match init {
            ClientInit::ByUrl { url, options, session } => {
                let options = options.unwrap_or_default();
                let session = session.unwrap_or_default();
                Arc::new(HttpTransport::new(http_config(url, options, session))) as Arc<dyn Transport>
            }
            ClientInit::ByTransport(transport) => transport,
            ClientInit::Default => factory.create()?,
        };

        log::debug!("Lineage client using {} transport", transport.kind());
        Ok(Self { transport })
    }

    /// HTTP client for `url` with default options and a fresh session
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::from_url_with(url, ClientOptions::default(), HttpSession::new())
    }

    pub fn from_url_with(url: impl Into<String>, options: ClientOptions, session: HttpSession) -> Self {
        let transport = HttpTransport::new(http_config(url.into(), options, session));
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Client around an existing transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Client whose transport comes from `factory`
    pub fn from_factory(factory: &dyn TransportFactory) -> Result<Self, ClientError> {
        Self::new(ClientInit::Default, factory)
    }

    /// Client configured from `OPENLINEAGE_*` variables and config files
    pub fn from_environment() -> Result<Self, ClientError> {
        Self::from_factory(&DefaultTransportFactory::from_process_env())
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Send a run event through the transport.
    ///
    /// Job and dataset events are rejected with [`ClientError::Usage`]
    /// without touching the transport. Transport failures come back as
    /// [`ClientError::Transport`] untouched.
    pub fn emit(&self, event: impl Into<LineageEvent>) -> Result<(), ClientError> {
        match event.into() {
            LineageEvent::Run(event) => Ok(self.transport.emit(&event)?),
            other => Err(ClientError::Usage(format!("`emit` only accepts RunEvent, got {}", other.kind()))),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The transport as its concrete type, if it is a `T`
    pub fn transport_as<T: Transport + 'static>(&self) -> Option<&T> {
        self.transport.as_any().downcast_ref::<T>()
    }
}

impl std::fmt::Debug for LineageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageClient")
            .field("transport", &self.transport.kind())
            .finish()
    }
}

fn http_config(url: String, options: ClientOptions, session: HttpSession) -> HttpConfig {
    HttpConfig {
        url,
        endpoint: DEFAULT_ENDPOINT.to_string(),
        timeout: options.timeout,
        verify: options.verify,
        api_key: options.api_key,
        session,
        adapter: options.adapter,
    }
}

/// Optional-argument construction
///
/// Mirrors the older constructor taking `url`, `options`, `session` and
/// `transport`, except that a URL plus a transport is an error.
#[derive(Default)]
pub struct ClientBuilder {
    url: Option<String>,
    options: Option<ClientOptions>,
    session: Option<HttpSession>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn session(mut self, session: HttpSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Which construction path these inputs select
    pub fn into_init(self) -> Result<ClientInit, ClientError> {
        // an empty URL counts as absent
        let url = self.url.filter(|u| !u.is_empty());
        match (url, self.transport) {
            (Some(_), Some(_)) => Err(ClientError::ConflictingInputs),
            (Some(url), None) => Ok(ClientInit::ByUrl {
                url,
                options: self.options,
                session: self.session,
            }),
            (None, Some(transport)) => Ok(ClientInit::ByTransport(transport)),
            (None, None) => Ok(ClientInit::Default),
        }
    }

    pub fn build(self, factory: &dyn TransportFactory) -> Result<LineageClient, ClientError> {
        LineageClient::new(self.into_init()?, factory)
    }

    /// Build, falling back to the process environment when no URL or transport was given
    pub fn build_from_environment(self) -> Result<LineageClient, ClientError> {
        self.build(&DefaultTransportFactory::from_process_env())
    }
}
