//! HTTP transport
//!
//! POSTs each event as JSON to `<url>/<endpoint>` using a shared `ureq`
//! agent. The agent (connection pool) is wrapped in [`HttpSession`] so it
//! can be created once and handed to several clients.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::event::RunEvent;
use crate::transport::Transport;

pub const DEFAULT_ENDPOINT: &str = "api/v1/lineage";
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Connection pool settings applied when the HTTP agent is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpAdapter {
    pub max_idle_connections: usize,
    pub max_idle_connections_per_host: usize,
    pub max_idle_age_secs: u64,
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self {
            max_idle_connections: 10,
            max_idle_connections_per_host: 3,
            max_idle_age_secs: 15,
        }
    }
}

/// A reusable HTTP agent
///
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct HttpSession {
    agent: Arc<ureq::Agent>,
}

impl HttpSession {
    pub fn new() -> Self {
        Self::from_agent(ureq::Agent::new_with_defaults())
    }

    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent: Arc::new(agent) }
    }

    /// A new session built from adapter settings and a TLS verification flag.
    ///
    /// The pool of `self` is not carried over.
    pub fn mount(&self, adapter: Option<&HttpAdapter>, verify: bool) -> Self {
        let adapter = adapter.copied().unwrap_or_default();
        let tls = ureq::tls::TlsConfig::builder().disable_verification(!verify).build();
        let config = ureq::Agent::config_builder()
            .tls_config(tls)
            .max_idle_connections(adapter.max_idle_connections)
            .max_idle_connections_per_host(adapter.max_idle_connections_per_host)
            .max_idle_age(Duration::from_secs(adapter.max_idle_age_secs))
            .build();
        Self::from_agent(config.into())
    }

    /// True when both handles share one agent
    pub fn same_as(&self, other: &HttpSession) -> bool {
        Arc::ptr_eq(&self.agent, &other.agent)
    }

    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }
}

impl Default for HttpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("agent", &Arc::as_ptr(&self.agent))
            .finish()
    }
}

/// Everything the HTTP transport needs to deliver events
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub url: String,
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout: f64,
    /// Verify TLS certificates
    pub verify: bool,
    pub api_key: Option<String>,
    pub session: HttpSession,
    pub adapter: Option<HttpAdapter>,
}

impl HttpConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            verify: true,
            api_key: None,
            session: HttpSession::new(),
            adapter: None,
        }
    }

    /// Full URL events are posted to
    pub fn target_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            return self.endpoint.clone();
        }
        let base = self.url.trim_end_matches('/');
        let endpoint = self.endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, endpoint)
        }
    }

    /// Timeout as a duration; non-positive or non-finite values mean no timeout
    pub fn timeout_duration(&self) -> Option<Duration> {
        if self.timeout > 0.0 {
            Duration::try_from_secs_f64(self.timeout).ok()
        } else {
            None
        }
    }
}

/// `auth` section of a config file
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSettings {
    ApiKey { api_key: String },
}

/// Config file shape of an `http` transport
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    pub url: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default = "default_verify")]
    pub verify: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthSettings>,
    #[serde(default)]
    pub adapter: Option<HttpAdapter>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_verify() -> bool {
    true
}

impl HttpSettings {
    pub fn into_config(self, session: HttpSession) -> HttpConfig {
        // an explicit `auth` block wins over a bare `api_key`
        let api_key = match self.auth {
            Some(AuthSettings::ApiKey { api_key }) => Some(api_key),
            None => self.api_key,
        };
        HttpConfig {
            url: self.url,
            endpoint: self.endpoint,
            timeout: self.timeout,
            verify: self.verify,
            api_key,
            session,
            adapter: self.adapter,
        }
    }
}

pub struct HttpTransport {
    config: HttpConfig,
    session: HttpSession,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        let session = if config.adapter.is_some() || !config.verify {
            log::debug!("Mounting adapter for {} (verify={})", config.url, config.verify);
            config.session.mount(config.adapter.as_ref(), config.verify)
        } else {
            config.session.clone()
        };
        Self { config, session }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

impl Transport for HttpTransport {
    fn emit(&self, event: &RunEvent) -> Result<(), TransportError> {
        let url = self.config.target_url();
        let body = serde_json::to_string(event)?;

        let mut request = self
            .session
            .agent()
            .post(&url)
            .config()
            .timeout_global(self.config.timeout_duration())
            .build()
            .header("Content-Type", "application/json");
        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        log::debug!("Posting {} event for run {} to {}", event.event_type.as_str(), event.run.run_id, url);

        match request.send(body.as_bytes()) {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(status)) => Err(TransportError::Status { url, status }),
            Err(e) => Err(TransportError::Http {
                url,
                message: e.to_string(),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventType, Job, Run};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Accept one request, answer with `status`, and hand the raw request back
    fn serve_once(status: u16) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!("HTTP/1.1 {} Test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status);
            stream.write_all(response.as_bytes()).unwrap();
            tx.send(String::from_utf8_lossy(&buf).to_string()).unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    fn sample_event() -> RunEvent {
        RunEvent::new(EventType::Start, Run::new(), Job::new("etl", "load"), "test")
    }

    #[test]
    fn test_target_url_joins_endpoint() {
        let mut config = HttpConfig::new("http://localhost:5000/");
        assert_eq!(config.target_url(), "http://localhost:5000/api/v1/lineage");

        config.endpoint = "/custom/events".to_string();
        assert_eq!(config.target_url(), "http://localhost:5000/custom/events");

        config.endpoint = "https://collector.example/ingest".to_string();
        assert_eq!(config.target_url(), "https://collector.example/ingest");
    }

    #[test]
    fn test_timeout_duration() {
        let mut config = HttpConfig::new("http://localhost");
        assert_eq!(config.timeout_duration(), Some(Duration::from_secs(5)));

        config.timeout = 2.5;
        assert_eq!(config.timeout_duration(), Some(Duration::from_millis(2500)));

        config.timeout = 0.0;
        assert_eq!(config.timeout_duration(), None);

        config.timeout = f64::NAN;
        assert_eq!(config.timeout_duration(), None);
    }

    #[test]
    fn test_settings_from_yaml_with_auth() {
        let yaml = r#"
url: http://localhost:5000
timeout: 2.5
auth:
  type: api_key
  api_key: secret
"#;
        let settings: HttpSettings = serde_yaml::from_str(yaml).unwrap();
        let config = settings.into_config(HttpSession::new());

        assert_eq!(config.url, "http://localhost:5000");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, 2.5);
        assert!(config.verify);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_session_is_shared_without_adapter() {
        let session = HttpSession::new();
        let mut config = HttpConfig::new("http://localhost");
        config.session = session.clone();

        let transport = HttpTransport::new(config);
        assert!(transport.session.same_as(&session));
    }

    #[test]
    fn test_adapter_mounts_new_session() {
        let session = HttpSession::new();
        let mut config = HttpConfig::new("http://localhost");
        config.session = session.clone();
        config.adapter = Some(HttpAdapter::default());

        let transport = HttpTransport::new(config);
        assert!(!transport.session.same_as(&session));
        assert!(transport.config().session.same_as(&session));
    }

    #[test]
    fn test_emit_posts_json_with_bearer_token() {
        let (url, rx) = serve_once(200);
        let mut config = HttpConfig::new(url);
        config.api_key = Some("k".to_string());
        let transport = HttpTransport::new(config);
        let event = sample_event();

        transport.emit(&event).unwrap();

        let request = rx.recv().unwrap();
        assert!(request.starts_with("POST /api/v1/lineage HTTP/1.1"));
        let lower = request.to_lowercase();
        assert!(lower.contains("content-type: application/json"));
        assert!(lower.contains("authorization: bearer k"));
        assert!(request.contains(&event.run.run_id.to_string()));
    }

    #[test]
    fn test_emit_without_api_key_sends_no_authorization() {
        let (url, rx) = serve_once(201);
        let transport = HttpTransport::new(HttpConfig::new(url));

        transport.emit(&sample_event()).unwrap();

        let request = rx.recv().unwrap().to_lowercase();
        assert!(!request.contains("authorization:"));
    }

    #[test]
    fn test_error_status_is_reported() {
        let (url, _rx) = serve_once(500);
        let transport = HttpTransport::new(HttpConfig::new(url));

        let err = transport.emit(&sample_event()).unwrap_err();
        match err {
            TransportError::Status { status, url } => {
                assert_eq!(status, 500);
                assert!(url.ends_with("/api/v1/lineage"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_connection_refused_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(HttpConfig::new(format!("http://{}", addr)));
        let err = transport.emit(&sample_event()).unwrap_err();
        assert!(matches!(err, TransportError::Http { .. }));
    }
}
