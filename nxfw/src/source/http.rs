//! HTTP client abstraction for testability.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use thiserror::Error;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// A request could not be completed at the transport level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Failed to build the underlying client.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request failed before a status was received.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The request timed out.
    #[error("request to {url} timed out")]
    Timeout { url: String },
}

/// Status, headers and body of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP client operations.
///
/// Non-2xx statuses are returned as responses, not errors; callers decide
/// what a 404 means.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP HEAD request.
    fn head(&self, url: &str) -> Result<HttpResponse, HttpError>;

    /// Performs an HTTP GET request and reads the whole body.
    fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

/// Settings shared by every client talking to the CDN.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// PEM bundle with the client certificate and its private key.
    pub identity_pem: Option<Vec<u8>>,
    pub user_agent: String,
    pub timeout: Duration,
    /// The CDN presents certificates from a private root.
    pub accept_invalid_certs: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            identity_pem: None,
            user_agent: format!("nxfw/{}", crate::VERSION),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: true,
        }
    }
}

impl ClientSettings {
    pub fn with_identity_pem(mut self, pem: Vec<u8>) -> Self {
        self.identity_pem = Some(pem);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a blocking reqwest client from these settings.
    pub fn build_client(&self) -> Result<Client, HttpError> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(pem) = &self.identity_pem {
            let identity = reqwest::Identity::from_pem(pem)
                .map_err(|e| HttpError::Client(format!("invalid client identity: {}", e)))?;
            builder = builder.identity(identity);
        }

        builder.build().map_err(|e| HttpError::Client(e.to_string()))
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Creates a client from shared settings.
    pub fn new(settings: &ClientSettings) -> Result<Self, HttpError> {
        Ok(Self {
            client: settings.build_client()?,
        })
    }

    /// Wraps an already configured reqwest client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn send(&self, url: &str, request: RequestBuilder, read_body: bool) -> Result<HttpResponse, HttpError> {
        let response = request.send().map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let body = if read_body {
            response
                .bytes()
                .map(|b| b.to_vec())
                .map_err(|e| map_reqwest_error(url, e))?
        } else {
            Vec::new()
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl HttpClient for ReqwestClient {
    fn head(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.send(url, self.client.head(url), false)
    }

    fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.send(url, self.client.get(url), true)
    }
}

fn map_reqwest_error(url: &str, e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout {
            url: url.to_string(),
        }
    } else {
        HttpError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
