// Generic JSON-over-HTTP client
//
// One `call` primitive used for both the Supervisor and the platform.
// It owns timeout mapping and non-2xx handling; retry policy belongs to
// the caller.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

pub use reqwest::Method;

/// Longest slice of an error body kept as context.
const ERROR_BODY_LIMIT: usize = 512;

/// Thin wrapper around `reqwest::Client` speaking JSON.
///
/// Cheap to clone: `reqwest::Client` is reference counted internally.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            timeout: transport.timeout,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// `timeout` is only used for error reporting; the client's own
    /// timeout setting is what bounds the request.
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join `path` onto `base`, tolerating slashes on either side.
    ///
    /// `Url::join` would drop the last segment of a base without a
    /// trailing slash (`http://supervisor/core/api` + `states`), so the
    /// two halves are concatenated as strings instead.
    pub fn join_url(base: &Url, path: &str) -> Result<Url, Error> {
        let base = base.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Perform one request and decode the response as JSON.
    ///
    /// - 2xx with empty body → `Value::Null`
    /// - 2xx with non-JSON body → `Value::String(body)`
    /// - non-2xx → [`Error::Status`] carrying the response body
    pub async fn call(
        &self,
        base_url: &Url,
        path: &str,
        method: Method,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let url = Self::join_url(base_url, path)?;
        debug!("{method} {url}");

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        trace!(status = status.as_u16(), bytes = text.len(), "response received");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}
