// crates/viper-rpc/src/transport.rs
//
// HttpTransport: the reqwest-backed outbound transport for pass-through calls.
//
// One client is built per transport and shared by every request; reqwest
// pools connections internally so clones are cheap.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

use viper_core::{BackendError, BackendTransport};

/// Default ceiling for a single outbound call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound HTTP transport shared across all dispatcher invocations.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Return the shared reqwest::Client.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn post(&self, url: &str, content_type: &str, body: Bytes) -> Result<Bytes, BackendError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        // Any status counts as an answer; only an unreadable body is a failure.
        response
            .bytes()
            .await
            .map_err(|e| BackendError::Body(e.to_string()))
    }
}

/// Map a reqwest failure onto the backend error taxonomy.
pub(crate) fn classify(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(e.to_string())
    } else if e.is_builder() {
        BackendError::Request(e.to_string())
    } else if e.is_body() || e.is_decode() {
        BackendError::Body(e.to_string())
    } else {
        BackendError::Connect(e.to_string())
    }
}
