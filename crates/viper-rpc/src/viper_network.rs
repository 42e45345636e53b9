// crates/viper-rpc/src/viper_network.rs
//
// ViperNetworkHandler: talks to a Viper Network gateway over HTTP.
//
// Each native operation family has its own route on the gateway (see
// `RequestKind::path`). The handler posts the native JSON body and returns the
// status and raw body; decoding is left to the translator.

use async_trait::async_trait;

use viper_core::{BackendError, NativeRequest, NativeResponse, NetworkHandler, RequestKind};

use crate::transport::{classify, HttpTransport};

/// HTTP client for a single Viper Network gateway.
#[derive(Debug, Clone)]
pub struct ViperNetworkHandler {
    /// Base URL of the gateway (e.g., "http://127.0.0.1:8082").
    base_url: String,
    transport: HttpTransport,
}

impl ViperNetworkHandler {
    /// Create a handler for the gateway at `base_url`, sharing `transport`'s client.
    pub fn new(base_url: &str, transport: HttpTransport) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    /// Full URL serving the given operation family.
    pub fn route(&self, kind: RequestKind) -> String {
        format!("{}{}", self.base_url, kind.path())
    }
}

#[async_trait]
impl NetworkHandler for ViperNetworkHandler {
    async fn handle_request(
        &self,
        kind: RequestKind,
        request: NativeRequest,
    ) -> Result<NativeResponse, BackendError> {
        debug_assert_eq!(request.kind(), kind, "native body does not match its route");
        let url = self.route(kind);
        tracing::debug!("Viper Network {} request to {}", kind, url);

        let response = self
            .transport
            .http_client()
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Body(e.to_string()))?;

        Ok(NativeResponse::new(status, body))
    }
}
