// crates/viper-core/src/traits.rs

use async_trait::async_trait;
use bytes::Bytes;

use crate::endpoint::{ChainId, Endpoint, EndpointId, HealthStatus};
use crate::error::{BackendError, DirectoryError};
use crate::native::{NativeRequest, NativeResponse, RequestKind};

/// Registry of backend endpoints per chain.
///
/// Implementations own all endpoint state and their own synchronization;
/// every method may be called concurrently from many requests.
#[async_trait]
pub trait EndpointDirectory: Send + Sync {
    /// Active endpoints for a chain, ordered by preference (most preferred first).
    async fn get_active_endpoints(&self, chain_id: ChainId) -> Result<Vec<Endpoint>, DirectoryError>;

    /// Record the outcome of the latest call through an endpoint.
    async fn update_endpoint_health(
        &self,
        id: EndpointId,
        status: HealthStatus,
    ) -> Result<(), DirectoryError>;
}

/// Outbound transport used for pass-through calls.
///
/// Implemented over HTTP by `viper-rpc`.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// POST `body` to `url` and return the full response body.
    async fn post(&self, url: &str, content_type: &str, body: Bytes) -> Result<Bytes, BackendError>;
}

/// Performs the exchange with the Viper Network for translated requests.
#[async_trait]
pub trait NetworkHandler: Send + Sync {
    async fn handle_request(
        &self,
        kind: RequestKind,
        request: NativeRequest,
    ) -> Result<NativeResponse, BackendError>;
}
