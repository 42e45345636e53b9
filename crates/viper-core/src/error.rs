use thiserror::Error;

use crate::endpoint::{ChainId, EndpointId};

/// Failures reported by an endpoint directory implementation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backing store could not be reached.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    /// No endpoint exists with the given id.
    #[error("Endpoint not found: {0}")]
    NotFound(EndpointId),
}

/// Failures talking to a backend, either a pass-through node or the Viper
/// Network gateway.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection could not be established or was reset.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The transport's own timeout ceiling elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The response body could not be read in full.
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The outbound request could not be built (e.g., a bad endpoint URL).
    #[error("Invalid request: {0}")]
    Request(String),
}

/// The error taxonomy surfaced by `Dispatcher::forward`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inbound body is not a JSON-RPC envelope. No backend was contacted.
    #[error("Invalid JSON-RPC request format: {0}")]
    InvalidRequestFormat(String),

    /// The directory returned no active endpoints for the chain.
    #[error("No active endpoints available for chain {0}")]
    NoEndpointsAvailable(ChainId),

    /// The directory itself failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The backend could not be reached or did not answer.
    #[error("Backend unreachable ({target}): {source}")]
    BackendUnreachable {
        /// The endpoint URL or native operation that failed.
        target: String,
        #[source]
        source: BackendError,
    },

    /// The envelope could not be converted to or from the Viper Network format.
    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,
}

impl DispatchError {
    /// JSON-RPC error code used when rendering this error to a client.
    pub fn rpc_code(&self) -> i64 {
        match self {
            DispatchError::InvalidRequestFormat(_) => -32600,
            DispatchError::TranslationFailed(_) => -32602,
            DispatchError::NoEndpointsAvailable(_) => -32001,
            DispatchError::BackendUnreachable { .. } => -32002,
            DispatchError::Directory(_) => -32003,
            DispatchError::Cancelled => -32004,
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::TranslationFailed(e.to_string())
    }
}
