// crates/viper-core/src/envelope.rs
//
// JSON-RPC 2.0 envelope types exchanged with clients.
//
// The `id` field is caller-defined and may be a string, a number, or null.
// It is carried as an opaque `serde_json::Value` and never interpreted.

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Protocol version tag emitted on every synthesized response.
pub const JSONRPC_VERSION: &str = "2.0";

/// Media type used for every outbound pass-through call.
pub const JSON_CONTENT_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version tag (normally "2.0").
    pub jsonrpc: String,
    /// The method to invoke on the backend (e.g., "eth_blockNumber").
    pub method: String,
    /// Method parameters. Absent params decode as `null`.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Correlation identifier, echoed back unchanged.
    #[serde(default)]
    pub id: serde_json::Value,
}

impl RpcRequest {
    /// Parse a raw request body as a single JSON-RPC envelope.
    ///
    /// The `jsonrpc` tag is required rather than defaulted: a body without it
    /// is rejected even when `method` is present. Batch arrays and bodies
    /// missing `method` are rejected too.
    pub fn parse(raw: &[u8]) -> Result<Self, DispatchError> {
        serde_json::from_slice(raw).map_err(|e| DispatchError::InvalidRequestFormat(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// The outcome half of a response: exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcOutcome {
    Result(serde_json::Value),
    Error(RpcErrorObject),
}

/// A JSON-RPC response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
    pub id: serde_json::Value,
}

impl RpcResponse {
    /// Build a success response answering `id`.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: RpcOutcome::Result(result),
            id,
        }
    }

    /// Build an error response answering `id`.
    pub fn failure(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: RpcOutcome::Error(RpcErrorObject {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    /// Override the version tag, e.g. to mirror the request's tag.
    pub fn with_version(mut self, jsonrpc: impl Into<String>) -> Self {
        self.jsonrpc = jsonrpc.into();
        self
    }

    /// Encode to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
