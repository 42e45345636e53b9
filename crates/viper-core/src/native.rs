// crates/viper-core/src/native.rs
//
// Viper Network native request/response shapes.
//
// The Viper Network exposes one HTTP route per operation family instead of a
// single JSON-RPC endpoint. A `RequestKind` selects the route and a
// `NativeRequest` carries the JSON body posted to it.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Native operation family a translated request maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Latest block height.
    Height,
    /// Account balance at a height.
    Balance,
    /// Block at a height.
    Block,
    /// Transaction by hash.
    Transaction,
    /// Relay of an opaque payload to a chain served by Viper nodes.
    Relay,
    /// Any other JSON-RPC method, handed to the gateway by name.
    Call,
}

impl RequestKind {
    /// HTTP route on the Viper gateway serving this operation family.
    pub fn path(&self) -> &'static str {
        match self {
            RequestKind::Height => "/v1/query/height",
            RequestKind::Balance => "/v1/query/balance",
            RequestKind::Block => "/v1/query/block",
            RequestKind::Transaction => "/v1/query/tx",
            RequestKind::Relay => "/v1/client/relay",
            RequestKind::Call => "/v1/client/call",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Height => "height",
            RequestKind::Balance => "balance",
            RequestKind::Block => "block",
            RequestKind::Transaction => "tx",
            RequestKind::Relay => "relay",
            RequestKind::Call => "call",
        };
        f.write_str(name)
    }
}

/// Body of a balance query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceQuery {
    pub address: String,
    /// Block height; 0 means latest.
    pub height: u64,
}

/// Body of a block query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockQuery {
    pub height: u64,
}

/// Body of a transaction query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub hash: String,
}

/// Payload relayed verbatim to the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub data: String,
    pub method: String,
    #[serde(default)]
    pub path: String,
}

/// Body of a relay request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    /// Relay chain identifier as known to the Viper Network (e.g., "0021").
    pub blockchain: String,
    pub payload: RelayPayload,
}

/// Body of a generic method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A request in the Viper Network's native format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NativeRequest {
    Balance(BalanceQuery),
    Block(BlockQuery),
    Transaction(TransactionQuery),
    Relay(RelayRequest),
    Call(CallRequest),
    /// Height queries carry an empty object.
    Empty {},
}

impl NativeRequest {
    /// The operation family this request belongs to.
    pub fn kind(&self) -> RequestKind {
        match self {
            NativeRequest::Empty {} => RequestKind::Height,
            NativeRequest::Balance(_) => RequestKind::Balance,
            NativeRequest::Block(_) => RequestKind::Block,
            NativeRequest::Transaction(_) => RequestKind::Transaction,
            NativeRequest::Relay(_) => RequestKind::Relay,
            NativeRequest::Call(_) => RequestKind::Call,
        }
    }
}

/// A raw answer from the Viper Network: HTTP status plus undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeResponse {
    pub status: u16,
    pub body: Bytes,
}

impl NativeResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
