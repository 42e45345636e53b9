// crates/viper-core/src/lib.rs
//
// viper-core: Core types, traits, and error taxonomy for the Viper RPC dispatcher.
//
// This is the leaf crate of the workspace. It defines the JSON-RPC envelope,
// endpoint records, the Viper Network native request shapes, and the
// collaborator traits the dispatcher is written against.

pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod native;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use viper_core::ChainId;`

pub use endpoint::{ChainId, Endpoint, EndpointId, HealthStatus};
pub use envelope::{
    RpcErrorObject, RpcOutcome, RpcRequest, RpcResponse, JSONRPC_VERSION, JSON_CONTENT_TYPE,
};
pub use error::{BackendError, DirectoryError, DispatchError};
pub use native::{
    BalanceQuery, BlockQuery, CallRequest, NativeRequest, NativeResponse, RelayPayload, RelayRequest,
    RequestKind, TransactionQuery,
};
pub use traits::{BackendTransport, EndpointDirectory, NetworkHandler};
