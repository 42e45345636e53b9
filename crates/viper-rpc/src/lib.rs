// crates/viper-rpc/src/lib.rs
//
// viper-rpc: request dispatching, Viper Network translation, and the HTTP
// front end.
//
// The Dispatcher routes each JSON-RPC request either straight through to a
// chain endpoint or through the translator to the Viper Network. Transports
// and the front end are thin reqwest/tonic wrappers around it.

pub mod dispatcher;
pub mod middleware;
pub mod selection;
pub mod server;
pub mod translator;
pub mod transport;
pub mod viper_network;

// Re-export the main types for ergonomic access.
pub use dispatcher::{Dispatcher, Route};
pub use selection::{EndpointSelector, FirstEndpoint};
pub use server::{RpcConfig, ViperRpcServer};
pub use transport::{HttpTransport, DEFAULT_REQUEST_TIMEOUT};
pub use viper_network::ViperNetworkHandler;
