// crates/viper-rpc/src/server.rs
//
// HTTP front end: ViperRpcServer and RpcConfig.
//
// A single tonic service mounted at `/v1` accepts plain HTTP/1.1 POSTs of
// JSON-RPC bodies at `/v1/{chain_id}` and hands them to the Dispatcher.
// Successful backend responses are returned byte-for-byte; dispatch errors
// are rendered as JSON-RPC error envelopes.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::Status;

use viper_core::{ChainId, DispatchError, RpcResponse, JSON_CONTENT_TYPE};

use crate::dispatcher::Dispatcher;
use crate::middleware;

/// URL prefix under which every chain is served.
pub const ROUTE_PREFIX: &str = "/v1/";

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8545,
        }
    }
}

// ---------------------------------------------------------------------------
// ViperRpcServer
// ---------------------------------------------------------------------------

/// The HTTP-facing server wrapping a Dispatcher.
#[derive(Debug, Clone)]
pub struct ViperRpcServer {
    config: RpcConfig,
    dispatcher: Dispatcher,
}

impl ViperRpcServer {
    pub fn new(config: RpcConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Serve until the process is terminated.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` resolves, then stop accepting connections.
    pub async fn start_with_shutdown<F>(&self, signal: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Viper RPC dispatcher listening on {}", addr);

        Server::builder()
            .accept_http1(true)
            .add_service(tonic::service::interceptor::InterceptedService::new(
                DispatchService::new(self.dispatcher.clone()),
                middleware::logging_interceptor,
            ))
            .serve_with_shutdown(addr, signal)
            .await?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tower Service Wiring
// ---------------------------------------------------------------------------
// tonic mounts a NamedService at `/{NAME}/*`, so NAME doubles as the route
// prefix. The service reads the chain id from the remaining path segment.

/// The tower service behind the front end.
#[derive(Debug, Clone)]
pub struct DispatchService {
    dispatcher: Dispatcher,
}

impl DispatchService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl tonic::server::NamedService for DispatchService {
    const NAME: &'static str = "v1";
}

impl<B> tower_service::Service<http::Request<B>> for DispatchService
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();

        Box::pin(async move {
            if *req.method() != http::Method::POST {
                return Ok(error_response(
                    http::StatusCode::METHOD_NOT_ALLOWED,
                    serde_json::Value::Null,
                    -32600,
                    "Only POST is supported",
                ));
            }

            let chain_id = match parse_chain_id(req.uri().path()) {
                Some(id) => id,
                None => {
                    return Ok(error_response(
                        http::StatusCode::NOT_FOUND,
                        serde_json::Value::Null,
                        -32601,
                        &format!("Unknown route {}", req.uri().path()),
                    ))
                }
            };

            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                    tracing::error!("Failed to read request body: {}", e);
                    return Ok(error_response(
                        http::StatusCode::BAD_REQUEST,
                        serde_json::Value::Null,
                        -32700,
                        &format!("Failed to read request body: {}", e),
                    ));
                }
            };

            // Dropping this future (client hung up) cancels the dispatch.
            let cancel = CancellationToken::new();
            let _guard = cancel.clone().drop_guard();

            let started = Instant::now();
            match dispatcher.forward(&cancel, chain_id, body.clone()).await {
                Ok(response) => {
                    tracing::info!(
                        "chain {} request served in {:?}",
                        chain_id,
                        started.elapsed()
                    );
                    Ok(build_response(http::StatusCode::OK, response))
                }
                Err(err) => {
                    tracing::warn!("chain {} request failed: {}", chain_id, err);
                    Ok(error_response(
                        http_status(&err),
                        request_id(&body),
                        err.rpc_code(),
                        &err.to_string(),
                    ))
                }
            }
        })
    }
}

/// Extract the chain id from `/v1/{chain_id}`.
fn parse_chain_id(path: &str) -> Option<ChainId> {
    path.strip_prefix(ROUTE_PREFIX)?
        .trim_end_matches('/')
        .parse()
        .ok()
}

/// Best-effort recovery of the caller's id for error envelopes.
fn request_id(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .unwrap_or(serde_json::Value::Null)
}

fn http_status(err: &DispatchError) -> http::StatusCode {
    match err {
        DispatchError::InvalidRequestFormat(_) | DispatchError::TranslationFailed(_) => {
            http::StatusCode::BAD_REQUEST
        }
        DispatchError::NoEndpointsAvailable(_) => http::StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::BackendUnreachable { .. } => http::StatusCode::BAD_GATEWAY,
        DispatchError::Directory(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        DispatchError::Cancelled => http::StatusCode::REQUEST_TIMEOUT,
    }
}

fn error_response(
    status: http::StatusCode,
    id: serde_json::Value,
    code: i64,
    message: &str,
) -> http::Response<tonic::body::BoxBody> {
    let envelope = RpcResponse::failure(id, code, message);
    let json = envelope.to_bytes().unwrap_or_default();
    build_response(status, Bytes::from(json))
}

/// Build an HTTP response with the given JSON body.
fn build_response(status: http::StatusCode, json: Bytes) -> http::Response<tonic::body::BoxBody> {
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(json).map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}
