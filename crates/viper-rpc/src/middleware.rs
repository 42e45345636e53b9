// crates/viper-rpc/src/middleware.rs
//
// Middleware for the RPC front end.

use tonic::{Request, Status};

/// Logging interceptor for incoming requests.
///
/// Logs the caller's user agent and content type using the `tracing` crate.
/// Requests are never rejected here.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    let metadata = req.metadata();
    let header = |name: &str| {
        metadata
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string()
    };
    tracing::debug!(
        "Incoming RPC request: user-agent={} content-type={}",
        header("user-agent"),
        header("content-type")
    );
    Ok(req)
}
