// crates/viper-rpc/src/dispatcher.rs
//
// Dispatcher: routes one raw JSON-RPC request to a backend and returns the
// backend's answer.
//
// Two routes exist:
//   PassThrough(chain) : directory lookup -> select endpoint -> POST raw bytes
//                        -> health report -> raw response bytes
//                        (a call abandoned on cancellation is reported as error)
//   Translated         : to_native_format -> Viper Network handler
//                        -> from_native_format
//
// Steps run strictly in sequence within one call and nothing is retried.
// Every collaborator call except the final health report is raced against
// the caller's cancellation token.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use viper_core::{
    BackendTransport, ChainId, DispatchError, EndpointDirectory, EndpointId, HealthStatus,
    NetworkHandler, RpcRequest, JSON_CONTENT_TYPE,
};

use crate::selection::{EndpointSelector, FirstEndpoint};
use crate::translator;

/// How a chain's requests are served, decided once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forward the raw envelope to one of the chain's endpoints.
    PassThrough(ChainId),
    /// Translate to and from the Viper Network native format.
    Translated,
}

impl Route {
    pub fn resolve(chain_id: ChainId) -> Self {
        if chain_id.is_viper_network() {
            Route::Translated
        } else {
            Route::PassThrough(chain_id)
        }
    }
}

/// The request dispatcher.
///
/// Holds only shared, read-only collaborator handles, so one instance can be
/// cloned into every request task.
#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<dyn EndpointDirectory>,
    transport: Arc<dyn BackendTransport>,
    network: Arc<dyn NetworkHandler>,
    selector: Arc<dyn EndpointSelector>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher using first-of-list endpoint selection.
    ///
    /// # Arguments
    /// * `directory` - Source of endpoints and sink for health reports.
    /// * `transport` - Outbound transport for pass-through chains.
    /// * `network` - Handler for the Viper Network.
    pub fn new(
        directory: Arc<dyn EndpointDirectory>,
        transport: Arc<dyn BackendTransport>,
        network: Arc<dyn NetworkHandler>,
    ) -> Self {
        Self {
            directory,
            transport,
            network,
            selector: Arc::new(FirstEndpoint),
        }
    }

    /// Replace the endpoint selection policy.
    pub fn with_selector(mut self, selector: Arc<dyn EndpointSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Forward a raw JSON-RPC request for `chain_id` and return the raw response.
    ///
    /// Returns `DispatchError::Cancelled` promptly once `cancel` fires while a
    /// lookup or outbound call is pending. An outbound call cut short this way
    /// still gets its single health report, as `error`.
    pub async fn forward(
        &self,
        cancel: &CancellationToken,
        chain_id: ChainId,
        request: Bytes,
    ) -> Result<Bytes, DispatchError> {
        match Route::resolve(chain_id) {
            Route::Translated => self.forward_translated(cancel, &request).await,
            Route::PassThrough(chain_id) => self.forward_pass_through(cancel, chain_id, request).await,
        }
    }

    async fn forward_pass_through(
        &self,
        cancel: &CancellationToken,
        chain_id: ChainId,
        request: Bytes,
    ) -> Result<Bytes, DispatchError> {
        // Validation only; the original bytes are what gets forwarded.
        let envelope = RpcRequest::parse(&request)?;

        let endpoints = cancellable(cancel, self.directory.get_active_endpoints(chain_id)).await??;

        // Ordering is the directory's responsibility and is trusted as-is.
        let endpoint = self
            .selector
            .select(&endpoints)
            .ok_or(DispatchError::NoEndpointsAvailable(chain_id))?;

        tracing::debug!(
            "Forwarding {} for chain {} to endpoint {} ({})",
            envelope.method,
            chain_id,
            endpoint.id,
            endpoint.url
        );

        let outcome = match cancellable(
            cancel,
            self.transport.post(&endpoint.url, JSON_CONTENT_TYPE, request),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(cancelled) => {
                tracing::debug!("Call to endpoint {} abandoned on cancellation", endpoint.id);
                self.report_health(endpoint.id, HealthStatus::Error).await;
                return Err(cancelled);
            }
        };

        match outcome {
            Ok(body) => {
                self.report_health(endpoint.id, HealthStatus::Healthy).await;
                Ok(body)
            }
            Err(source) => {
                tracing::warn!("Endpoint {} ({}) failed: {}", endpoint.id, endpoint.url, source);
                self.report_health(endpoint.id, HealthStatus::Error).await;
                Err(DispatchError::BackendUnreachable {
                    target: endpoint.url.clone(),
                    source,
                })
            }
        }
    }

    async fn forward_translated(
        &self,
        cancel: &CancellationToken,
        request: &[u8],
    ) -> Result<Bytes, DispatchError> {
        let (kind, native) = translator::to_native_format(request)?;
        tracing::debug!("Translated request to Viper Network {} operation", kind);

        let response = cancellable(cancel, self.network.handle_request(kind, native))
            .await?
            .map_err(|source| DispatchError::BackendUnreachable {
                target: format!("viper network {}", kind),
                source,
            })?;

        translator::from_native_format(&response, request)
    }

    /// Best-effort health report. Failures are logged and dropped so they
    /// never replace the primary result.
    async fn report_health(&self, id: EndpointId, status: HealthStatus) {
        if let Err(e) = self.directory.update_endpoint_health(id, status).await {
            tracing::warn!("Failed to report endpoint {} as {}: {}", id, status, e);
        }
    }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, DispatchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DispatchError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use viper_core::{
        BackendError, DirectoryError, Endpoint, NativeRequest, NativeResponse, RequestKind,
    };

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct FakeDirectory {
        /// `None` makes every lookup fail.
        endpoints: Option<Vec<Endpoint>>,
        fail_updates: bool,
        lookups: AtomicUsize,
        reports: Mutex<Vec<(EndpointId, HealthStatus)>>,
    }

    impl FakeDirectory {
        fn with_endpoints(endpoints: Vec<Endpoint>) -> Self {
            Self {
                endpoints: Some(endpoints),
                ..Default::default()
            }
        }

        fn reports(&self) -> Vec<(EndpointId, HealthStatus)> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EndpointDirectory for FakeDirectory {
        async fn get_active_endpoints(
            &self,
            _chain_id: ChainId,
        ) -> Result<Vec<Endpoint>, DirectoryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.endpoints
                .clone()
                .ok_or_else(|| DirectoryError::Unavailable("database offline".to_string()))
        }

        async fn update_endpoint_health(
            &self,
            id: EndpointId,
            status: HealthStatus,
        ) -> Result<(), DirectoryError> {
            self.reports.lock().unwrap().push((id, status));
            if self.fail_updates {
                Err(DirectoryError::Unavailable("read-only replica".to_string()))
            } else {
                Ok(())
            }
        }
    }

    enum Behavior {
        Respond(&'static [u8]),
        Fail,
        Hang,
    }

    struct FakeTransport {
        behavior: Behavior,
        calls: Mutex<Vec<(String, String, Bytes)>>,
    }

    impl FakeTransport {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String, Bytes)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendTransport for FakeTransport {
        async fn post(
            &self,
            url: &str,
            content_type: &str,
            body: Bytes,
        ) -> Result<Bytes, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), content_type.to_string(), body));
            match self.behavior {
                Behavior::Respond(bytes) => Ok(Bytes::from_static(bytes)),
                Behavior::Fail => Err(BackendError::Connect("connection refused".to_string())),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    struct FakeNetwork {
        response: Option<NativeResponse>,
        calls: Mutex<Vec<(RequestKind, NativeRequest)>>,
    }

    impl FakeNetwork {
        fn answering(response: Option<NativeResponse>) -> Self {
            Self {
                response,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NetworkHandler for FakeNetwork {
        async fn handle_request(
            &self,
            kind: RequestKind,
            request: NativeRequest,
        ) -> Result<NativeResponse, BackendError> {
            self.calls.lock().unwrap().push((kind, request));
            self.response
                .clone()
                .ok_or_else(|| BackendError::Timeout("gateway timed out".to_string()))
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn endpoint(id: EndpointId) -> Endpoint {
        Endpoint {
            id,
            chain_id: ChainId(1),
            url: format!("http://node-{}:8545", id),
            priority: id as i32,
            status: HealthStatus::Healthy,
        }
    }

    fn dispatcher(
        directory: &Arc<FakeDirectory>,
        transport: &Arc<FakeTransport>,
        network: &Arc<FakeNetwork>,
    ) -> Dispatcher {
        Dispatcher::new(directory.clone(), transport.clone(), network.clone())
    }

    fn request_bytes() -> Bytes {
        Bytes::from_static(br#"{"jsonrpc":"2.0","method":"eth_blockNumber","params":[],"id":1}"#)
    }

    // -----------------------------------------------------------------------
    // Pass-through route
    // -----------------------------------------------------------------------

    #[test]
    fn test_route_resolution() {
        assert_eq!(Route::resolve(ChainId::VIPER_NETWORK), Route::Translated);
        assert_eq!(Route::resolve(ChainId(1)), Route::PassThrough(ChainId(1)));
    }

    #[tokio::test]
    async fn test_malformed_request_never_reaches_directory() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![endpoint(1)]));
        let transport = Arc::new(FakeTransport::new(Behavior::Respond(b"{}")));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let inputs: [&[u8]; 3] = [b"garbage", b"", br#"{"jsonrpc":"2.0"}"#];
        for raw in inputs {
            let err = d
                .forward(&CancellationToken::new(), ChainId(1), Bytes::copy_from_slice(raw))
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::InvalidRequestFormat(_)));
        }
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_endpoints_issues_no_call() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![]));
        let transport = Arc::new(FakeTransport::new(Behavior::Respond(b"{}")));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let err = d
            .forward(&CancellationToken::new(), ChainId(56), request_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoEndpointsAvailable(ChainId(56))));
        assert!(transport.calls().is_empty());
        assert!(directory.reports().is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_propagates() {
        let directory = Arc::new(FakeDirectory::default());
        let transport = Arc::new(FakeTransport::new(Behavior::Respond(b"{}")));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let err = d
            .forward(&CancellationToken::new(), ChainId(1), request_bytes())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Directory(DirectoryError::Unavailable(_))
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_success_is_byte_exact_and_reports_healthy_once() {
        const BACKEND_BODY: &[u8] = b"{\"result\": \"0x10\",  \"id\":1,\"jsonrpc\":\"2.0\"}\n";
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![endpoint(4), endpoint(9)]));
        let transport = Arc::new(FakeTransport::new(Behavior::Respond(BACKEND_BODY)));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let body = d
            .forward(&CancellationToken::new(), ChainId(1), request_bytes())
            .await
            .unwrap();

        assert_eq!(&body[..], BACKEND_BODY);
        assert_eq!(directory.reports(), vec![(4, HealthStatus::Healthy)]);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "http://node-4:8545");
        assert_eq!(calls[0].1, "application/json");
        assert_eq!(calls[0].2, request_bytes());
    }

    #[tokio::test]
    async fn test_transport_failure_reports_error_once() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![endpoint(2)]));
        let transport = Arc::new(FakeTransport::new(Behavior::Fail));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let err = d
            .forward(&CancellationToken::new(), ChainId(1), request_bytes())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::BackendUnreachable {
                source: BackendError::Connect(_),
                ..
            }
        ));
        assert_eq!(directory.reports(), vec![(2, HealthStatus::Error)]);
    }

    #[tokio::test]
    async fn test_first_endpoint_without_failover() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![
            endpoint(1),
            endpoint(2),
            endpoint(3),
        ]));
        let transport = Arc::new(FakeTransport::new(Behavior::Fail));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        for _ in 0..3 {
            let _ = d
                .forward(&CancellationToken::new(), ChainId(1), request_bytes())
                .await;
        }

        let urls: Vec<String> = transport.calls().into_iter().map(|c| c.0).collect();
        assert_eq!(urls, vec!["http://node-1:8545"; 3]);
        assert!(directory.reports().iter().all(|(id, _)| *id == 1));
    }

    #[tokio::test]
    async fn test_failed_health_report_is_swallowed() {
        let directory = Arc::new(FakeDirectory {
            endpoints: Some(vec![endpoint(1)]),
            fail_updates: true,
            ..Default::default()
        });
        let network = Arc::new(FakeNetwork::answering(None));

        let ok_transport = Arc::new(FakeTransport::new(Behavior::Respond(b"{\"result\":1}")));
        let body = dispatcher(&directory, &ok_transport, &network)
            .forward(&CancellationToken::new(), ChainId(1), request_bytes())
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"result\":1}");

        let bad_transport = Arc::new(FakeTransport::new(Behavior::Fail));
        let err = dispatcher(&directory, &bad_transport, &network)
            .forward(&CancellationToken::new(), ChainId(1), request_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::BackendUnreachable { .. }));
        assert_eq!(directory.reports().len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_call() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![endpoint(1)]));
        let transport = Arc::new(FakeTransport::new(Behavior::Hang));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            d.forward(&cancel, ChainId(1), request_bytes()),
        )
        .await
        .expect("forward should return promptly after cancellation");

        assert!(matches!(result, Err(DispatchError::Cancelled)));
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(directory.reports(), vec![(1, HealthStatus::Error)]);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_skips_directory_call() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![endpoint(1)]));
        let transport = Arc::new(FakeTransport::new(Behavior::Respond(b"{}")));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = d.forward(&cancel, ChainId(1), request_bytes()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
        assert!(transport.calls().is_empty());
        assert!(directory.reports().is_empty());
    }

    /// Picks the last endpoint of the list.
    struct LastEndpoint;

    impl EndpointSelector for LastEndpoint {
        fn select<'a>(&self, endpoints: &'a [Endpoint]) -> Option<&'a Endpoint> {
            endpoints.last()
        }
    }

    #[tokio::test]
    async fn test_custom_selector_picks_target() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![
            endpoint(1),
            endpoint(2),
            endpoint(3),
        ]));
        let transport = Arc::new(FakeTransport::new(Behavior::Respond(b"{}")));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network).with_selector(Arc::new(LastEndpoint));

        d.forward(&CancellationToken::new(), ChainId(1), request_bytes())
            .await
            .unwrap();

        let urls: Vec<String> = transport.calls().into_iter().map(|c| c.0).collect();
        assert_eq!(urls, vec!["http://node-3:8545"]);
        assert_eq!(directory.reports(), vec![(3, HealthStatus::Healthy)]);
    }

    // -----------------------------------------------------------------------
    // Translated route
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_viper_round_trips_correlation_id() {
        let directory = Arc::new(FakeDirectory::with_endpoints(vec![endpoint(1)]));
        let transport = Arc::new(FakeTransport::new(Behavior::Respond(b"{}")));
        let network = Arc::new(FakeNetwork::answering(Some(NativeResponse::new(
            200,
            r#"{"height":88120}"#,
        ))));
        let d = dispatcher(&directory, &transport, &network);

        let request = Bytes::from_static(br#"{"jsonrpc":"2.0","method":"viper_height","params":[],"id":7}"#);
        let body = d
            .forward(&CancellationToken::new(), ChainId::VIPER_NETWORK, request)
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "result": 88120, "id": 7}));

        let calls = network.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(RequestKind::Height, NativeRequest::Empty {})]);
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
        assert!(directory.reports().is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_viper_generic_method_round_trips_id() {
        let directory = Arc::new(FakeDirectory::default());
        let transport = Arc::new(FakeTransport::new(Behavior::Fail));
        let network = Arc::new(FakeNetwork::answering(Some(NativeResponse::new(
            200,
            r#"{"result":[]}"#,
        ))));
        let d = dispatcher(&directory, &transport, &network);

        let request = Bytes::from_static(br#"{"jsonrpc":"2.0","method":"m","params":[],"id":7}"#);
        let body = d
            .forward(&CancellationToken::new(), ChainId::VIPER_NETWORK, request)
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["result"], json!([]));

        let calls = network.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, RequestKind::Call);
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
        assert!(directory.reports().is_empty());
    }

    #[tokio::test]
    async fn test_viper_untranslatable_request_never_reaches_network() {
        let directory = Arc::new(FakeDirectory::default());
        let transport = Arc::new(FakeTransport::new(Behavior::Fail));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let request = Bytes::from_static(br#"{"jsonrpc":"2.0","method":"viper_tx","params":[],"id":7}"#);
        let err = d
            .forward(&CancellationToken::new(), ChainId::VIPER_NETWORK, request)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TranslationFailed(_)));
        assert!(network.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_viper_handler_failure_is_backend_unreachable() {
        let directory = Arc::new(FakeDirectory::default());
        let transport = Arc::new(FakeTransport::new(Behavior::Fail));
        let network = Arc::new(FakeNetwork::answering(None));
        let d = dispatcher(&directory, &transport, &network);

        let request =
            Bytes::from_static(br#"{"jsonrpc":"2.0","method":"viper_block","params":[10],"id":"b"}"#);
        let err = d
            .forward(&CancellationToken::new(), ChainId::VIPER_NETWORK, request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::BackendUnreachable {
                source: BackendError::Timeout(_),
                ..
            }
        ));
        assert!(directory.reports().is_empty());
    }
}
