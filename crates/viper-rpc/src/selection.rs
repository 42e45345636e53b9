// crates/viper-rpc/src/selection.rs
//
// Endpoint selection policy for pass-through requests.
//
// The directory hands back endpoints already ordered by preference, and the
// shipped policy picks the head of that list. There is no failover: if the
// chosen endpoint fails the request fails.

use viper_core::Endpoint;

/// Chooses which endpoint serves a pass-through request.
pub trait EndpointSelector: Send + Sync {
    /// Pick one endpoint from a non-empty, preference-ordered slice.
    ///
    /// Returns `None` only when `endpoints` is empty.
    fn select<'a>(&self, endpoints: &'a [Endpoint]) -> Option<&'a Endpoint>;
}

/// Always selects the first (most preferred) endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstEndpoint;

impl EndpointSelector for FirstEndpoint {
    fn select<'a>(&self, endpoints: &'a [Endpoint]) -> Option<&'a Endpoint> {
        endpoints.first()
    }
}
