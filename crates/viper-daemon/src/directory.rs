// crates/viper-daemon/src/directory.rs
//
// InMemoryDirectory: endpoint directory backed by the daemon configuration.
//
// Endpoints are loaded once at startup. Health reports update the in-memory
// record only; nothing is persisted across restarts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use viper_core::{ChainId, DirectoryError, Endpoint, EndpointDirectory, EndpointId, HealthStatus};

use crate::config::EndpointConfig;

#[derive(Debug, Clone)]
struct Entry {
    endpoint: Endpoint,
    enabled: bool,
}

/// Endpoint directory held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<HashMap<EndpointId, Entry>>,
}

impl InMemoryDirectory {
    pub fn from_config(endpoints: &[EndpointConfig]) -> Self {
        let entries = endpoints
            .iter()
            .map(|cfg| {
                (
                    cfg.id,
                    Entry {
                        endpoint: cfg.to_endpoint(),
                        enabled: cfg.enabled,
                    },
                )
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Number of enabled endpoints per chain, for startup logging.
    pub async fn chain_summary(&self) -> Vec<(ChainId, usize)> {
        let entries = self.entries.read().await;
        let mut counts: HashMap<ChainId, usize> = HashMap::new();
        for entry in entries.values().filter(|e| e.enabled) {
            *counts.entry(entry.endpoint.chain_id).or_default() += 1;
        }
        let mut summary: Vec<(ChainId, usize)> = counts.into_iter().collect();
        summary.sort();
        summary
    }
}

#[async_trait]
impl EndpointDirectory for InMemoryDirectory {
    /// Enabled endpoints of the chain, ordered by `(priority, id)`.
    ///
    /// Health does not affect ordering or membership.
    async fn get_active_endpoints(&self, chain_id: ChainId) -> Result<Vec<Endpoint>, DirectoryError> {
        let entries = self.entries.read().await;
        let mut active: Vec<Endpoint> = entries
            .values()
            .filter(|e| e.enabled && e.endpoint.chain_id == chain_id)
            .map(|e| e.endpoint.clone())
            .collect();
        active.sort_by_key(|e| (e.priority, e.id));
        Ok(active)
    }

    async fn update_endpoint_health(
        &self,
        id: EndpointId,
        status: HealthStatus,
    ) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or(DirectoryError::NotFound(id))?;
        if entry.endpoint.status != status {
            tracing::info!(
                "Endpoint {} ({}) is now {}",
                id,
                entry.endpoint.url,
                status
            );
        }
        entry.endpoint.status = status;
        Ok(())
    }
}
