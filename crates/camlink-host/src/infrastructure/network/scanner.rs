//! Discovery scanner.
//!
//! Every pass enumerates `prefix + 1..=254` for each configured subnet
//! prefix, plus the static addresses, and probes the streaming port of each
//! candidate that is not yet registered.  Probes run concurrently, bounded by
//! a semaphore (50 permits by default).  Addresses that answer are
//! registered in candidate order and handed to the [`ReceiverLauncher`].
//!
//! The scanner never removes endpoints: once discovered, an endpoint's
//! receiver retries forever.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use camlink_core::EndpointId;
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::probe::PortProber;
use super::supervisor::ReceiverLauncher;
use crate::application::registry::StreamRegistry;

/// Unexpected failures that abort one scan pass.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("probe task failed: {0}")]
    ProbeTask(#[from] JoinError),

    #[error("probe pool closed: {0}")]
    PoolClosed(#[from] AcquireError),
}

/// Discovery settings, built from the `[network]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub port: u16,
    /// Subnet prefixes such as `"192.168.1."`.  A missing trailing dot is
    /// added.
    pub subnets: Vec<String>,
    pub static_addresses: Vec<EndpointId>,
    pub probe_timeout: Duration,
    /// Maximum number of probes in flight.
    pub concurrency: usize,
    /// Sleep after a completed pass.
    pub scan_interval: Duration,
    /// Sleep after a failed pass.
    pub retry_backoff: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            port: 6000,
            subnets: default_subnets(),
            static_addresses: Vec::new(),
            probe_timeout: Duration::from_millis(100),
            concurrency: 50,
            scan_interval: Duration::from_secs(15),
            retry_backoff: Duration::from_secs(5),
        }
    }
}

/// Subnet prefixes scanned when none are configured.
pub fn default_subnets() -> Vec<String> {
    ["192.168.1.", "192.168.0.", "192.168.8.", "10.0.0."]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Builds the ordered, duplicate-free candidate list for one pass.
///
/// Subnet hosts come first (`.1` to `.254` per prefix, prefixes in the
/// given order), then static addresses.
pub fn candidate_addresses(subnets: &[String], statics: &[EndpointId]) -> Vec<EndpointId> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(subnets.len() * 254 + statics.len());

    for subnet in subnets {
        let prefix = subnet.trim();
        if prefix.is_empty() {
            continue;
        }
        let prefix = if prefix.ends_with('.') {
            prefix.to_string()
        } else {
            format!("{prefix}.")
        };
        for host in 1..=254u8 {
            let endpoint = EndpointId::new(format!("{prefix}{host}"));
            if seen.insert(endpoint.clone()) {
                out.push(endpoint);
            }
        }
    }

    for endpoint in statics {
        if seen.insert(endpoint.clone()) {
            out.push(endpoint.clone());
        }
    }
    out
}

/// Periodic LAN discovery.
pub struct DiscoveryScanner {
    config: ScanConfig,
    prober: Arc<dyn PortProber>,
    registry: Arc<StreamRegistry>,
    launcher: Arc<dyn ReceiverLauncher>,
}

impl DiscoveryScanner {
    pub fn new(
        config: ScanConfig,
        prober: Arc<dyn PortProber>,
        registry: Arc<StreamRegistry>,
        launcher: Arc<dyn ReceiverLauncher>,
    ) -> Self {
        Self {
            config,
            prober,
            registry,
            launcher,
        }
    }

    /// Registers every static address and launches its receiver without
    /// waiting for a probe.
    pub fn register_static(&self) {
        for endpoint in &self.config.static_addresses {
            self.registry.register(endpoint);
            if self.launcher.launch(endpoint.clone()) {
                info!(%endpoint, "static endpoint added");
            }
        }
    }

    /// Runs one discovery pass and returns the newly registered endpoints.
    ///
    /// Returns early with whatever was found so far if `shutdown` is
    /// cancelled; outstanding probes are aborted.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if a probe task panics or the probe pool is
    /// closed.  Endpoints already registered in this pass stay registered.
    pub async fn scan_pass(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Vec<EndpointId>, ScanError> {
        let candidates: Vec<EndpointId> =
            candidate_addresses(&self.config.subnets, &self.config.static_addresses)
                .into_iter()
                .filter(|endpoint| !self.registry.contains(endpoint))
                .collect();
        debug!(candidates = candidates.len(), "scan pass started");

        let pool = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut probes = JoinSet::new();
        for (index, endpoint) in candidates.into_iter().enumerate() {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => {
                    probes.abort_all();
                    return Ok(Vec::new());
                }
                permit = Arc::clone(&pool).acquire_owned() => permit?,
            };
            let prober = Arc::clone(&self.prober);
            let (port, timeout) = (self.config.port, self.config.probe_timeout);
            probes.spawn(async move {
                let open = prober.probe(endpoint.clone(), port, timeout).await;
                drop(permit);
                (index, endpoint, open)
            });
        }

        let mut open = Vec::new();
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => {
                    probes.abort_all();
                    break;
                }
                next = probes.join_next() => next,
            };
            match next {
                None => break,
                Some(result) => {
                    let (index, endpoint, is_open) = result?;
                    if is_open {
                        open.push((index, endpoint));
                    }
                }
            }
        }
        open.sort_by_key(|(index, _)| *index);

        let mut added = Vec::new();
        for (_, endpoint) in open {
            if self.registry.register(&endpoint) {
                info!(%endpoint, "endpoint discovered");
                self.launcher.launch(endpoint.clone());
                added.push(endpoint);
            }
        }
        Ok(added)
    }

    /// Registers static addresses, then scans until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            subnets = ?self.config.subnets,
            port = self.config.port,
            "discovery scanner started"
        );
        self.register_static();

        while !shutdown.is_cancelled() {
            let pause = match self.scan_pass(&shutdown).await {
                Ok(added) => {
                    debug!(
                        added = added.len(),
                        known = self.registry.statuses().len(),
                        "scan pass complete"
                    );
                    self.config.scan_interval
                }
                Err(e) => {
                    error!("scan pass failed: {e}; retrying in {:?}", self.config.retry_backoff);
                    self.config.retry_backoff
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
        info!("discovery scanner stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
