//! Owns one receiver task per endpoint.
//!
//! The scanner and the startup code only know the [`ReceiverLauncher`]
//! trait.  The supervisor guarantees at most one running receiver per
//! endpoint: a second launch for an endpoint whose task is still alive is
//! refused.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camlink_core::{EndpointId, FrameDecoder};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::receiver::{ReceiverConfig, StreamReceiver};
use crate::application::registry::StreamRegistry;

/// Starts a receiver for an endpoint.
pub trait ReceiverLauncher: Send + Sync {
    /// Returns `true` if a new receiver was started, `false` if one is
    /// already running for `endpoint`.
    fn launch(&self, endpoint: EndpointId) -> bool;
}

/// Spawns [`StreamReceiver`] tasks on the current Tokio runtime.
pub struct ReceiverSupervisor {
    registry: Arc<StreamRegistry>,
    decoder: Arc<dyn FrameDecoder>,
    config: ReceiverConfig,
    shutdown: CancellationToken,
    handles: Mutex<HashMap<EndpointId, JoinHandle<()>>>,
}

impl ReceiverSupervisor {
    pub fn new(
        registry: Arc<StreamRegistry>,
        decoder: Arc<dyn FrameDecoder>,
        config: ReceiverConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            decoder,
            config,
            shutdown,
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<EndpointId, JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of receiver tasks that have not finished.
    pub fn running(&self) -> usize {
        self.handles().values().filter(|h| !h.is_finished()).count()
    }

    /// Waits for every receiver task to finish.
    ///
    /// Call after cancelling the shutdown token.
    pub async fn join_all(&self) {
        let handles: Vec<(EndpointId, JoinHandle<()>)> = self.handles().drain().collect();
        for (endpoint, handle) in handles {
            if let Err(e) = handle.await {
                warn!(%endpoint, "receiver task ended abnormally: {e}");
            }
        }
        debug!("all receivers stopped");
    }
}

impl ReceiverLauncher for ReceiverSupervisor {
    fn launch(&self, endpoint: EndpointId) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        let mut handles = self.handles();
        if handles.get(&endpoint).is_some_and(|h| !h.is_finished()) {
            debug!(%endpoint, "receiver already running");
            return false;
        }

        let receiver = StreamReceiver::new(
            endpoint.clone(),
            self.config.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.decoder),
        );
        let handle = tokio::spawn(receiver.run(self.shutdown.child_token()));
        info!(%endpoint, "receiver started");
        handles.insert(endpoint, handle);
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use camlink_core::ImageFrameDecoder;

    fn supervisor(shutdown: CancellationToken) -> ReceiverSupervisor {
        // Port 9 (discard) on TEST-NET-1 never answers; receivers just retry.
        ReceiverSupervisor::new(
            Arc::new(StreamRegistry::new()),
            Arc::new(ImageFrameDecoder::new()),
            ReceiverConfig {
                port: 9,
                connect_timeout: Duration::from_millis(50),
                reconnect_backoff: Duration::from_millis(50),
            },
            shutdown,
        )
    }

    #[tokio::test]
    async fn test_launch_refuses_duplicate_endpoint() {
        // Arrange
        let shutdown = CancellationToken::new();
        let supervisor = supervisor(shutdown.clone());
        let endpoint = EndpointId::new("192.0.2.1");

        // Act
        let first = supervisor.launch(endpoint.clone());
        let second = supervisor.launch(endpoint);

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(supervisor.running(), 1);

        shutdown.cancel();
        supervisor.join_all().await;
    }

    #[tokio::test]
    async fn test_launch_distinct_endpoints_runs_one_task_each() {
        let shutdown = CancellationToken::new();
        let supervisor = supervisor(shutdown.clone());

        assert!(supervisor.launch(EndpointId::new("192.0.2.1")));
        assert!(supervisor.launch(EndpointId::new("192.0.2.2")));

        assert_eq!(supervisor.running(), 2);
        shutdown.cancel();
        supervisor.join_all().await;
    }

    #[tokio::test]
    async fn test_join_all_completes_after_cancel() {
        // Arrange
        let shutdown = CancellationToken::new();
        let supervisor = supervisor(shutdown.clone());
        supervisor.launch(EndpointId::new("192.0.2.1"));

        // Act
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), supervisor.join_all())
            .await
            .expect("receivers must stop after cancel");

        // Assert
        assert_eq!(supervisor.running(), 0);
    }

    #[tokio::test]
    async fn test_launch_after_shutdown_is_refused() {
        let shutdown = CancellationToken::new();
        let supervisor = supervisor(shutdown.clone());
        shutdown.cancel();

        assert!(!supervisor.launch(EndpointId::new("192.0.2.1")));
    }
}
