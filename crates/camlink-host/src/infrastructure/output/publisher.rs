//! Output loop: compose a canvas every tick and hand it to the sink.
//!
//! ```text
//! loop {
//!     sink.sleep_until_next_frame()      ← pacing lives in the sink
//!     canvas = compose_tick()            ← on a blocking thread
//!     sink.send(canvas)
//! }
//! ```
//!
//! If the sink fails (device unplugged, module reloaded) the publisher drops
//! it, waits the reopen backoff, and opens a new one through its
//! [`SinkOpener`].  The process keeps running and the receivers keep
//! collecting frames in the meantime.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{FrameSink, SinkError};
use crate::application::compose_output::ComposeOutputUseCase;

/// Factory producing a freshly opened sink.
pub type SinkOpener = Box<dyn Fn() -> Result<Box<dyn FrameSink>, SinkError> + Send + Sync>;

/// Drives one sink at a time with composed canvases.
pub struct OutputPublisher {
    compose: Arc<ComposeOutputUseCase>,
    opener: SinkOpener,
    reopen_backoff: Duration,
}

impl OutputPublisher {
    pub fn new(
        compose: Arc<ComposeOutputUseCase>,
        opener: SinkOpener,
        reopen_backoff: Duration,
    ) -> Self {
        Self {
            compose,
            opener,
            reopen_backoff,
        }
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let mut sink = match (self.opener)() {
                Ok(sink) => sink,
                Err(e) => {
                    warn!("could not open output sink: {e}; retrying in {:?}", self.reopen_backoff);
                    if !self.backoff(&shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            info!("output sink opened ({:?})", sink.format());
            match self.drive(sink.as_mut(), &shutdown).await {
                Ok(()) => break,
                Err(e) => {
                    error!("output sink failed: {e}; reopening in {:?}", self.reopen_backoff);
                    drop(sink);
                    if !self.backoff(&shutdown).await {
                        break;
                    }
                }
            }
        }
        info!("output publisher stopped");
    }

    /// Publishes frames until cancelled (`Ok`) or the sink fails (`Err`).
    async fn drive(
        &self,
        sink: &mut dyn FrameSink,
        shutdown: &CancellationToken,
    ) -> Result<(), SinkError> {
        let mut published: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                _ = sink.sleep_until_next_frame() => {}
            }

            let compose = Arc::clone(&self.compose);
            let canvas = match tokio::task::spawn_blocking(move || compose.compose_tick()).await {
                Ok(canvas) => canvas,
                Err(e) => {
                    error!("compose task failed: {e}");
                    continue;
                }
            };

            sink.send(canvas).await?;
            published += 1;
            if published == 1 {
                debug!("first frame published");
            }
        }
    }

    /// Sleeps the reopen backoff.  Returns `false` if cancelled meanwhile.
    async fn backoff(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.reopen_backoff) => true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use camlink_core::{Compositor, EndpointId, Frame};

    use crate::application::registry::StreamRegistry;
    use crate::application::session::Session;
    use crate::infrastructure::output::mock::{RecordedFrames, RecordingSink};

    fn compose_use_case(registry: Arc<StreamRegistry>) -> Arc<ComposeOutputUseCase> {
        Arc::new(ComposeOutputUseCase::new(
            registry,
            Arc::new(Session::new()),
            Compositor::new(16, 9),
        ))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_publisher_sends_composed_frames_until_cancelled() {
        // Arrange
        let registry = Arc::new(StreamRegistry::new());
        registry.publish_frame(
            &EndpointId::new("10.0.0.1"),
            Arc::new(Frame::solid(16, 9, [0, 255, 0])),
        );
        let frames = RecordedFrames::new();
        let recorded = frames.clone();
        let opener: SinkOpener = Box::new(move || -> Result<Box<dyn FrameSink>, SinkError> {
            Ok(Box::new(RecordingSink::new(recorded.clone(), 200)))
        });
        let publisher =
            OutputPublisher::new(compose_use_case(registry), opener, Duration::from_millis(10));
        let shutdown = CancellationToken::new();

        // Act
        let handle = tokio::spawn(publisher.run(shutdown.clone()));
        wait_until(|| frames.len() >= 3).await;
        shutdown.cancel();
        handle.await.unwrap();

        // Assert
        let last = frames.last().unwrap();
        assert_eq!(last.dimensions(), (16, 9));
        assert_eq!(last.get_pixel(8, 4).0, [0, 255, 0]);
    }

    #[tokio::test]
    async fn test_publisher_reopens_sink_after_failure() {
        // Arrange: every sink fails on its second send
        let opens = Arc::new(AtomicUsize::new(0));
        let frames = RecordedFrames::new();
        let (opens_in, recorded) = (Arc::clone(&opens), frames.clone());
        let opener: SinkOpener = Box::new(move || -> Result<Box<dyn FrameSink>, SinkError> {
            opens_in.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingSink::new(recorded.clone(), 200).failing_after(1)))
        });
        let registry = Arc::new(StreamRegistry::new());
        let publisher =
            OutputPublisher::new(compose_use_case(registry), opener, Duration::from_millis(10));
        let shutdown = CancellationToken::new();

        // Act
        let handle = tokio::spawn(publisher.run(shutdown.clone()));
        wait_until(|| opens.load(Ordering::SeqCst) >= 3).await;
        shutdown.cancel();
        handle.await.unwrap();

        // Assert: each sink delivered exactly one frame before failing
        assert!(frames.len() >= 2);
    }

    #[tokio::test]
    async fn test_publisher_retries_when_sink_cannot_be_opened() {
        // Arrange: the first two opens fail
        let attempts = Arc::new(AtomicUsize::new(0));
        let frames = RecordedFrames::new();
        let (attempts_in, recorded) = (Arc::clone(&attempts), frames.clone());
        let opener: SinkOpener = Box::new(move || -> Result<Box<dyn FrameSink>, SinkError> {
            if attempts_in.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(SinkError::Unsupported);
            }
            Ok(Box::new(RecordingSink::new(recorded.clone(), 200)))
        });
        let publisher = OutputPublisher::new(
            compose_use_case(Arc::new(StreamRegistry::new())),
            opener,
            Duration::from_millis(10),
        );
        let shutdown = CancellationToken::new();

        // Act
        let handle = tokio::spawn(publisher.run(shutdown.clone()));
        wait_until(|| !frames.is_empty()).await;
        shutdown.cancel();
        handle.await.unwrap();

        // Assert
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(frames.last().unwrap().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[tokio::test]
    async fn test_publisher_exits_promptly_when_cancelled_during_backoff() {
        let opener: SinkOpener =
            Box::new(|| -> Result<Box<dyn FrameSink>, SinkError> { Err(SinkError::Unsupported) });
        let publisher = OutputPublisher::new(
            compose_use_case(Arc::new(StreamRegistry::new())),
            opener,
            Duration::from_secs(3600),
        );
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(publisher.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("publisher must stop during backoff")
            .unwrap();
    }
}
