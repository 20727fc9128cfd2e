//! Recording sink for tests.
//!
//! Captures every canvas it is given so tests can assert on what the
//! publisher produced, and can be told to fail to exercise the reopen path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use image::RgbImage;

use super::{FramePacer, FrameSink, OutputFormat, SinkError};

/// Frames shared between a [`RecordingSink`] and the test that inspects it.
#[derive(Debug, Clone, Default)]
pub struct RecordedFrames {
    frames: Arc<Mutex<Vec<RgbImage>>>,
}

impl RecordedFrames {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RgbImage>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of frames recorded so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the most recent frame.
    pub fn last(&self) -> Option<RgbImage> {
        self.lock().last().cloned()
    }

    fn push(&self, frame: RgbImage) {
        self.lock().push(frame);
    }
}

/// A [`FrameSink`] that stores frames in memory.
#[derive(Debug)]
pub struct RecordingSink {
    frames: RecordedFrames,
    pacer: FramePacer,
    /// Number of `send` calls that succeed before every further call fails.
    fail_after: Option<usize>,
    sends: usize,
}

impl RecordingSink {
    /// Creates a sink pacing at `fps` that records into `frames`.
    pub fn new(frames: RecordedFrames, fps: u32) -> Self {
        Self {
            frames,
            pacer: FramePacer::new(fps),
            fail_after: None,
            sends: 0,
        }
    }

    /// Makes every `send` after the first `n` return an I/O error.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    fn format(&self) -> OutputFormat {
        OutputFormat::Rgb24
    }

    async fn send(&mut self, canvas: RgbImage) -> Result<(), SinkError> {
        let n = self.sends;
        self.sends += 1;
        if matches!(self.fail_after, Some(limit) if n >= limit) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected failure",
            )));
        }
        self.frames.push(canvas);
        Ok(())
    }

    async fn sleep_until_next_frame(&mut self) {
        self.pacer.tick().await;
    }
}
