//! Headless sink: paces like a device, discards the pixels.

use async_trait::async_trait;
use image::RgbImage;
use tracing::trace;

use super::{
    check_dimensions, encode_and_write, FramePacer, FrameSink, OutputFormat, OutputSettings,
    SinkError,
};

/// Sink used when no output device is configured.
///
/// Frames are converted to the configured format anyway so a headless run
/// costs the same CPU as a real one.
#[derive(Debug)]
pub struct NullSink {
    width: u32,
    height: u32,
    format: OutputFormat,
    pacer: FramePacer,
    frames_sent: u64,
}

impl NullSink {
    pub fn new(settings: &OutputSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            format: settings.format,
            pacer: FramePacer::new(settings.fps),
            frames_sent: 0,
        }
    }

    /// Number of frames accepted so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

#[async_trait]
impl FrameSink for NullSink {
    fn format(&self) -> OutputFormat {
        self.format
    }

    async fn send(&mut self, canvas: RgbImage) -> Result<(), SinkError> {
        check_dimensions(&canvas, self.width, self.height)?;
        let bytes = encode_and_write(self.format, canvas, |_| Ok(())).await?;
        self.frames_sent += 1;
        trace!(bytes, frame = self.frames_sent, "frame discarded");
        Ok(())
    }

    async fn sleep_until_next_frame(&mut self) {
        self.pacer.tick().await;
    }
}
