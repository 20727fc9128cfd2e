//! Output sinks: where composed canvases go.
//!
//! A [`FrameSink`] accepts one fixed-resolution canvas per call and owns the
//! output pacing.  The [`publisher`] drives a sink at the configured frame
//! rate; it never sleeps on its own.
//!
//! # Implementations
//!
//! - **`v4l2`** (Linux, feature `v4l2`) – Writes frames to a v4l2loopback
//!   device so video-conferencing apps see camlink as a webcam.
//! - **`null`** – Discards frames but paces exactly like a real device.  Used
//!   for headless runs when no device is configured.
//! - **`mock`** – Records every frame it receives, for tests.
//!
//! # Pixel formats (for beginners)
//!
//! The compositor produces packed RGB24 (3 bytes per pixel).  Most consumers
//! of v4l2loopback devices prefer YUYV (YUV 4:2:2, 2 bytes per pixel), so the
//! sink converts on the fly; see [`convert`].

pub mod convert;
pub mod mock;
pub mod null;
pub mod publisher;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub mod v4l2;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Errors produced by output sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The configured device node does not exist.
    #[error("output device {} not found", .path.display())]
    DeviceNotFound { path: PathBuf },

    /// The device exists but could not be opened for writing.
    #[error("permission denied for {}, try adding the user to the 'video' group", .path.display())]
    PermissionDenied { path: PathBuf },

    /// An I/O error occurred while configuring or writing the device.
    #[error("output device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The canvas does not match the resolution the sink was opened with.
    #[error("canvas is {actual_width}x{actual_height}, sink expects {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The blocking encode/write step panicked or was cancelled.
    #[error("output write task failed: {0}")]
    WriteTask(#[from] tokio::task::JoinError),

    /// A device was configured but this build cannot drive it.
    #[error("device output requested but camlink-host was built without the `v4l2` feature")]
    Unsupported,
}

/// Pixel format written to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Packed 8-bit R, G, B.
    Rgb24,
    /// Packed YUV 4:2:2 (`Y0 U Y1 V`).
    #[default]
    Yuyv,
}

impl OutputFormat {
    /// V4L2 FourCC code for this format.
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            OutputFormat::Rgb24 => *b"RGB3",
            OutputFormat::Yuyv => *b"YUYV",
        }
    }

    /// Bytes per line for a frame `width` pixels wide.
    pub fn bytes_per_line(self, width: u32) -> u32 {
        match self {
            OutputFormat::Rgb24 => width * 3,
            OutputFormat::Yuyv => width * 2,
        }
    }

    /// Total byte size of one `width × height` frame.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        self.bytes_per_line(width) as usize * height as usize
    }

    /// Converts an RGB canvas into this format's byte layout.
    pub fn encode(self, canvas: &RgbImage) -> Vec<u8> {
        match self {
            OutputFormat::Rgb24 => canvas.as_raw().clone(),
            OutputFormat::Yuyv => convert::rgb_to_yuyv(canvas),
        }
    }
}

/// Runtime output settings, built from the `[output]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Loopback device node, e.g. `/dev/video10`.  `None` runs headless.
    pub device: Option<PathBuf>,
    pub format: OutputFormat,
    /// Wait between attempts to reopen a failed sink.
    pub reopen_backoff: Duration,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            device: None,
            format: OutputFormat::Yuyv,
            reopen_backoff: Duration::from_secs(2),
        }
    }
}

impl OutputSettings {
    /// Time between two output frames.
    pub fn frame_period(&self) -> Duration {
        frame_period(self.fps)
    }
}

fn frame_period(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Destination for composed canvases.
#[async_trait]
pub trait FrameSink: Send {
    /// Pixel format the sink writes.
    fn format(&self) -> OutputFormat;

    /// Writes one canvas.  The canvas must match the sink's resolution.
    async fn send(&mut self, canvas: RgbImage) -> Result<(), SinkError>;

    /// Waits until the next frame is due.
    async fn sleep_until_next_frame(&mut self);
}

/// Fixed-rate pacing shared by all sinks.
///
/// Backed by a `tokio::time::Interval` that skips missed ticks, so a slow
/// frame delays the output once instead of causing a burst of catch-up
/// frames.  The interval is created on the first tick, so a pacer can be
/// built outside a Tokio runtime.
#[derive(Debug)]
pub struct FramePacer {
    period: Duration,
    interval: Option<Interval>,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            period: frame_period(fps),
            interval: None,
        }
    }

    /// Time between two ticks.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completes at the next tick.  The first call completes immediately.
    pub async fn tick(&mut self) {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;
    }
}

/// Checks that a canvas matches the sink's configured resolution.
pub(crate) fn check_dimensions(
    canvas: &RgbImage,
    width: u32,
    height: u32,
) -> Result<(), SinkError> {
    let (actual_width, actual_height) = canvas.dimensions();
    if (actual_width, actual_height) != (width, height) {
        return Err(SinkError::DimensionMismatch {
            width,
            height,
            actual_width,
            actual_height,
        });
    }
    Ok(())
}

/// Converts `canvas` to `format` and passes the bytes to `write`, both on
/// the blocking pool.  Returns the number of bytes written.
pub(crate) async fn encode_and_write<F>(
    format: OutputFormat,
    canvas: RgbImage,
    write: F,
) -> Result<usize, SinkError>
where
    F: FnOnce(&[u8]) -> std::io::Result<()> + Send + 'static,
{
    let written = tokio::task::spawn_blocking(move || {
        let bytes = format.encode(&canvas);
        write(&bytes).map(|()| bytes.len())
    })
    .await??;
    Ok(written)
}

/// Opens the sink described by `settings`.
///
/// # Errors
///
/// Returns [`SinkError::Unsupported`] when a device is configured on a build
/// without the `v4l2` feature, and any device error from opening it.
pub fn open_sink(settings: &OutputSettings) -> Result<Box<dyn FrameSink>, SinkError> {
    match &settings.device {
        None => Ok(Box::new(null::NullSink::new(settings))),
        #[cfg(all(target_os = "linux", feature = "v4l2"))]
        Some(path) => Ok(Box::new(v4l2::V4l2Sink::open(path, settings)?)),
        #[cfg(not(all(target_os = "linux", feature = "v4l2")))]
        Some(_) => Err(SinkError::Unsupported),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
