//! V4L2 loopback output.
//!
//! Requires the `v4l2loopback` kernel module:
//!
//! ```bash
//! sudo modprobe v4l2loopback devices=1 video_nr=10 card_label="camlink" exclusive_caps=1
//! ```
//!
//! The output format is negotiated with a `VIDIOC_S_FMT` ioctl through the
//! `v4l` crate; frames are then written to the device node with plain
//! `write(2)` calls, one full frame per call.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;
use tracing::{debug, info, warn};
use v4l::video::Output;
use v4l::{Device, FourCC};

use super::{
    check_dimensions, encode_and_write, FramePacer, FrameSink, OutputFormat, OutputSettings,
    SinkError,
};

/// Writes canvases to a v4l2loopback device node.
pub struct V4l2Sink {
    path: PathBuf,
    /// Shared with the blocking write step; `&File` implements `Write`.
    file: Arc<File>,
    width: u32,
    height: u32,
    format: OutputFormat,
    pacer: FramePacer,
    frames_written: u64,
}

impl V4l2Sink {
    /// Opens `path` for writing and configures the output format.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::DeviceNotFound`] if the node does not exist,
    /// [`SinkError::PermissionDenied`] if it cannot be opened for writing,
    /// and [`SinkError::Io`] for any other failure.
    pub fn open(path: &Path, settings: &OutputSettings) -> Result<Self, SinkError> {
        info!(
            "opening v4l2 loopback device {} ({}x{}, {:?})",
            path.display(),
            settings.width,
            settings.height,
            settings.format
        );

        if !path.exists() {
            return Err(SinkError::DeviceNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => SinkError::PermissionDenied {
                    path: path.to_path_buf(),
                },
                _ => SinkError::Io(e),
            })?;

        configure_format(path, settings)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(file),
            width: settings.width,
            height: settings.height,
            format: settings.format,
            pacer: FramePacer::new(settings.fps),
            frames_written: 0,
        })
    }
}

/// Sets the output format on the device.
///
/// v4l2loopback devices often keep the format of the first writer, so a
/// rejected `S_FMT` is logged and tolerated.
fn configure_format(path: &Path, settings: &OutputSettings) -> Result<(), SinkError> {
    let device = Device::with_path(path)?;
    let fourcc = FourCC::new(&settings.format.fourcc());
    let mut requested = v4l::Format::new(settings.width, settings.height, fourcc);
    requested.stride = settings.format.bytes_per_line(settings.width);
    requested.size = settings.format.frame_size(settings.width, settings.height) as u32;

    match Output::set_format(&device, &requested) {
        Ok(actual) => {
            if actual.width != settings.width
                || actual.height != settings.height
                || actual.fourcc != fourcc
            {
                warn!(
                    "device accepted {}x{} {} instead of the requested {}x{} {}",
                    actual.width,
                    actual.height,
                    actual.fourcc,
                    settings.width,
                    settings.height,
                    fourcc
                );
            } else {
                debug!("v4l2 format set: {}x{} {}", actual.width, actual.height, fourcc);
            }
        }
        Err(e) => warn!("could not set v4l2 format (may still work): {e}"),
    }
    Ok(())
}

#[async_trait]
impl FrameSink for V4l2Sink {
    fn format(&self) -> OutputFormat {
        self.format
    }

    async fn send(&mut self, canvas: RgbImage) -> Result<(), SinkError> {
        check_dimensions(&canvas, self.width, self.height)?;
        let file = Arc::clone(&self.file);
        // One write(2) per frame; v4l2loopback takes whole frames only.
        encode_and_write(self.format, canvas, move |bytes| (&*file).write_all(bytes)).await?;
        self.frames_written += 1;
        Ok(())
    }

    async fn sleep_until_next_frame(&mut self) {
        self.pacer.tick().await;
    }
}

impl Drop for V4l2Sink {
    fn drop(&mut self) {
        info!(
            "closing v4l2 device {} (wrote {} frames)",
            self.path.display(),
            self.frames_written
        );
    }
}
