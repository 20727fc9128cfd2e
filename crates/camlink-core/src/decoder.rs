//! Frame decoder: compressed image bytes to a [`Frame`].
//!
//! Phones send each camera image as an independently compressed still
//! (normally JPEG).  The decoder sniffs the format from the payload's magic
//! bytes, so any format enabled in the `image` crate features is accepted.
//!
//! Decoding is CPU-bound.  Callers on an async runtime must run it on a
//! blocking thread (`tokio::task::spawn_blocking`) and never while holding
//! the registry lock.

use thiserror::Error;

use crate::domain::frame::Frame;

/// Errors produced while decoding a payload.
///
/// Every variant is local to one frame: the frame is dropped and the
/// connection it arrived on stays open.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload contained no bytes.
    #[error("empty payload")]
    EmptyPayload,

    /// The payload is not a decodable image.
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// The image decoded but has a zero dimension.
    #[error("decoded image has zero size ({width}x{height})")]
    ZeroSized { width: u32, height: u32 },
}

/// Trait abstracting payload decoding.
///
/// The production implementation is [`ImageFrameDecoder`]; tests substitute
/// decoders that fail on demand or count invocations.
pub trait FrameDecoder: Send + Sync {
    /// Decodes one compressed payload into an RGB frame.
    fn decode(&self, payload: &[u8]) -> Result<Frame, DecodeError>;
}

/// Decoder backed by the `image` crate (JPEG and PNG).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFrameDecoder;

impl ImageFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Frame, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        let rgb = image::load_from_memory(payload)?.into_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroSized { width, height });
        }
        Ok(Frame::new(rgb))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
