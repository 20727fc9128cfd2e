//! Decoded camera frames.

use image::{Rgb, RgbImage};

/// A decoded camera image in packed RGB24.
///
/// Frames are immutable once produced.  The registry stores them behind an
/// `Arc` so the compositor can read the latest frame of an endpoint while a
/// receiver is already decoding the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wraps an already decoded RGB image.
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Creates a frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Returns `true` if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Borrows the underlying pixel buffer.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consumes the frame and returns the pixel buffer.
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}
