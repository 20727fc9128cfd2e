//! Aspect-preserving fit of one frame into one region.

use image::{imageops, imageops::FilterType, RgbImage};
use thiserror::Error;

use crate::domain::{frame::Frame, rotation::Rotation};

/// Reasons a single region could not be rendered.
///
/// These never abort a compose call; the affected region stays black.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("frame has zero size ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("target region has zero size ({width}x{height})")]
    EmptyRegion { width: u32, height: u32 },
}

/// Largest `(w, h)` with the aspect ratio of `src_w × src_h` that fits in
/// `max_w × max_h`.
///
/// The binding axis matches the bound exactly; the other axis is
/// `floor(src * scale)`, clamped to at least one pixel.  Integer maths only,
/// so a 100×50 image in a 1920×1080 box yields exactly `(1920, 960)`.
///
/// All four inputs must be non-zero.
///
/// # Examples
///
/// ```rust
/// use camlink_core::fit_within;
///
/// assert_eq!(fit_within(50, 100, 1920, 1080), (540, 1080));
/// ```
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let (sw, sh) = (u64::from(src_w), u64::from(src_h));
    let (mw, mh) = (u64::from(max_w), u64::from(max_h));

    // Compare sw/sh against mw/mh without division.
    if sw * mh >= sh * mw {
        let h = (sh * mw / sw).clamp(1, mh);
        (max_w, h as u32)
    } else {
        let w = (sw * mh / sh).clamp(1, mw);
        (w as u32, max_h)
    }
}

/// Rotates `frame` and scales it to the largest size that fits
/// `width × height` without cropping or distortion.
pub fn scale_to_fit(
    frame: &Frame,
    rotation: Rotation,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<RgbImage, ComposeError> {
    if frame.is_empty() {
        return Err(ComposeError::EmptyFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }
    if width == 0 || height == 0 {
        return Err(ComposeError::EmptyRegion { width, height });
    }

    let rotated = rotation.apply(frame.image());
    let (rw, rh) = rotated.dimensions();
    let (tw, th) = fit_within(rw, rh, width, height);

    if (tw, th) == (rw, rh) {
        return Ok(rotated.into_owned());
    }
    Ok(imageops::resize(&*rotated, tw, th, filter))
}
