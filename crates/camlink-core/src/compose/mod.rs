//! Compositor: paints the active endpoints' frames into one output canvas.
//!
//! For every output tick the host takes a snapshot of the active endpoints
//! (in activation order, each with its rotation and optional latest frame)
//! and calls [`Compositor::compose`].  The algorithm:
//!
//! 1. Start from a black canvas of exactly the configured resolution.
//! 2. Ask the [`LayoutMode`] which endpoint goes into which [`Region`].
//! 3. For each placement: rotate the frame, scale it to fit the region while
//!    preserving aspect ratio, and centre it (letterbox / pillarbox).  The
//!    image is never cropped and never distorted.
//! 4. If mirroring is on, flip the whole canvas horizontally, after layout,
//!    so in a split view camera 1 ends up on the right.
//!
//! A missing or unusable frame leaves its region black for this tick only;
//! it never affects the other region.
//!
//! [`LayoutMode`]: crate::domain::layout::LayoutMode
//! [`Region`]: crate::domain::layout::Region

mod placement;

pub use placement::{fit_within, scale_to_fit, ComposeError};

use image::{imageops, imageops::FilterType, RgbImage};
use tracing::warn;

use crate::domain::{frame::Frame, layout::LayoutMode, rotation::Rotation};

/// Read-only view of one active endpoint for a single compose call.
#[derive(Debug, Clone, Copy)]
pub struct SourceView<'a> {
    /// Latest decoded frame, if any has arrived yet.
    pub frame: Option<&'a Frame>,
    /// Rotation to apply before placement.
    pub rotation: Rotation,
}

impl<'a> SourceView<'a> {
    pub fn new(frame: Option<&'a Frame>, rotation: Rotation) -> Self {
        Self { frame, rotation }
    }
}

/// Produces fixed-size output canvases.
#[derive(Debug, Clone)]
pub struct Compositor {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Compositor {
    /// Creates a compositor for a `width × height` output using bilinear
    /// resampling.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
        }
    }

    /// Overrides the resampling filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Output canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Output canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns an all-black canvas of the output resolution.
    pub fn black_canvas(&self) -> RgbImage {
        RgbImage::new(self.width, self.height)
    }

    /// Composes one output canvas.
    ///
    /// `sources` must be in activation order; index 0 is camera 1.  The
    /// returned canvas is always exactly `width × height`.
    pub fn compose(&self, sources: &[SourceView<'_>], mode: LayoutMode, mirror: bool) -> RgbImage {
        let mut canvas = self.black_canvas();

        for placement in mode.regions(sources.len(), self.width, self.height) {
            let Some(source) = sources.get(placement.source) else {
                continue;
            };
            let Some(frame) = source.frame else {
                // Active but no frame yet: region stays black.
                continue;
            };

            let region = placement.region;
            match scale_to_fit(frame, source.rotation, region.width, region.height, self.filter) {
                Ok(scaled) => {
                    let x = region.x + (region.width - scaled.width()) / 2;
                    let y = region.y + (region.height - scaled.height()) / 2;
                    imageops::replace(&mut canvas, &scaled, i64::from(x), i64::from(y));
                }
                Err(e) => {
                    warn!(
                        source = placement.source,
                        "region left black for this tick: {e}"
                    );
                }
            }
        }

        if mirror {
            imageops::flip_horizontal_in_place(&mut canvas);
        }
        canvas
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
