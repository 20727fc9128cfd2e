//! Layout modes and canvas regions.
//!
//! The output canvas is divided into rectangular [`Region`]s, each filled by
//! one active endpoint.  Which endpoint goes where is decided by the
//! [`LayoutMode`] and the number of active endpoints, in activation order:
//! the first endpoint that started streaming is "camera 1", the second is
//! "camera 2".  Signal quality and frame rate play no part.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A rectangular area of the canvas in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// A region covering a whole `width × height` canvas.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Splits the region into left and right halves.
    ///
    /// For odd widths the right half receives the extra column so the two
    /// halves always tile the region exactly.
    pub fn split_vertical(&self) -> (Region, Region) {
        let left_width = self.width / 2;
        let left = Region {
            width: left_width,
            ..*self
        };
        let right = Region {
            x: self.x + left_width,
            width: self.width - left_width,
            ..*self
        };
        (left, right)
    }
}

/// One slot of the layout: the index into the active endpoint list and the
/// canvas region it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index into the activation-ordered list of active endpoints.
    pub source: usize,
    /// Target region on the canvas.
    pub region: Region,
}

/// Rule set deciding which endpoints occupy which regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One endpoint fills the canvas; two or more split it left/right.
    #[default]
    Auto,
    /// Only camera 1, full canvas.
    FirstOnly,
    /// Only camera 2, full canvas.
    SecondOnly,
}

impl LayoutMode {
    /// Returns the next mode in the cycle `Auto → FirstOnly → SecondOnly → Auto`.
    pub fn next(self) -> Self {
        match self {
            LayoutMode::Auto => LayoutMode::FirstOnly,
            LayoutMode::FirstOnly => LayoutMode::SecondOnly,
            LayoutMode::SecondOnly => LayoutMode::Auto,
        }
    }

    /// Human-readable label shown on the control panel.
    pub fn label(self) -> &'static str {
        match self {
            LayoutMode::Auto => "AUTO (Split/Full)",
            LayoutMode::FirstOnly => "CAM 1 ONLY",
            LayoutMode::SecondOnly => "CAM 2 ONLY",
        }
    }

    /// Computes the placements for `active_count` endpoints on a canvas of
    /// `width × height`.
    ///
    /// Endpoints beyond the second are never placed.  An empty result means
    /// the canvas stays black (no endpoints, or the endpoint requested by
    /// `FirstOnly` / `SecondOnly` does not exist).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use camlink_core::LayoutMode;
    ///
    /// let placements = LayoutMode::Auto.regions(3, 1920, 1080);
    /// assert_eq!(placements.len(), 2);
    /// assert_eq!(placements[1].region.x, 960);
    /// ```
    pub fn regions(self, active_count: usize, width: u32, height: u32) -> Vec<Placement> {
        let full = Region::full(width, height);
        match self {
            LayoutMode::Auto => match active_count {
                0 => Vec::new(),
                1 => vec![Placement {
                    source: 0,
                    region: full,
                }],
                _ => {
                    let (left, right) = full.split_vertical();
                    vec![
                        Placement {
                            source: 0,
                            region: left,
                        },
                        Placement {
                            source: 1,
                            region: right,
                        },
                    ]
                }
            },
            LayoutMode::FirstOnly if active_count > 0 => vec![Placement {
                source: 0,
                region: full,
            }],
            LayoutMode::SecondOnly if active_count > 1 => vec![Placement {
                source: 1,
                region: full,
            }],
            LayoutMode::FirstOnly | LayoutMode::SecondOnly => Vec::new(),
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
