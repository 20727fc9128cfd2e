//! Cardinal rotations applied to endpoint frames before placement.

use std::borrow::Cow;
use std::fmt;

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

/// A clockwise rotation by one of the four cardinal angles.
///
/// Rotations form a cyclic group of order four: applying
/// [`Rotation::clockwise`] four times returns the starting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// All rotations in clockwise order starting from 0°.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Returns the rotation angle in degrees.
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Parses a cardinal angle.  Any multiple of 90 is accepted and reduced
    /// modulo 360; other values return `None`.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match (degrees % 360) / 90 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        })
    }

    /// Returns this rotation advanced by a further 90° (mod 360).
    pub fn clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// Returns `true` for 90° and 270°, which swap width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Returns the `(width, height)` of a `width × height` image after this
    /// rotation.
    pub fn rotated_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Rotates `image` clockwise.  `Deg0` borrows the input unchanged.
    pub fn apply(self, image: &RgbImage) -> Cow<'_, RgbImage> {
        match self {
            Rotation::Deg0 => Cow::Borrowed(image),
            Rotation::Deg90 => Cow::Owned(imageops::rotate90(image)),
            Rotation::Deg180 => Cow::Owned(imageops::rotate180(image)),
            Rotation::Deg270 => Cow::Owned(imageops::rotate270(image)),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
