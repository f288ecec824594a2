//! Math types for PetalSonic
//!
//! World space is right-handed with `+y` forward and `+z` up, and all
//! geometry is double precision.

use crate::error::{PetalSonicError, Result};

pub use glam::DVec3 as Vec3;

/// Normalised cross-product magnitude at or below which two vectors count as parallel.
pub const PARALLEL_EPSILON: f64 = 1e-6;

/// A forward (`at`) and `up` vector pair.
///
/// The pair can only be built through [`Orientation::new`], so a value of this
/// type always describes a usable basis: both vectors are finite, non-zero and
/// not parallel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    at: Vec3,
    up: Vec3,
}

impl Orientation {
    pub fn new(at: Vec3, up: Vec3) -> Result<Self> {
        if !at.is_finite() || !up.is_finite() {
            return Err(PetalSonicError::InvalidParameter(format!(
                "orientation vectors must be finite (at: {}, up: {})",
                at, up
            )));
        }
        let at_len = at.length();
        let up_len = up.length();
        if at_len == 0.0 || up_len == 0.0 {
            return Err(PetalSonicError::InvalidParameter(format!(
                "orientation vectors must be non-zero (at: {}, up: {})",
                at, up
            )));
        }
        if at.cross(up).length() / (at_len * up_len) <= PARALLEL_EPSILON {
            return Err(PetalSonicError::InvalidParameter(format!(
                "orientation vectors must not be parallel (at: {}, up: {})",
                at, up
            )));
        }
        Ok(Self { at, up })
    }

    pub(crate) fn from_validated(at: Vec3, up: Vec3) -> Self {
        Self { at, up }
    }

    pub fn at(&self) -> Vec3 {
        self.at
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Packed as `[at.x, at.y, at.z, up.x, up.y, up.z]`.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.at.x, self.at.y, self.at.z, self.up.x, self.up.y, self.up.z,
        ]
    }

    pub fn from_array(values: [f64; 6]) -> Result<Self> {
        Self::new(
            Vec3::new(values[0], values[1], values[2]),
            Vec3::new(values[3], values[4], values[5]),
        )
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            at: Vec3::Y,
            up: Vec3::Z,
        }
    }
}

/// Rejects positions with NaN or infinite coordinates.
pub fn validate_position(position: Vec3) -> Result<Vec3> {
    if position.is_finite() {
        Ok(position)
    } else {
        Err(PetalSonicError::InvalidParameter(format!(
            "position must be finite, got {}",
            position
        )))
    }
}
