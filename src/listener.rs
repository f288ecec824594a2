use crate::error::Result;
use crate::math::{Orientation, Vec3, validate_position};
use crate::property::SharedProperty;

/// Represents the listener (the "ears") in the 3D audio world.
///
/// Owned by [`PetalSonicWorld`](crate::PetalSonicWorld) and shared with the
/// renderer. Setters may be called from any control thread; the renderer picks
/// up the latest committed pose at the start of each block.
#[derive(Debug)]
pub struct PetalSonicAudioListener {
    position: SharedProperty<Vec3>,
    orientation: SharedProperty<Orientation>,
}

impl Default for PetalSonicAudioListener {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Orientation::default())
    }
}

impl PetalSonicAudioListener {
    pub fn new(position: Vec3, orientation: Orientation) -> Self {
        Self {
            position: SharedProperty::new(position),
            orientation: SharedProperty::new(orientation),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position.get()
    }

    /// Sets the listener position. Non-finite coordinates are rejected and the
    /// previous position is kept.
    pub fn set_position(&self, position: Vec3) -> Result<()> {
        self.position.set(validate_position(position)?);
        Ok(())
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation.get()
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        self.orientation.set(orientation);
    }

    /// Validates an `at`/`up` pair and commits it. Parallel or degenerate
    /// vectors leave the previous orientation in place.
    pub fn set_orientation_vectors(&self, at: Vec3, up: Vec3) -> Result<()> {
        self.orientation.set(Orientation::new(at, up)?);
        Ok(())
    }

    pub(crate) fn position_property(&self) -> &SharedProperty<Vec3> {
        &self.position
    }

    pub(crate) fn orientation_property(&self) -> &SharedProperty<Orientation> {
        &self.orientation
    }
}
