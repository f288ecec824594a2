//! Audio objects that feed the panner.
//!
//! - [`Source3D`]: an emitter with a world-space position and orientation,
//!   spatialized against the listener every block
//! - [`PannedSource`]: an emitter whose azimuth/elevation are set directly
//!
//! Both are shared between the control side (property setters) and the render
//! thread (per-block reads and output publication).

use crate::distance::DistanceParams;
use crate::error::{PetalSonicError, Result};
use crate::math::{Orientation, Vec3, validate_position};
use crate::property::{MAX_LANES, PropertyLanes, SeqCell, SharedProperty};
use crate::spatial::PannerInput;
use std::sync::Arc;

/// The kinds of object a world can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Source3D,
    PannedSource,
}

/// A registered audio object.
///
/// Cloning is cheap and shares the underlying object.
#[derive(Debug, Clone)]
pub enum AudioObject {
    Source3D(Arc<Source3D>),
    PannedSource(Arc<PannedSource>),
}

impl AudioObject {
    pub(crate) fn new(kind: ObjectKind, distance_params: DistanceParams) -> Self {
        match kind {
            ObjectKind::Source3D => Self::Source3D(Arc::new(Source3D::new(distance_params))),
            ObjectKind::PannedSource => Self::PannedSource(Arc::new(PannedSource::new())),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Source3D(_) => ObjectKind::Source3D,
            Self::PannedSource(_) => ObjectKind::PannedSource,
        }
    }

    pub fn as_source3d(&self) -> Option<&Arc<Source3D>> {
        match self {
            Self::Source3D(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_panned_source(&self) -> Option<&Arc<PannedSource>> {
        match self {
            Self::PannedSource(source) => Some(source),
            _ => None,
        }
    }

    /// Parameters most recently published by the renderer for this object.
    pub fn last_output(&self) -> PannerInput {
        match self {
            Self::Source3D(source) => source.last_output(),
            Self::PannedSource(source) => source.last_output(),
        }
    }
}

/// A 3D emitter.
///
/// Until a property is first set, the source sits at the origin with the
/// default orientation. Derived outputs are recomputed by the renderer once per
/// block and can be read back with [`Source3D::last_output`].
#[derive(Debug)]
pub struct Source3D {
    position: SharedProperty<Vec3>,
    orientation: SharedProperty<Orientation>,
    distance_params: SharedProperty<DistanceParams>,
    output: SeqCell<PannerInput>,
}

impl Source3D {
    pub fn new(distance_params: DistanceParams) -> Self {
        Self {
            position: SharedProperty::new(Vec3::ZERO),
            orientation: SharedProperty::new(Orientation::default()),
            distance_params: SharedProperty::new(distance_params),
            output: SeqCell::new(PannerInput::default()),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position.get()
    }

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

    /// Validates an `at`/`up` pair and commits it. On failure the previous
    /// orientation is kept.
    pub fn set_orientation_vectors(&self, at: Vec3, up: Vec3) -> Result<()> {
        self.orientation.set(Orientation::new(at, up)?);
        Ok(())
    }

    pub fn distance_params(&self) -> DistanceParams {
        self.distance_params.get()
    }

    pub fn set_distance_params(&self, params: DistanceParams) -> Result<()> {
        params.validate()?;
        self.distance_params.set(params);
        Ok(())
    }

    pub fn last_output(&self) -> PannerInput {
        self.output.read()
    }

    pub(crate) fn position_property(&self) -> &SharedProperty<Vec3> {
        &self.position
    }

    pub(crate) fn distance_params_property(&self) -> &SharedProperty<DistanceParams> {
        &self.distance_params
    }

    /// Render thread only.
    pub(crate) fn publish(&self, output: PannerInput) {
        self.output.write(output);
    }
}

/// Direction of a [`PannedSource`], in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PannedDirection {
    pub azimuth: f64,
    pub elevation: f64,
}

impl PannedDirection {
    pub fn new(azimuth: f64, elevation: f64) -> Result<Self> {
        if !(0.0..=360.0).contains(&azimuth) {
            return Err(PetalSonicError::Range(format!(
                "azimuth must be in [0, 360], got {}",
                azimuth
            )));
        }
        if !(-90.0..=90.0).contains(&elevation) {
            return Err(PetalSonicError::Range(format!(
                "elevation must be in [-90, 90], got {}",
                elevation
            )));
        }
        Ok(Self { azimuth, elevation })
    }
}

impl PropertyLanes for PannedDirection {
    const LANES: usize = 2;

    fn to_lanes(&self, lanes: &mut [f64; MAX_LANES]) {
        lanes[0] = self.azimuth;
        lanes[1] = self.elevation;
    }

    fn from_lanes(lanes: &[f64; MAX_LANES]) -> Self {
        Self {
            azimuth: lanes[0],
            elevation: lanes[1],
        }
    }
}

/// An emitter positioned by azimuth/elevation instead of world coordinates.
#[derive(Debug)]
pub struct PannedSource {
    direction: SharedProperty<PannedDirection>,
    output: SeqCell<PannerInput>,
}

impl Default for PannedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PannedSource {
    pub fn new() -> Self {
        Self {
            direction: SharedProperty::new(PannedDirection::default()),
            output: SeqCell::new(PannerInput::default()),
        }
    }

    pub fn direction(&self) -> PannedDirection {
        self.direction.get()
    }

    /// Azimuth must lie in `[0, 360]` and elevation in `[-90, 90]`; anything
    /// else (NaN included) is a [`PetalSonicError::Range`] and nothing changes.
    pub fn set_direction(&self, azimuth: f64, elevation: f64) -> Result<()> {
        self.direction.set(PannedDirection::new(azimuth, elevation)?);
        Ok(())
    }

    pub fn last_output(&self) -> PannerInput {
        self.output.read()
    }

    pub(crate) fn direction_property(&self) -> &SharedProperty<PannedDirection> {
        &self.direction
    }

    /// Render thread only.
    pub(crate) fn publish(&self, output: PannerInput) {
        self.output.write(output);
    }
}
