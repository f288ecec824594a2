//! Distance model boundary.
//!
//! The attenuation curve itself lives outside this crate. Each 3D source
//! carries a [`DistanceParams`] value that is handed, untouched, to whatever
//! [`DistanceModel`] the renderer was built with.

use crate::error::{PetalSonicError, Result};
use crate::property::{MAX_LANES, PropertyLanes};

/// Per-source parameters forwarded to the distance model.
///
/// Only the model interprets these fields; the core just stores and copies them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceParams {
    pub distance_ref: f64,
    pub distance_max: f64,
    pub rolloff: f64,
    pub closeness_boost: f64,
    pub closeness_boost_distance: f64,
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self {
            distance_ref: 1.0,
            distance_max: 50.0,
            rolloff: 1.0,
            closeness_boost: 0.0,
            closeness_boost_distance: 0.0,
        }
    }
}

impl DistanceParams {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("distance_ref", self.distance_ref),
            ("distance_max", self.distance_max),
            ("rolloff", self.rolloff),
            ("closeness_boost", self.closeness_boost),
            ("closeness_boost_distance", self.closeness_boost_distance),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(PetalSonicError::InvalidParameter(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl PropertyLanes for DistanceParams {
    const LANES: usize = 5;

    fn to_lanes(&self, lanes: &mut [f64; MAX_LANES]) {
        lanes[..5].copy_from_slice(&[
            self.distance_ref,
            self.distance_max,
            self.rolloff,
            self.closeness_boost,
            self.closeness_boost_distance,
        ]);
    }

    fn from_lanes(lanes: &[f64; MAX_LANES]) -> Self {
        Self {
            distance_ref: lanes[0],
            distance_max: lanes[1],
            rolloff: lanes[2],
            closeness_boost: lanes[3],
            closeness_boost_distance: lanes[4],
        }
    }
}

/// Maps a listener-to-emitter distance to a gain multiplier.
///
/// Called on the render thread once per block per 3D source, so implementations
/// must be pure and must not allocate or block.
pub trait DistanceModel: Send + Sync {
    fn gain(&self, distance: f64, params: &DistanceParams) -> f64;
}

impl<F> DistanceModel for F
where
    F: Fn(f64, &DistanceParams) -> f64 + Send + Sync,
{
    fn gain(&self, distance: f64, params: &DistanceParams) -> f64 {
        self(distance, params)
    }
}

/// Model that leaves every source at unity gain.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattenuated;

impl DistanceModel for Unattenuated {
    fn gain(&self, _distance: f64, _params: &DistanceParams) -> f64 {
        1.0
    }
}

/// Clamps a model result into the valid gain domain. NaN and negatives become silence.
pub(crate) fn sanitize_gain(gain: f64) -> f64 {
    if gain.is_nan() { 0.0 } else { gain.max(0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_model() {
        let model = |distance: f64, params: &DistanceParams| params.distance_ref / distance.max(1.0);
        let params = DistanceParams::default();
        assert_eq!(model.gain(4.0, &params), 0.25);
        assert_eq!(Unattenuated.gain(100.0, &params), 1.0);
    }

    #[test]
    fn test_sanitize_gain() {
        assert_eq!(sanitize_gain(0.5), 0.5);
        assert_eq!(sanitize_gain(-1.0), 0.0);
        assert_eq!(sanitize_gain(f64::NAN), 0.0);
        assert_eq!(sanitize_gain(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_params_validation() {
        assert!(DistanceParams::default().validate().is_ok());
        let params = DistanceParams {
            rolloff: f64::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
