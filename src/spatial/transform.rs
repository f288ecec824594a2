use crate::distance::{DistanceModel, DistanceParams, sanitize_gain};
use crate::math::{Orientation, Vec3};
use crate::spatial::PannerInput;

/// Listener position plus the orthonormal basis derived from its orientation.
///
/// Rebuilt every block from the listener's current orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerBasis {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

/// Listener-relative direction and range of an emitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalPosition {
    /// Degrees clockwise from forward, in `[0, 360)`
    pub azimuth: f64,
    /// Degrees above the listener's horizontal plane, in `[-90, 90]`
    pub elevation: f64,
    pub distance: f64,
}

impl ListenerBasis {
    pub fn new(position: Vec3, orientation: &Orientation) -> Self {
        let at = orientation.at();
        let forward = at.normalize();
        // Orientation guarantees `at` and `up` are not parallel, so this is non-zero.
        let right = at.cross(orientation.up()).normalize();
        let up = right.cross(forward);
        Self {
            position,
            forward,
            right,
            up,
        }
    }

    /// Projects an emitter position into listener space (+y forward, +x right, +z up)
    /// and converts it to spherical coordinates.
    pub fn locate(&self, emitter: Vec3) -> SphericalPosition {
        let mut relative = emitter - self.position;
        let mut scale = 1.0;
        if !relative.is_finite() {
            // Both ends are finite, so the halved difference is too.
            relative = emitter * 0.5 - self.position * 0.5;
            scale = 2.0;
        }

        let magnitude = relative.abs().max_element();
        if magnitude == 0.0 {
            // Emitter sits at the listener's head: no direction, call it forward.
            return SphericalPosition {
                azimuth: 0.0,
                elevation: 0.0,
                distance: 0.0,
            };
        }

        // Normalise through the largest component so the length cannot overflow.
        let scaled = relative / magnitude;
        let norm = scaled.length();
        let direction = scaled / norm;
        let distance = (magnitude * norm * scale).min(f64::MAX);

        let x = self.right.dot(direction);
        let y = self.forward.dot(direction);
        let z = self.up.dot(direction);

        let azimuth = wrap_azimuth(x.atan2(y).to_degrees());
        let elevation = z
            .atan2((x * x + y * y).sqrt())
            .to_degrees()
            .clamp(-90.0, 90.0);

        SphericalPosition {
            azimuth,
            elevation,
            distance,
        }
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
pub fn wrap_azimuth(degrees: f64) -> f64 {
    // `+ 0.0` turns a negative zero into a positive one.
    let wrapped = (degrees + 360.0).rem_euclid(360.0) + 0.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Per-block parameters for one 3D emitter.
pub fn spatialize(
    basis: &ListenerBasis,
    emitter: Vec3,
    params: &DistanceParams,
    model: &dyn DistanceModel,
) -> PannerInput {
    let located = basis.locate(emitter);
    PannerInput {
        azimuth: located.azimuth,
        elevation: located.elevation,
        distance: located.distance,
        gain: sanitize_gain(model.gain(located.distance, params)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Unattenuated;

    const EPSILON: f64 = 1e-9;

    fn default_basis() -> ListenerBasis {
        ListenerBasis::new(Vec3::ZERO, &Orientation::default())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_default_basis_axes() {
        let basis = default_basis();
        assert_eq!(basis.forward, Vec3::Y);
        assert_eq!(basis.right, Vec3::X);
        assert_eq!(basis.up, Vec3::Z);
    }

    #[test]
    fn test_emitter_to_the_right() {
        let located = default_basis().locate(Vec3::new(1.0, 0.0, 0.0));
        assert_close(located.azimuth, 90.0);
        assert_close(located.elevation, 0.0);
        assert_close(located.distance, 1.0);
    }

    #[test]
    fn test_cardinal_directions() {
        let basis = default_basis();
        assert_close(basis.locate(Vec3::new(0.0, 3.0, 0.0)).azimuth, 0.0);
        assert_close(basis.locate(Vec3::new(0.0, -3.0, 0.0)).azimuth, 180.0);
        assert_close(basis.locate(Vec3::new(-3.0, 0.0, 0.0)).azimuth, 270.0);
        assert_close(basis.locate(Vec3::new(1.0, 1.0, 0.0)).azimuth, 45.0);
    }

    #[test]
    fn test_emitter_directly_above_and_below() {
        let basis = default_basis();

        let above = basis.locate(Vec3::new(0.0, 0.0, 1.0));
        assert_close(above.elevation, 90.0);
        assert!(!above.azimuth.is_nan());
        assert!((0.0..360.0).contains(&above.azimuth));

        let below = basis.locate(Vec3::new(0.0, 0.0, -2.0));
        assert_close(below.elevation, -90.0);
        assert!((0.0..360.0).contains(&below.azimuth));
    }

    #[test]
    fn test_emitter_at_listener_position() {
        let basis = ListenerBasis::new(Vec3::new(2.0, -1.0, 4.0), &Orientation::default());
        let located = basis.locate(Vec3::new(2.0, -1.0, 4.0));
        assert_eq!(located.azimuth, 0.0);
        assert_eq!(located.elevation, 0.0);
        assert_eq!(located.distance, 0.0);
    }

    #[test]
    fn test_rotated_and_translated_listener() {
        // Facing +x with +z up puts -y on the listener's right.
        let orientation = Orientation::new(Vec3::X, Vec3::Z).unwrap();
        let basis = ListenerBasis::new(Vec3::new(5.0, 5.0, 0.0), &orientation);

        let right = basis.locate(Vec3::new(5.0, 4.0, 0.0));
        assert_close(right.azimuth, 90.0);
        assert_close(right.distance, 1.0);

        let ahead = basis.locate(Vec3::new(9.0, 5.0, 0.0));
        assert_close(ahead.azimuth, 0.0);
        assert_close(ahead.distance, 4.0);
    }

    #[test]
    fn test_non_orthogonal_up_is_orthogonalised() {
        let orientation = Orientation::new(Vec3::Y, Vec3::new(0.0, 1.0, 1.0)).unwrap();
        let basis = ListenerBasis::new(Vec3::ZERO, &orientation);
        assert_close(basis.up.dot(basis.forward), 0.0);
        assert_close(basis.up.length(), 1.0);
        assert_close(basis.locate(Vec3::Z).elevation, 90.0);
    }

    #[test]
    fn test_outputs_stay_in_range() {
        let orientation = Orientation::new(Vec3::new(0.3, 0.8, -0.2), Vec3::new(0.1, 0.0, 1.0)).unwrap();
        let basis = ListenerBasis::new(Vec3::new(0.5, -0.25, 1.0), &orientation);
        for xi in -4..=4 {
            for yi in -4..=4 {
                for zi in -4..=4 {
                    let emitter = Vec3::new(xi as f64 * 0.75, yi as f64 * 1.5, zi as f64 * 0.5);
                    let located = basis.locate(emitter);
                    assert!((0.0..360.0).contains(&located.azimuth), "{:?}", located);
                    assert!((-90.0..=90.0).contains(&located.elevation), "{:?}", located);
                    assert!(located.distance >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_far_apart_positions_stay_finite() {
        let basis = ListenerBasis::new(Vec3::new(-1e308, 0.0, 0.0), &Orientation::default());
        let located = basis.locate(Vec3::new(1e308, 0.0, 0.0));
        assert_close(located.azimuth, 90.0);
        assert_close(located.elevation, 0.0);
        assert_eq!(located.distance, f64::MAX);

        // The difference is representable but its squared length is not.
        let located = default_basis().locate(Vec3::new(0.0, 1e200, 1e200));
        assert_close(located.azimuth, 0.0);
        assert_close(located.elevation, 45.0);
        assert!(located.distance.is_finite());
        assert!((located.distance / 1e200 - 2f64.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn test_wrap_azimuth() {
        assert_eq!(wrap_azimuth(-90.0), 270.0);
        assert_eq!(wrap_azimuth(180.0), 180.0);
        assert_eq!(wrap_azimuth(-180.0), 180.0);
        assert_eq!(wrap_azimuth(360.0), 0.0);
        assert_eq!(wrap_azimuth(-0.0).to_bits(), 0.0f64.to_bits());
        assert!(wrap_azimuth(-1e-14) < 360.0);
        assert!(wrap_azimuth(-1e-300) < 360.0);
    }

    #[test]
    fn test_spatialize_uses_distance_model() {
        let model = |distance: f64, params: &DistanceParams| params.distance_ref / distance;
        let params = DistanceParams {
            distance_ref: 2.0,
            ..Default::default()
        };
        let input = spatialize(&default_basis(), Vec3::new(0.0, 4.0, 0.0), &params, &model);
        assert_close(input.azimuth, 0.0);
        assert_close(input.distance, 4.0);
        assert_close(input.gain, 0.5);

        let negative = |_: f64, _: &DistanceParams| -3.0;
        let input = spatialize(&default_basis(), Vec3::Y, &params, &negative);
        assert_eq!(input.gain, 0.0);

        let input = spatialize(&default_basis(), Vec3::Y, &params, &Unattenuated);
        assert_eq!(input.gain, 1.0);
    }
}
