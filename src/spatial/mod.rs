// Spatial transform module
//
// Converts listener and emitter world-space transforms into the
// listener-relative azimuth/elevation/distance/gain the panner consumes.

mod panner;
mod transform;

// Public API
pub use panner::{Panner, PannerInput};
pub use transform::{ListenerBasis, SphericalPosition, spatialize, wrap_azimuth};
