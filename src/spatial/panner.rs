use crate::property::{MAX_LANES, PropertyLanes};
use crate::registry::ObjectHandle;

/// Parameters handed to the panning stage for one emitter in one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PannerInput {
    /// Degrees clockwise from the listener's forward axis, in `[0, 360)`
    pub azimuth: f64,
    /// Degrees, in `[-90, 90]`
    pub elevation: f64,
    /// Listener-to-emitter distance, `>= 0`
    pub distance: f64,
    /// Distance-model gain multiplier, `>= 0`
    pub gain: f64,
}

impl Default for PannerInput {
    fn default() -> Self {
        Self {
            azimuth: 0.0,
            elevation: 0.0,
            distance: 0.0,
            gain: 1.0,
        }
    }
}

impl PropertyLanes for PannerInput {
    const LANES: usize = 4;

    fn to_lanes(&self, lanes: &mut [f64; MAX_LANES]) {
        lanes[..4].copy_from_slice(&[self.azimuth, self.elevation, self.distance, self.gain]);
    }

    fn from_lanes(lanes: &[f64; MAX_LANES]) -> Self {
        Self {
            azimuth: lanes[0],
            elevation: lanes[1],
            distance: lanes[2],
            gain: lanes[3],
        }
    }
}

/// Downstream panning/DSP stage fed by the renderer.
///
/// All methods run on the render thread inside the block deadline.
pub trait Panner {
    /// Called once per block before any `pan` call (optional).
    fn begin_block(&mut self) {}

    fn pan(&mut self, handle: ObjectHandle, input: &PannerInput);

    /// Called once per block after every emitter was panned (optional).
    fn end_block(&mut self) {}
}

impl<F> Panner for F
where
    F: FnMut(ObjectHandle, &PannerInput),
{
    fn pan(&mut self, handle: ObjectHandle, input: &PannerInput) {
        self(handle, input)
    }
}
