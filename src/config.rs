//! Configuration for PetalSonic

use crate::distance::DistanceParams;
use crate::error::{PetalSonicError, Result};
use std::time::Duration;

/// Configuration descriptor for a PetalSonic world
#[derive(Debug, Clone)]
pub struct PetalSonicWorldDesc {
    /// Sample rate the render loop is clocked against
    pub sample_rate: u32,
    /// Frames per render block. One block is one pass of the spatial transform
    /// over every registered emitter.
    pub block_size: usize,
    /// Number of object slots, fixed for the lifetime of the world
    pub max_objects: usize,
    /// Distance parameters copied into every newly created 3D source
    pub default_distance_params: DistanceParams,
}

impl Default for PetalSonicWorldDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 256,
            max_objects: 1024,
            default_distance_params: DistanceParams::default(),
        }
    }
}

impl PetalSonicWorldDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn max_objects(mut self, max: usize) -> Self {
        self.max_objects = max;
        self
    }

    pub fn default_distance_params(mut self, params: DistanceParams) -> Self {
        self.default_distance_params = params;
        self
    }

    /// Wall-clock duration of one render block.
    ///
    /// Saturates at [`Duration::MAX`] for descriptors that fail [`validate`](Self::validate).
    pub fn block_period(&self) -> Duration {
        self.try_block_period().unwrap_or(Duration::MAX)
    }

    fn try_block_period(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.block_size as f64 / self.sample_rate as f64).ok()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PetalSonicError::Configuration(
                "sample_rate must be greater than zero".into(),
            ));
        }
        if self.block_size == 0 {
            return Err(PetalSonicError::Configuration(
                "block_size must be greater than zero".into(),
            ));
        }
        if self.try_block_period().is_none() {
            return Err(PetalSonicError::Configuration(format!(
                "block period of {} frames at {} Hz is not representable",
                self.block_size, self.sample_rate
            )));
        }
        if self.max_objects == 0 || self.max_objects > u32::MAX as usize {
            return Err(PetalSonicError::Configuration(format!(
                "max_objects must be in 1..={}, got {}",
                u32::MAX,
                self.max_objects
            )));
        }
        self.default_distance_params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_desc_is_valid() {
        let desc = PetalSonicWorldDesc::default();
        assert!(desc.validate().is_ok());
        assert_eq!(desc.block_period(), Duration::from_secs_f64(256.0 / 48000.0));
    }

    #[test]
    fn test_invalid_desc() {
        assert!(PetalSonicWorldDesc::new().sample_rate(0).validate().is_err());
        assert!(PetalSonicWorldDesc::new().block_size(0).validate().is_err());
        assert!(PetalSonicWorldDesc::new().max_objects(0).validate().is_err());
    }

    #[test]
    fn test_unrepresentable_block_period_rejected() {
        let desc = PetalSonicWorldDesc::new().sample_rate(1).block_size(usize::MAX);
        assert!(matches!(
            desc.validate(),
            Err(PetalSonicError::Configuration(_))
        ));
        assert_eq!(desc.block_period(), Duration::MAX);
    }
}
