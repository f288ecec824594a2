//! Error types for PetalSonic

use crate::registry::ObjectHandle;
use crate::source::ObjectKind;
use thiserror::Error;

/// Errors reported to control-side callers.
///
/// Every variant is local and recoverable. The render path never produces one:
/// it only reads values that were validated before they were committed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PetalSonicError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Capacity exceeded: all {capacity} object slots are in use")]
    CapacityExceeded { capacity: usize },

    #[error("Invalid handle: {0}")]
    InvalidHandle(ObjectHandle),

    #[error("Handle type mismatch: {handle} is not a {expected:?}")]
    HandleType {
        handle: ObjectHandle,
        expected: ObjectKind,
    },

    #[error("Value out of range: {0}")]
    Range(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, PetalSonicError>;
