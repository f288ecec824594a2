//! # PetalSonic Spatial
//!
//! The real-time spatialization core of PetalSonic: stable small-integer
//! handles for audio objects, and the per-block transform that turns listener
//! and emitter poses into the azimuth, elevation, distance and gain a panner
//! consumes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use petalsonic_spatial::*;
//! use std::sync::Arc;
//!
//! let desc = PetalSonicWorldDesc::default();
//! let world = PetalSonicWorld::new(desc.clone())?;
//!
//! // The renderer belongs to the render thread; the engine runs it for us.
//! let renderer = world.create_renderer(Arc::new(Unattenuated))?;
//! let panner = |handle: ObjectHandle, input: &PannerInput| {
//!     // Feed input.azimuth / input.elevation / input.gain to the DSP stage.
//!     let _ = (handle, input);
//! };
//! let mut engine = PetalSonicEngine::new(desc, renderer, panner)?;
//! engine.start()?;
//!
//! // Control side: any thread, any time.
//! let (handle, source) = world.create_source3d()?;
//! source.set_position(Vec3::new(1.0, 0.0, 0.0))?;
//! world.set_listener_orientation(Vec3::Y, Vec3::Z)?;
//!
//! world.destroy(handle)?;
//! engine.stop()?;
//! # Ok::<(), PetalSonicError>(())
//! ```
//!
//! ## Architecture
//!
//! PetalSonic Spatial uses a two-role threading model:
//!
//! 1. **Control threads**: own [`PetalSonicWorld`], create/destroy objects and
//!    write validated properties
//! 2. **Render thread**: owns the [`SpatialRenderer`], reads one committed
//!    snapshot per property per block and calls the [`Panner`]
//!
//! Properties live in sequence-locked cells, so the render thread never blocks
//! on a writer and never observes a half-written vector. Lifecycle changes
//! reach it over pre-sized channels, and a destroyed object's slot is reused
//! only after the renderer hands the object back.
//!
//! Coordinates: `+y` is forward, `+x` right, `+z` up. Azimuth is measured in
//! degrees clockwise from forward.

pub mod bitset;
pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod listener;
pub mod math;
pub mod property;
pub mod registry;
pub mod renderer;
pub mod source;
pub mod spatial;
pub mod world;

pub use bitset::SlotBitmap;
pub use config::PetalSonicWorldDesc;
pub use distance::{DistanceModel, DistanceParams, Unattenuated};
pub use engine::PetalSonicEngine;
pub use error::PetalSonicError;
pub use listener::PetalSonicAudioListener;
pub use math::{Orientation, Vec3};
pub use registry::{ObjectHandle, ObjectRegistry};
pub use renderer::SpatialRenderer;
pub use source::{AudioObject, ObjectKind, PannedDirection, PannedSource, Source3D};
pub use spatial::{Panner, PannerInput};
pub use world::PetalSonicWorld;
