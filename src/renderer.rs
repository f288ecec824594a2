//! Render-thread side of the world.
//!
//! [`SpatialRenderer::render_block`] is the per-block entry point. It never
//! allocates, never takes a lock shared with control threads and never fails:
//! lifecycle commands arrive over pre-sized channels, and properties are read
//! through [`CachedProperty`] snapshots that fall back to the last committed
//! value while a write is in flight.

use crate::distance::{DistanceModel, DistanceParams};
use crate::listener::PetalSonicAudioListener;
use crate::math::{Orientation, Vec3};
use crate::property::CachedProperty;
use crate::registry::{ObjectHandle, ReleasedObject, RenderEndpoints};
use crate::source::{AudioObject, PannedDirection, PannedSource, Source3D};
use crate::spatial::{ListenerBasis, Panner, PannerInput, spatialize};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

/// Commands sent from the registry to the renderer.
pub(crate) enum RenderCommand {
    Add(ActiveObject),
    Remove(ObjectHandle),
}

enum ActiveState {
    Source3D {
        source: Arc<Source3D>,
        position: CachedProperty<Vec3>,
        distance_params: CachedProperty<DistanceParams>,
    },
    Panned {
        source: Arc<PannedSource>,
        direction: CachedProperty<PannedDirection>,
    },
}

/// An object as seen by the renderer, with its property snapshots.
pub(crate) struct ActiveObject {
    pub(crate) handle: ObjectHandle,
    state: ActiveState,
}

impl ActiveObject {
    /// Takes the initial snapshots. Runs on the control side.
    pub(crate) fn capture(handle: ObjectHandle, object: &AudioObject) -> Self {
        let state = match object {
            AudioObject::Source3D(source) => ActiveState::Source3D {
                position: CachedProperty::new(source.position_property()),
                distance_params: CachedProperty::new(source.distance_params_property()),
                source: source.clone(),
            },
            AudioObject::PannedSource(source) => ActiveState::Panned {
                direction: CachedProperty::new(source.direction_property()),
                source: source.clone(),
            },
        };
        Self { handle, state }
    }

    pub(crate) fn into_object(self) -> AudioObject {
        match self.state {
            ActiveState::Source3D { source, .. } => AudioObject::Source3D(source),
            ActiveState::Panned { source, .. } => AudioObject::PannedSource(source),
        }
    }

    fn render(&mut self, basis: &ListenerBasis, model: &dyn DistanceModel) -> PannerInput {
        match &mut self.state {
            ActiveState::Source3D {
                source,
                position,
                distance_params,
            } => {
                let position = position.refresh(source.position_property());
                let params = distance_params.refresh(source.distance_params_property());
                let output = spatialize(basis, position, &params, model);
                source.publish(output);
                output
            }
            ActiveState::Panned { source, direction } => {
                let direction = direction.refresh(source.direction_property());
                let output = PannerInput {
                    azimuth: direction.azimuth,
                    elevation: direction.elevation,
                    distance: 0.0,
                    gain: 1.0,
                };
                source.publish(output);
                output
            }
        }
    }
}

/// Advances every registered object once per block.
///
/// Obtained from [`PetalSonicWorld::create_renderer`](crate::PetalSonicWorld::create_renderer)
/// and meant to be owned by the render thread, either directly or through
/// [`PetalSonicEngine`](crate::PetalSonicEngine).
pub struct SpatialRenderer {
    listener: Arc<PetalSonicAudioListener>,
    listener_position: CachedProperty<Vec3>,
    listener_orientation: CachedProperty<Orientation>,
    distance_model: Arc<dyn DistanceModel>,
    commands: Receiver<RenderCommand>,
    released: Sender<ReleasedObject>,
    active: Vec<ActiveObject>,
    /// Objects the registry could no longer take back. Dropped with the renderer.
    retired: Vec<AudioObject>,
    blocks_rendered: u64,
}

impl SpatialRenderer {
    pub(crate) fn new(
        listener: Arc<PetalSonicAudioListener>,
        distance_model: Arc<dyn DistanceModel>,
        capacity: usize,
        endpoints: RenderEndpoints,
    ) -> Self {
        Self {
            listener_position: CachedProperty::new(listener.position_property()),
            listener_orientation: CachedProperty::new(listener.orientation_property()),
            listener,
            distance_model,
            commands: endpoints.commands,
            released: endpoints.released,
            active: Vec::with_capacity(capacity),
            retired: Vec::with_capacity(capacity),
            blocks_rendered: 0,
        }
    }

    /// Applies pending create/destroy commands without blocking.
    fn process_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                RenderCommand::Add(active) => {
                    // The registry never has more live-or-releasing objects than
                    // slots, so this stays within the reserved capacity.
                    debug_assert!(self.active.len() < self.active.capacity());
                    self.active.push(active);
                }
                RenderCommand::Remove(handle) => {
                    if let Some(index) = self.active.iter().position(|a| a.handle == handle) {
                        let active = self.active.swap_remove(index);
                        // Hand the object back so it is dropped on the control side.
                        if let Err(error) = self.released.try_send((handle, active.into_object())) {
                            // Every releasing slot holds one place in the queue, so only
                            // a dropped registry can refuse. None of its slots are reused
                            // after that, which keeps active plus retired within capacity.
                            debug_assert!(error.is_disconnected(), "release queue overflow");
                            debug_assert!(self.retired.len() < self.retired.capacity());
                            let (_, object) = error.into_inner();
                            self.retired.push(object);
                        }
                    }
                }
            }
        }
    }

    /// Runs one block: lifecycle commands, listener snapshot, then every emitter.
    ///
    /// The listener basis is rebuilt from the current orientation each block.
    pub fn render_block(&mut self, panner: &mut dyn Panner) {
        self.process_commands();

        let position = self
            .listener_position
            .refresh(self.listener.position_property());
        let orientation = self
            .listener_orientation
            .refresh(self.listener.orientation_property());
        let basis = ListenerBasis::new(position, &orientation);
        let model = self.distance_model.as_ref();

        panner.begin_block();
        for active in &mut self.active {
            let output = active.render(&basis, model);
            panner.pan(active.handle, &output);
        }
        panner.end_block();

        self.blocks_rendered += 1;
    }

    /// Objects currently being rendered.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered
    }

    /// Destroyed objects kept alive because their world was dropped first.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }
}
