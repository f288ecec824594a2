use crate::config::PetalSonicWorldDesc;
use crate::distance::{DistanceModel, DistanceParams};
use crate::error::{PetalSonicError, Result};
use crate::listener::PetalSonicAudioListener;
use crate::math::{Orientation, Vec3};
use crate::property::SharedProperty;
use crate::registry::{ObjectHandle, ObjectRegistry};
use crate::renderer::SpatialRenderer;
use crate::source::{AudioObject, ObjectKind, PannedSource, Source3D};
use std::sync::Arc;

/// Main world object that owns the listener and every audio object.
///
/// `PetalSonicWorld` is the control-side API. Any thread may create and destroy
/// objects or update properties; the [`SpatialRenderer`] obtained from
/// [`PetalSonicWorld::create_renderer`] consumes the committed state on the
/// render thread.
///
/// # Architecture
///
/// - **Control threads**: create/destroy objects, set positions and orientations
/// - **Render thread**: receives lifecycle commands via channels, reads property
///   snapshots once per block and publishes per-emitter panning parameters
pub struct PetalSonicWorld {
    desc: PetalSonicWorldDesc,
    registry: ObjectRegistry,
    listener: Arc<PetalSonicAudioListener>,
    default_distance_params: SharedProperty<DistanceParams>,
}

impl PetalSonicWorld {
    pub fn new(desc: PetalSonicWorldDesc) -> Result<Self> {
        desc.validate()?;
        log::info!(
            "Creating world (sample_rate: {} Hz, block_size: {}, max_objects: {})",
            desc.sample_rate,
            desc.block_size,
            desc.max_objects
        );
        Ok(Self {
            registry: ObjectRegistry::new(desc.max_objects),
            listener: Arc::new(PetalSonicAudioListener::default()),
            default_distance_params: SharedProperty::new(desc.default_distance_params),
            desc,
        })
    }

    pub fn desc(&self) -> &PetalSonicWorldDesc {
        &self.desc
    }

    /// Builds the renderer for this world. Only one renderer can exist per world.
    ///
    /// Objects that already exist are handed to it on its first block.
    pub fn create_renderer(
        &self,
        distance_model: Arc<dyn DistanceModel>,
    ) -> Result<SpatialRenderer> {
        let endpoints = self.registry.attach_renderer()?;
        log::info!("Renderer attached to world");
        Ok(SpatialRenderer::new(
            self.listener.clone(),
            distance_model,
            self.desc.max_objects,
            endpoints,
        ))
    }

    /// Creates an object of `kind` and returns its handle.
    ///
    /// New 3D sources start with the world's current default distance parameters.
    pub fn create(&self, kind: ObjectKind) -> Result<ObjectHandle> {
        self.registry
            .create(kind, self.default_distance_params.get())
            .map(|(handle, _)| handle)
    }

    /// Creates a 3D source; see [`PetalSonicWorld::create`].
    pub fn create_source3d(&self) -> Result<(ObjectHandle, Arc<Source3D>)> {
        let (handle, object) = self
            .registry
            .create(ObjectKind::Source3D, self.default_distance_params.get())?;
        match object {
            AudioObject::Source3D(source) => Ok((handle, source)),
            _ => Err(PetalSonicError::HandleType {
                handle,
                expected: ObjectKind::Source3D,
            }),
        }
    }

    pub fn create_panned_source(&self) -> Result<(ObjectHandle, Arc<PannedSource>)> {
        let (handle, object) = self
            .registry
            .create(ObjectKind::PannedSource, self.default_distance_params.get())?;
        match object {
            AudioObject::PannedSource(source) => Ok((handle, source)),
            _ => Err(PetalSonicError::HandleType {
                handle,
                expected: ObjectKind::PannedSource,
            }),
        }
    }

    pub fn destroy(&self, handle: ObjectHandle) -> Result<()> {
        self.registry.destroy(handle)
    }

    pub fn resolve(&self, handle: ObjectHandle) -> Result<AudioObject> {
        self.registry.resolve(handle)
    }

    /// Resolves `handle` and checks it refers to a [`Source3D`].
    pub fn source3d(&self, handle: ObjectHandle) -> Result<Arc<Source3D>> {
        match self.registry.resolve(handle)? {
            AudioObject::Source3D(source) => Ok(source),
            _ => Err(PetalSonicError::HandleType {
                handle,
                expected: ObjectKind::Source3D,
            }),
        }
    }

    /// Resolves `handle` and checks it refers to a [`PannedSource`].
    pub fn panned_source(&self, handle: ObjectHandle) -> Result<Arc<PannedSource>> {
        match self.registry.resolve(handle)? {
            AudioObject::PannedSource(source) => Ok(source),
            _ => Err(PetalSonicError::HandleType {
                handle,
                expected: ObjectKind::PannedSource,
            }),
        }
    }

    /// Allocated object slots, including destroyed objects the renderer has not released yet.
    pub fn object_count(&self) -> usize {
        self.registry.count()
    }

    pub fn live_object_count(&self) -> usize {
        self.registry.live_count()
    }

    /// Frees slots the renderer has released. Also runs on every create/destroy.
    pub fn reclaim(&self) -> usize {
        self.registry.reclaim()
    }

    pub fn listener(&self) -> &PetalSonicAudioListener {
        &self.listener
    }

    pub fn listener_position(&self) -> Vec3 {
        self.listener.position()
    }

    pub fn set_listener_position(&self, position: Vec3) -> Result<()> {
        self.listener.set_position(position)
    }

    pub fn listener_orientation(&self) -> Orientation {
        self.listener.orientation()
    }

    pub fn set_listener_orientation(&self, at: Vec3, up: Vec3) -> Result<()> {
        self.listener.set_orientation_vectors(at, up)
    }

    pub fn default_distance_params(&self) -> DistanceParams {
        self.default_distance_params.get()
    }

    /// Changes the distance parameters given to 3D sources created from now on.
    /// Existing sources keep theirs.
    pub fn set_default_distance_params(&self, params: DistanceParams) -> Result<()> {
        params.validate()?;
        self.default_distance_params.set(params);
        Ok(())
    }
}

impl std::fmt::Debug for PetalSonicWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PetalSonicWorld")
            .field("desc", &self.desc)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(max_objects: usize) -> PetalSonicWorld {
        PetalSonicWorld::new(PetalSonicWorldDesc::default().max_objects(max_objects)).unwrap()
    }

    #[test]
    fn test_invalid_desc_rejected() {
        assert!(PetalSonicWorld::new(PetalSonicWorldDesc::default().block_size(0)).is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let world = world(4);
        let (source_handle, _) = world.create_source3d().unwrap();
        let panned_handle = world.create(ObjectKind::PannedSource).unwrap();

        assert!(world.source3d(source_handle).is_ok());
        assert!(world.panned_source(panned_handle).is_ok());
        assert_eq!(
            world.source3d(panned_handle).unwrap_err(),
            PetalSonicError::HandleType {
                handle: panned_handle,
                expected: ObjectKind::Source3D,
            }
        );
        assert!(matches!(
            world.panned_source(source_handle),
            Err(PetalSonicError::HandleType { .. })
        ));
    }

    #[test]
    fn test_capacity_exceeded_leaves_nothing_registered() {
        let world = world(2);
        world.create_source3d().unwrap();
        world.create_panned_source().unwrap();
        assert!(matches!(
            world.create_source3d(),
            Err(PetalSonicError::CapacityExceeded { capacity: 2 })
        ));
        assert_eq!(world.object_count(), 2);
        assert_eq!(world.live_object_count(), 2);
    }

    #[test]
    fn test_default_distance_params_apply_to_new_sources() {
        let world = world(4);
        let (_, before) = world.create_source3d().unwrap();

        let params = DistanceParams {
            distance_max: 10.0,
            rolloff: 2.0,
            ..Default::default()
        };
        world.set_default_distance_params(params).unwrap();
        let (_, after) = world.create_source3d().unwrap();

        assert_eq!(before.distance_params(), DistanceParams::default());
        assert_eq!(after.distance_params(), params);
    }

    #[test]
    fn test_listener_setters() {
        let world = world(1);
        world.set_listener_position(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(world.listener_position(), Vec3::new(1.0, 2.0, 3.0));
        assert!(world.set_listener_orientation(Vec3::Z, Vec3::Z * 4.0).is_err());
        assert_eq!(world.listener_orientation(), Orientation::default());
    }

    #[test]
    fn test_single_renderer() {
        let world = world(1);
        assert!(world.create_renderer(Arc::new(crate::Unattenuated)).is_ok());
        assert!(world.create_renderer(Arc::new(crate::Unattenuated)).is_err());
    }
}
