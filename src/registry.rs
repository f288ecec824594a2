//! Handle registry.
//!
//! Maps small integer handles to live audio objects. Slots come from a
//! [`SlotBitmap`]; the registry owns the index-to-object table and the handoff
//! with the renderer that decides when a destroyed object's slot may be reused.

use crate::bitset::SlotBitmap;
use crate::distance::DistanceParams;
use crate::error::{PetalSonicError, Result};
use crate::renderer::{ActiveObject, RenderCommand};
use crate::source::{AudioObject, ObjectKind};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use parking_lot::Mutex;

/// Lightweight handle for audio objects.
///
/// A handle is the object's slot index. It is valid while the object is alive
/// and is reused once the object has been destroyed and released by the
/// renderer. Holding a handle never keeps an object alive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectHandle({})", self.0)
    }
}

/// An object the renderer no longer references, handed back for its slot to be freed.
pub(crate) type ReleasedObject = (ObjectHandle, AudioObject);

/// Render-side ends of the registry's channels.
pub(crate) struct RenderEndpoints {
    pub commands: Receiver<RenderCommand>,
    pub released: Sender<ReleasedObject>,
}

#[derive(Debug)]
enum Slot {
    Vacant,
    Live(AudioObject),
    /// Destroyed, but the renderer may still be using it.
    Releasing,
}

struct RenderLink {
    commands: Sender<RenderCommand>,
    released: Receiver<ReleasedObject>,
}

struct RegistryState {
    bitmap: SlotBitmap,
    slots: Vec<Slot>,
    link: Option<RenderLink>,
}

impl RegistryState {
    fn free_slot(&mut self, index: usize) {
        self.slots[index] = Slot::Vacant;
        self.bitmap.free(index);
    }

    /// Frees the slots of every object the renderer has handed back.
    fn reclaim(&mut self) -> usize {
        let mut reclaimed = 0;
        loop {
            let Some(link) = &self.link else {
                return reclaimed;
            };
            match link.released.try_recv() {
                Ok((handle, object)) => {
                    log::debug!("Reclaimed slot for {} ({:?})", handle, object.kind());
                    self.free_slot(handle.index());
                    reclaimed += 1;
                }
                Err(TryRecvError::Empty) => return reclaimed,
                Err(TryRecvError::Disconnected) => return reclaimed + self.detach(),
            }
        }
    }

    /// Drops the renderer link and frees every slot that was waiting on it.
    fn detach(&mut self) -> usize {
        log::warn!("Renderer disconnected, releasing pending slots");
        self.link = None;
        let mut freed = 0;
        for index in 0..self.slots.len() {
            if matches!(self.slots[index], Slot::Releasing) {
                self.free_slot(index);
                freed += 1;
            }
        }
        freed
    }
}

/// Fixed-capacity table of audio objects addressed by [`ObjectHandle`].
///
/// All operations run on control threads behind one mutex, which the render
/// thread never takes.
pub struct ObjectRegistry {
    state: Mutex<RegistryState>,
    capacity: usize,
}

impl ObjectRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                bitmap: SlotBitmap::new(capacity),
                slots: (0..capacity).map(|_| Slot::Vacant).collect(),
                link: None,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates an object in the lowest free slot.
    ///
    /// # Errors
    ///
    /// [`PetalSonicError::CapacityExceeded`] when every slot is in use (slots of
    /// destroyed objects count until the renderer releases them). Nothing is
    /// registered on failure.
    pub fn create(
        &self,
        kind: ObjectKind,
        distance_params: DistanceParams,
    ) -> Result<(ObjectHandle, AudioObject)> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.reclaim();

        let index = state.bitmap.allocate();
        if index >= self.capacity {
            log::warn!("Cannot create {:?}: all {} slots in use", kind, self.capacity);
            return Err(PetalSonicError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let handle = ObjectHandle(index as u32);
        let object = AudioObject::new(kind, distance_params);

        if let Some(link) = &state.link {
            match link
                .commands
                .try_send(RenderCommand::Add(ActiveObject::capture(handle, &object)))
            {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    state.bitmap.free(index);
                    return Err(PetalSonicError::Engine(
                        "render command queue is full".into(),
                    ));
                }
                Err(TrySendError::Disconnected(_)) => {
                    state.detach();
                }
            }
        }

        state.slots[index] = Slot::Live(object.clone());
        log::debug!("Created {:?} as {}", kind, handle);
        Ok((handle, object))
    }

    /// Destroys the object behind `handle`.
    ///
    /// The handle becomes invalid immediately. The slot itself is reused only
    /// after the renderer confirms it no longer references the object.
    pub fn destroy(&self, handle: ObjectHandle) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.reclaim();

        let index = handle.index();
        let Some(slot) = state.slots.get_mut(index) else {
            return Err(PetalSonicError::InvalidHandle(handle));
        };
        let object = match std::mem::replace(slot, Slot::Releasing) {
            Slot::Live(object) => object,
            other => {
                *slot = other;
                return Err(PetalSonicError::InvalidHandle(handle));
            }
        };

        if let Some(link) = &state.link {
            match link.commands.try_send(RenderCommand::Remove(handle)) {
                Ok(()) => {
                    log::debug!("Destroyed {}, waiting for renderer release", handle);
                    return Ok(());
                }
                Err(TrySendError::Full(_)) => {
                    state.slots[index] = Slot::Live(object);
                    return Err(PetalSonicError::Engine(
                        "render command queue is full".into(),
                    ));
                }
                Err(TrySendError::Disconnected(_)) => {
                    // Frees this slot along with any other pending one.
                    state.detach();
                    log::debug!("Destroyed {}", handle);
                    return Ok(());
                }
            }
        }

        state.free_slot(index);
        log::debug!("Destroyed {}", handle);
        Ok(())
    }

    pub fn resolve(&self, handle: ObjectHandle) -> Result<AudioObject> {
        match self.state.lock().slots.get(handle.index()) {
            Some(Slot::Live(object)) => Ok(object.clone()),
            _ => Err(PetalSonicError::InvalidHandle(handle)),
        }
    }

    /// Allocated slots, including those of destroyed objects awaiting release.
    pub fn count(&self) -> usize {
        self.state.lock().bitmap.count()
    }

    /// Objects that can currently be resolved.
    pub fn live_count(&self) -> usize {
        self.state
            .lock()
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }

    /// Frees slots released by the renderer. Returns how many were freed.
    pub fn reclaim(&self) -> usize {
        self.state.lock().reclaim()
    }

    /// Connects a renderer. Every live object is queued for it, and from now on
    /// destroyed slots wait for the renderer's release.
    pub(crate) fn attach_renderer(&self) -> Result<RenderEndpoints> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.link.is_some() {
            return Err(PetalSonicError::Engine(
                "a renderer is already attached to this world".into(),
            ));
        }

        // Each slot has at most one pending Add and one pending Remove.
        let (command_tx, command_rx) = bounded(self.capacity * 2);
        let (released_tx, released_rx) = bounded(self.capacity);

        for (index, slot) in state.slots.iter().enumerate() {
            if let Slot::Live(object) = slot {
                command_tx
                    .try_send(RenderCommand::Add(ActiveObject::capture(
                        ObjectHandle(index as u32),
                        object,
                    )))
                    .map_err(|e| {
                        PetalSonicError::Engine(format!("Failed to queue existing object: {}", e))
                    })?;
            }
        }

        state.link = Some(RenderLink {
            commands: command_tx,
            released: released_rx,
        });

        Ok(RenderEndpoints {
            commands: command_rx,
            released: released_tx,
        })
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("capacity", &self.capacity)
            .field("count", &self.count())
            .finish()
    }
}
