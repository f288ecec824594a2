//! Cross-thread property cells.
//!
//! Control threads write geometric properties at arbitrary times while the
//! render thread reads them once per block. Values are stored as `f64` lanes
//! behind a sequence counter:
//!
//! - [`SeqCell`] is the single-writer primitive. Readers detect an in-flight or
//!   torn write and retry or give up, they never wait on a lock.
//! - [`SharedProperty`] serialises any number of control-thread writers on a
//!   mutex the render thread never touches.
//! - [`CachedProperty`] is the render-side view: it keeps the last fully
//!   committed value and only replaces it with another fully committed one.

use atomic_float::AtomicF64;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering, fence};

/// Upper bound on lanes per value; cells are sized for this statically.
pub const MAX_LANES: usize = 8;

/// A plain value that can be packed into at most [`MAX_LANES`] doubles.
pub trait PropertyLanes: Copy {
    const LANES: usize;

    fn to_lanes(&self, lanes: &mut [f64; MAX_LANES]);

    /// Rebuilds a value from lanes written by [`PropertyLanes::to_lanes`].
    fn from_lanes(lanes: &[f64; MAX_LANES]) -> Self;
}

impl PropertyLanes for f64 {
    const LANES: usize = 1;

    fn to_lanes(&self, lanes: &mut [f64; MAX_LANES]) {
        lanes[0] = *self;
    }

    fn from_lanes(lanes: &[f64; MAX_LANES]) -> Self {
        lanes[0]
    }
}

impl PropertyLanes for crate::math::Vec3 {
    const LANES: usize = 3;

    fn to_lanes(&self, lanes: &mut [f64; MAX_LANES]) {
        lanes[..3].copy_from_slice(&self.to_array());
    }

    fn from_lanes(lanes: &[f64; MAX_LANES]) -> Self {
        Self::new(lanes[0], lanes[1], lanes[2])
    }
}

impl PropertyLanes for crate::math::Orientation {
    const LANES: usize = 6;

    fn to_lanes(&self, lanes: &mut [f64; MAX_LANES]) {
        lanes[..6].copy_from_slice(&self.as_array());
    }

    fn from_lanes(lanes: &[f64; MAX_LANES]) -> Self {
        // Only validated orientations are ever written.
        Self::from_validated(
            crate::math::Vec3::new(lanes[0], lanes[1], lanes[2]),
            crate::math::Vec3::new(lanes[3], lanes[4], lanes[5]),
        )
    }
}

/// Sequence-locked cell with exactly one writer.
///
/// The sequence counter is odd while a write is in progress. A reader that sees
/// an odd counter, or a counter that changed while it copied the lanes, discards
/// the copy.
pub struct SeqCell<T> {
    sequence: AtomicU64,
    lanes: [AtomicF64; MAX_LANES],
    _marker: PhantomData<T>,
}

impl<T: PropertyLanes> SeqCell<T> {
    pub fn new(value: T) -> Self {
        const { assert!(T::LANES <= MAX_LANES) };
        let mut buf = [0.0; MAX_LANES];
        value.to_lanes(&mut buf);
        Self {
            sequence: AtomicU64::new(0),
            lanes: buf.map(AtomicF64::new),
            _marker: PhantomData,
        }
    }

    /// Commits `value`. Callers must guarantee there is only one writer at a time.
    pub(crate) fn write(&self, value: T) {
        let mut buf = [0.0; MAX_LANES];
        value.to_lanes(&mut buf);

        let seq = self.sequence.load(Ordering::Relaxed);
        self.sequence.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        for (lane, value) in self.lanes.iter().zip(buf.iter()).take(T::LANES) {
            lane.store(*value, Ordering::Relaxed);
        }
        self.sequence.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Single non-blocking read attempt. `None` if a write overlapped it.
    pub fn try_read(&self) -> Option<T> {
        let before = self.sequence.load(Ordering::Acquire);
        if before & 1 == 1 {
            return None;
        }
        let mut buf = [0.0; MAX_LANES];
        for (value, lane) in buf.iter_mut().zip(self.lanes.iter()).take(T::LANES) {
            *value = lane.load(Ordering::Relaxed);
        }
        fence(Ordering::Acquire);
        let after = self.sequence.load(Ordering::Relaxed);
        (before == after).then(|| T::from_lanes(&buf))
    }

    /// Spins until a consistent value is read. Control side only.
    pub fn read(&self) -> T {
        loop {
            if let Some(value) = self.try_read() {
                return value;
            }
            std::hint::spin_loop();
        }
    }

    /// Number of completed writes.
    pub fn version(&self) -> u64 {
        self.sequence.load(Ordering::Acquire) / 2
    }
}

impl<T: PropertyLanes + std::fmt::Debug> std::fmt::Debug for SeqCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeqCell")
            .field("value", &self.try_read())
            .field("version", &self.version())
            .finish()
    }
}

/// A property written from any number of control threads.
pub struct SharedProperty<T> {
    cell: SeqCell<T>,
    writer: Mutex<()>,
}

impl<T: PropertyLanes> SharedProperty<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: SeqCell::new(value),
            writer: Mutex::new(()),
        }
    }

    pub fn get(&self) -> T {
        self.cell.read()
    }

    /// Commits an already-validated value.
    pub fn set(&self, value: T) {
        let _guard = self.writer.lock();
        self.cell.write(value);
    }

    /// Read attempt that never waits; used by the render thread.
    pub fn try_get(&self) -> Option<T> {
        self.cell.try_read()
    }

    pub fn version(&self) -> u64 {
        self.cell.version()
    }
}

impl<T: PropertyLanes + std::fmt::Debug> std::fmt::Debug for SharedProperty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.cell.fmt(f)
    }
}

/// Render-side snapshot of a [`SharedProperty`].
#[derive(Debug, Clone, Copy)]
pub struct CachedProperty<T> {
    value: T,
}

impl<T: PropertyLanes> CachedProperty<T> {
    /// Takes a first snapshot. May spin briefly, so call it off the render path.
    pub fn new(property: &SharedProperty<T>) -> Self {
        Self {
            value: property.get(),
        }
    }

    /// Picks up the latest committed value, or keeps the previous one if a write
    /// is in flight.
    pub fn refresh(&mut self, property: &SharedProperty<T>) -> T {
        if let Some(value) = property.try_get() {
            self.value = value;
        }
        self.value
    }

    pub fn value(&self) -> T {
        self.value
    }
}
