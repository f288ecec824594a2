//! Fixed-capacity slot bitmap.

/// A bitmap of `capacity` slots packed into `ceil(capacity / 8)` bytes.
///
/// Bit `i` is set while slot `i` is allocated. Storage is allocated once in
/// [`SlotBitmap::new`] and never resized. The bitmap only does index bookkeeping;
/// whoever owns it maps indices to objects and must free each index exactly once.
#[derive(Debug, Clone)]
pub struct SlotBitmap {
    bytes: Box<[u8]>,
    capacity: usize,
}

impl SlotBitmap {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity.div_ceil(8)].into_boxed_slice(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.capacity, "slot {} out of range", index);
        self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.capacity, "slot {} out of range", index);
        let mask = 1u8 << (index % 8);
        let byte = &mut self.bytes[index / 8];
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Index of the lowest unset bit, or `capacity` if every slot is in use.
    ///
    /// Bits past `capacity` in the last byte are padding and are never returned.
    pub fn first_unset(&self) -> usize {
        for (i, &byte) in self.bytes.iter().enumerate() {
            if byte == u8::MAX {
                continue;
            }
            let index = i * 8 + (!byte).trailing_zeros() as usize;
            return index.min(self.capacity);
        }
        self.capacity
    }

    /// Claims the lowest free slot. Returns `capacity` when exhausted; callers
    /// must treat that value as an allocation failure.
    pub fn allocate(&mut self) -> usize {
        let index = self.first_unset();
        if index < self.capacity {
            self.set(index, true);
        }
        index
    }

    pub fn free(&mut self, index: usize) {
        debug_assert!(self.get(index), "slot {} freed while not allocated", index);
        self.set(index, false);
    }

    /// Number of allocated slots.
    pub fn count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_full(&self) -> bool {
        self.first_unset() >= self.capacity
    }
}
