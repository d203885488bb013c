//! Arena buffer for objects that span feed calls.
//!
//! Only the bytes of the object currently being accumulated live here.
//! Objects that begin and end inside one chunk never touch the arena.
//!
//! # Memory Management
//!
//! Capacity at least doubles on overflow and is kept across objects, so a
//! long stream of similar-sized objects settles into zero reallocations.
//! When a finished object fills the allocation exactly, the allocation
//! itself is handed to the caller and a fresh one takes its place.

use bytes::Bytes;

use crate::error::SplitError;

/// Default initial capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Growable, exclusively owned byte store for a partial object.
#[derive(Debug)]
pub struct ArenaBuffer {
    data: Vec<u8>,
    /// Capacity used when the allocation is handed out and replaced
    initial_capacity: usize,
}

impl ArenaBuffer {
    /// Create an empty arena. No memory is allocated until the first append.
    pub fn new() -> Self {
        Self::with_capacity_hint(DEFAULT_CAPACITY)
    }

    /// Create an arena that reserves `capacity` bytes on first use.
    pub fn with_capacity_hint(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            initial_capacity: capacity.max(1),
        }
    }

    /// Append bytes, growing geometrically.
    ///
    /// All-or-nothing: on allocation failure the existing content is
    /// untouched and `OutOfMemory` is returned.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), SplitError> {
        let needed = self.data.len() + bytes.len();
        if needed > self.data.capacity() {
            let target = needed
                .max(self.data.capacity().saturating_mul(2))
                .max(self.initial_capacity);
            let additional = target - self.data.len();
            self.data
                .try_reserve_exact(additional)
                .map_err(|_| SplitError::OutOfMemory { requested: additional })?;
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Hand out the byte span `[start, end)` as an independent object.
    ///
    /// When the span covers an allocation that is exactly full, the
    /// allocation moves out without a copy and the arena starts over with a
    /// fresh one. Otherwise the span is copied and the arena is unchanged.
    pub fn take(&mut self, start: usize, end: usize) -> Bytes {
        debug_assert!(start <= end && end <= self.data.len());
        if start == 0 && end == self.data.len() && end == self.data.capacity() {
            let full = std::mem::take(&mut self.data);
            return Bytes::from(full);
        }
        Bytes::copy_from_slice(&self.data[start..end])
    }

    /// Hand out the whole logical content and reset for the next object.
    pub fn take_all(&mut self) -> Bytes {
        let object = self.take(0, self.data.len());
        self.reset();
        object
    }

    /// Logically empty the buffer, keeping its capacity.
    #[inline]
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Release the allocation entirely.
    pub fn release(&mut self) {
        self.data = Vec::new();
    }

    /// Current logical content.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes held.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the arena holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

impl Default for ArenaBuffer {
    fn default() -> Self {
        Self::new()
    }
}
