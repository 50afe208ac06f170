//! Fixed-capacity ring cursor shared by the descriptor-set ring and the UBO pool.

/// Cursor over `capacity` slots that wraps back to the start.
///
/// [`RingCursor::advance`] moves first and then reports the slot, so a fresh
/// cursor hands out slot 1 before slot 0. Code that records which physical
/// slot was used for a given frame depends on that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingCursor {
    index: usize,
    capacity: usize,
}

impl RingCursor {
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { index: 0, capacity }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot returned by the last call to [`RingCursor::advance`].
    #[must_use]
    pub const fn current(&self) -> usize {
        self.index
    }

    /// Step to the next slot and return it.
    ///
    /// # Panics
    /// If the cursor has no slots.
    pub fn advance(&mut self) -> usize {
        assert!(self.capacity > 0, "ring cursor advanced with zero capacity");
        self.index = (self.index + 1) % self.capacity;
        self.index
    }
}
