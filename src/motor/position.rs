//! Signed per-axis step counters.
//!
//! Written only from tick context; foreground readers go through the core's
//! interrupt-masked accessors so a read never interleaves with a tick.

use crate::planner::{Axis, NUM_AXES};

/// Absolute position in steps for every axis.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionCounters {
    counts: [i32; NUM_AXES],
}

impl PositionCounters {
    /// All axes at origin.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for an axis.
    #[inline]
    pub fn get(&self, axis: Axis) -> i32 {
        self.counts[axis.index()]
    }

    /// Overwrite one axis.
    #[inline]
    pub fn set(&mut self, axis: Axis, count: i32) {
        self.counts[axis.index()] = count;
    }

    /// Overwrite all axes at once.
    #[inline]
    pub fn set_all(&mut self, counts: [i32; NUM_AXES]) {
        self.counts = counts;
    }

    /// Apply emitted steps: `delta` is the signed step count.
    #[inline]
    pub fn apply(&mut self, axis: Axis, delta: i32) {
        self.counts[axis.index()] += delta;
    }

    /// Copy of all counters.
    #[inline]
    pub fn snapshot(&self) -> [i32; NUM_AXES] {
        self.counts
    }
}
