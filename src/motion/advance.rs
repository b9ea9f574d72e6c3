//! Pressure-advance integrator.
//!
//! Accumulates a Q24.8 advance value alongside the trapezoid ramps and emits
//! the change of its integer part as extra E-axis steps. The steps are queued
//! for the secondary drain timer, never stepped inline.

use crate::planner::Block;

/// Q24.8 advance accumulator. `old_advance` persists across blocks so the
/// handover delta is emitted when a new block loads.
#[derive(Debug, Default)]
pub(crate) struct AdvanceIntegrator {
    advance: u32,
    old_advance: u32,
}

impl AdvanceIntegrator {
    /// Load a block's entry advance. Returns E steps to queue.
    pub fn reset(&mut self, block: &Block) -> i32 {
        self.advance = block.initial_advance;
        self.flush()
    }

    /// Acceleration-phase update, scaled by the event multiplier. Returns E
    /// steps to queue.
    pub fn accelerate(&mut self, block: &Block, shift: u8) -> i32 {
        self.advance = self.advance.saturating_add(block.advance_rate << shift);
        self.flush()
    }

    /// Deceleration-phase update, floored at the block's final advance.
    /// Returns E steps to queue.
    pub fn decelerate(&mut self, block: &Block, shift: u8) -> i32 {
        self.advance = self
            .advance
            .saturating_sub(block.advance_rate << shift)
            .max(block.final_advance);
        self.flush()
    }

    fn flush(&mut self) -> i32 {
        let steps = self.advance >> 8;
        let delta = steps as i32 - self.old_advance as i32;
        self.old_advance = steps;
        delta
    }
}
