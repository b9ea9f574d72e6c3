//! Multi-axis Bresenham event tracer.
//!
//! One "event" is one increment of the dominant axis; each other axis gets a
//! pulse whenever its accumulator crosses zero. Accumulators start at
//! `-(step_event_count / 2)` so pulses land centered within the block.

use crate::planner::{Axis, Block, NUM_AXES};

/// Pulses produced by one tick.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TickBurst {
    /// Step pulses per axis.
    pub pulses: [u8; NUM_AXES],
    /// Signed E-axis events routed to the advance drain instead of the sink.
    pub e_events: i8,
}

/// Bresenham state for the block in flight.
#[derive(Debug, Default)]
pub(crate) struct EventTracer {
    counters: [i32; NUM_AXES],
    events_completed: u32,
    shift: u8,
}

impl EventTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a newly claimed block. `shift` is the event multiplier of the
    /// entry rate.
    pub fn reset(&mut self, block: &Block, shift: u8) {
        let half = (block.step_event_count >> 1) as i32;
        self.counters = [-half; NUM_AXES];
        self.events_completed = 0;
        self.shift = shift;
    }

    /// Event multiplier for the next tick, as decided by the trapezoid
    /// phase evaluation.
    #[inline]
    pub fn set_shift(&mut self, shift: u8) {
        self.shift = shift;
    }

    /// Events executed so far in this block. Monotone non-decreasing.
    #[inline]
    pub fn events_completed(&self) -> u32 {
        self.events_completed
    }

    /// Whether the block has run (or been forced) to completion.
    #[inline]
    pub fn is_complete(&self, block: &Block) -> bool {
        self.events_completed >= block.step_event_count
    }

    /// Force-complete the block (endstop hit).
    #[inline]
    pub fn force_complete(&mut self, block: &Block) {
        self.events_completed = block.step_event_count;
    }

    /// Execute this tick's events.
    ///
    /// With `advance_active`, E-axis triggers are reported as signed counts
    /// in [`TickBurst::e_events`] for the secondary drain instead of step
    /// pulses.
    pub fn trace(&mut self, block: &Block, advance_active: bool) -> TickBurst {
        // Shrink the burst so it cannot overrun the block.
        while self.shift > 0
            && self.events_completed + (1 << self.shift) > block.step_event_count
        {
            self.shift -= 1;
        }

        let mut burst = TickBurst::default();
        for _ in 0..(1u32 << self.shift) {
            for axis in Axis::ALL {
                let i = axis.index();
                self.counters[i] += block.steps[i] as i32;
                if self.counters[i] > 0 {
                    self.counters[i] -= block.step_event_count as i32;
                    if advance_active && axis == Axis::E {
                        burst.e_events += block.direction_bits.sign(axis) as i8;
                    } else {
                        burst.pulses[i] += 1;
                    }
                }
            }
            self.events_completed += 1;
            if self.events_completed >= block.step_event_count {
                break;
            }
        }
        burst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DirectionBits;

    fn block(steps: [u32; NUM_AXES]) -> Block {
        Block {
            steps,
            step_event_count: steps.iter().copied().max().unwrap(),
            ..Default::default()
        }
    }

    fn run_to_completion(block: &Block, shift: u8) -> [u32; NUM_AXES] {
        let mut tracer = EventTracer::new();
        tracer.reset(block, shift);
        let mut totals = [0u32; NUM_AXES];
        while !tracer.is_complete(block) {
            let burst = tracer.trace(block, false);
            for i in 0..NUM_AXES {
                totals[i] += burst.pulses[i] as u32;
            }
        }
        totals
    }

    #[test]
    fn every_axis_gets_exactly_its_steps() {
        for steps in [
            [100, 0, 0, 0],
            [100, 100, 0, 0],
            [100, 63, 1, 7],
            [5, 3, 2, 1],
            [1000, 999, 500, 333],
        ] {
            assert_eq!(run_to_completion(&block(steps), 0), steps);
        }
    }

    #[test]
    fn distribution_survives_event_multipliers() {
        let b = block([1000, 750, 0, 250]);
        for shift in [0, 1, 2] {
            assert_eq!(run_to_completion(&b, shift), b.steps);
        }
    }

    #[test]
    fn multiplier_shrinks_near_block_end() {
        // 10 events with a 4x multiplier: the last burst must not overrun.
        let b = block([10, 0, 0, 0]);
        let mut tracer = EventTracer::new();
        tracer.reset(&b, 2);
        let mut total = 0u32;
        while !tracer.is_complete(&b) {
            let burst = tracer.trace(&b, false);
            total += burst.pulses[0] as u32;
        }
        assert_eq!(total, 10);
        assert_eq!(tracer.events_completed(), 10);
    }

    #[test]
    fn diagonal_pulses_both_axes_every_event() {
        let b = block([50, 50, 0, 0]);
        let mut tracer = EventTracer::new();
        tracer.reset(&b, 0);
        while !tracer.is_complete(&b) {
            let burst = tracer.trace(&b, false);
            assert_eq!(burst.pulses[0], burst.pulses[1]);
        }
    }

    #[test]
    fn advance_routes_e_to_signed_events() {
        let mut b = block([100, 0, 0, 100]);
        b.direction_bits = DirectionBits::POSITIVE.with_negative(Axis::E);
        let mut tracer = EventTracer::new();
        tracer.reset(&b, 0);
        let mut e_total = 0i32;
        while !tracer.is_complete(&b) {
            let burst = tracer.trace(&b, true);
            assert_eq!(burst.pulses[Axis::E.index()], 0);
            e_total += burst.e_events as i32;
        }
        assert_eq!(e_total, -100);
    }

    #[test]
    fn events_completed_is_monotone() {
        let b = block([37, 12, 0, 0]);
        let mut tracer = EventTracer::new();
        tracer.reset(&b, 1);
        let mut last = 0;
        while !tracer.is_complete(&b) {
            tracer.trace(&b, false);
            assert!(tracer.events_completed() >= last);
            last = tracer.events_completed();
        }
        assert_eq!(last, 37);
    }
}
