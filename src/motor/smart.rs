//! Command-driven smart-driver backend.
//!
//! Instead of toggling a STEP line, these drivers take a direction command
//! and a relative-move command over a bus, and expose a BUSY input. The core
//! waits for BUSY with a bounded spin; an unbounded wait would overrun the
//! tick interval, so a saturated spin proceeds best-effort.

use core::convert::Infallible;

use crate::planner::Direction;

/// Upper bound on BUSY polls before a move is issued anyway.
const BUSY_SPIN_LIMIT: u32 = 100;

/// A stepper driver commanded over a bus rather than pulsed.
pub trait SmartDriver {
    /// Latch the travel direction for subsequent moves.
    fn set_direction(&mut self, dir: Direction);

    /// Issue a relative move of `microsteps` in the latched direction.
    fn relative_move(&mut self, microsteps: u32);

    /// Whether the previous command is still executing.
    fn busy(&mut self) -> bool;
}

/// Placeholder driver for machines without command-driven axes; it cannot be
/// constructed, so the command arm of the channel enum vanishes.
impl SmartDriver for Infallible {
    fn set_direction(&mut self, _dir: Direction) {
        match *self {}
    }

    fn relative_move(&mut self, _microsteps: u32) {
        match *self {}
    }

    fn busy(&mut self) -> bool {
        match *self {}
    }
}

/// One command-driven axis channel.
pub struct CommandChannel<D: SmartDriver> {
    driver: D,
    microsteps_per_event: u16,
    invert_dir: bool,
}

impl<D: SmartDriver> CommandChannel<D> {
    /// Wrap a driver. `microsteps_per_event` fixes the physical microstep
    /// count one Bresenham event corresponds to on this axis.
    pub fn new(driver: D, microsteps_per_event: u16) -> Self {
        Self {
            driver,
            microsteps_per_event,
            invert_dir: false,
        }
    }

    /// Reverse the meaning of the direction command.
    pub fn with_inverted_dir(mut self) -> Self {
        self.invert_dir = true;
        self
    }

    pub(crate) fn set_direction(&mut self, dir: Direction) {
        let dir = if self.invert_dir { dir.reversed() } else { dir };
        self.driver.set_direction(dir);
    }

    /// Issue one burst of `events` Bresenham events as a single move.
    pub(crate) fn step(&mut self, events: u8) {
        let mut spins = 0;
        while spins < BUSY_SPIN_LIMIT && self.driver.busy() {
            spins += 1;
        }
        self.driver
            .relative_move(events as u32 * self.microsteps_per_event as u32);
    }

    pub(crate) fn busy(&mut self) -> bool {
        self.driver.busy()
    }
}
