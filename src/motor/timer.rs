//! Hardware-timer bridge.
//!
//! The core drives a periodic compare-match timer: every tick reads the next
//! interval from the core and writes it to the compare register. The trait is
//! the seam to the actual timer peripheral; foreground critical sections mask
//! the compare interrupt through it.

/// Compare value armed while no block is queued (1 kHz at the 2 MHz base).
pub const IDLE_INTERVAL: u16 = 2000;

/// Compare value for the deferred Z enable (~1 ms).
pub(crate) const Z_LATE_DELAY: u16 = 2000;

/// Compare-match step timer.
pub trait StepTimer {
    /// Write the compare register for the next tick.
    fn arm(&mut self, compare: u16);

    /// Unmask the compare interrupt.
    fn enable_interrupt(&mut self);

    /// Mask the compare interrupt.
    fn disable_interrupt(&mut self);
}

/// Scoped interrupt mask. The interrupt is re-enabled on every exit path,
/// including unwinding.
pub(crate) struct InterruptMask<'a, T: StepTimer> {
    timer: &'a mut T,
}

impl<'a, T: StepTimer> InterruptMask<'a, T> {
    pub fn new(timer: &'a mut T) -> Self {
        timer.disable_interrupt();
        Self { timer }
    }
}

impl<T: StepTimer> Drop for InterruptMask<'_, T> {
    fn drop(&mut self) {
        self.timer.enable_interrupt();
    }
}
