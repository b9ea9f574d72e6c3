//! GPIO pulse backend: STEP/DIR/ENABLE pin toggling.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::AxisConfig;
use crate::planner::Direction;

/// One STEP/DIR driver channel.
///
/// Pin write failures are swallowed: the pulse path runs in tick context,
/// which cannot surface errors (diagnostics travel through shared flags).
/// Real GPIO implementations are infallible anyway.
pub struct PulseChannel<P: OutputPin> {
    step: P,
    dir: P,
    enable: Option<P>,
    invert_step: bool,
    invert_dir: bool,
    enable_active_high: bool,
}

impl<P: OutputPin> PulseChannel<P> {
    /// Create a channel with default polarity (step active-high, enable
    /// active-low).
    pub fn new(step: P, dir: P) -> Self {
        Self {
            step,
            dir,
            enable: None,
            invert_step: false,
            invert_dir: false,
            enable_active_high: false,
        }
    }

    /// Attach a driver-enable pin.
    pub fn with_enable(mut self, pin: P) -> Self {
        self.enable = Some(pin);
        self
    }

    /// Take signal polarities from an axis configuration.
    pub fn with_polarity(mut self, cfg: &AxisConfig) -> Self {
        self.invert_step = cfg.invert_step;
        self.invert_dir = cfg.invert_dir;
        self.enable_active_high = cfg.enable_active_high;
        self
    }

    pub(crate) fn set_direction(&mut self, dir: Direction) {
        let high = (dir == Direction::Positive) != self.invert_dir;
        let _ = if high {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        };
    }

    /// Emit `count` step pulses with `width_ns` active time and the same
    /// settle between pulses of a burst.
    pub(crate) fn pulse<D: DelayNs>(&mut self, delay: &mut D, width_ns: u32, count: u8) {
        for i in 0..count {
            let _ = if self.invert_step {
                self.step.set_low()
            } else {
                self.step.set_high()
            };
            delay.delay_ns(width_ns);
            let _ = if self.invert_step {
                self.step.set_high()
            } else {
                self.step.set_low()
            };
            if i + 1 < count {
                delay.delay_ns(width_ns);
            }
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if let Some(pin) = &mut self.enable {
            let high = enabled == self.enable_active_high;
            let _ = if high { pin.set_high() } else { pin.set_low() };
        }
    }
}
