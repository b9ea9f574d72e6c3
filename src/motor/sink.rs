//! Step sink abstraction.
//!
//! The core talks to stepper hardware through [`StepSink`] only. The provided
//! [`MachineSink`] routes each axis to a pulse or command channel, handles
//! secondary drivers (mirrored gantries, dual X carriages) and selects the
//! active extruder channel behind the logical E axis.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::DualMode;
use crate::error::{ConfigError, Error, Result};
use crate::planner::{Axis, Direction, MAX_EXTRUDERS};

use super::gpio::PulseChannel;
use super::smart::{CommandChannel, SmartDriver};

/// Downstream contract of the core.
///
/// One call to [`step`] with count `n` must always produce the same physical
/// microstep count per axis, regardless of backend.
///
/// [`step`]: StepSink::step
pub trait StepSink {
    /// Apply the travel direction for an axis. Idempotent; re-applied every
    /// tick.
    fn set_direction(&mut self, axis: Axis, dir: Direction);

    /// Emit `count` step events on an axis, as pulses or one burst command.
    fn step(&mut self, axis: Axis, count: u8);

    /// Whether the axis backend is still executing a command.
    fn busy(&mut self, axis: Axis) -> bool {
        let _ = axis;
        false
    }

    /// Select which extruder channel receives E-axis traffic.
    fn set_active_extruder(&mut self, extruder: u8) {
        let _ = extruder;
    }

    /// Drive both carriages of a dual-carriage axis with identical signals.
    fn set_duplication(&mut self, enabled: bool) {
        let _ = enabled;
    }

    /// Power up an axis driver.
    fn enable(&mut self, axis: Axis) {
        let _ = axis;
    }

    /// Power down an axis driver.
    fn disable(&mut self, axis: Axis) {
        let _ = axis;
    }
}

/// Backend driving one axis.
pub enum AxisChannel<P: OutputPin, D: SmartDriver> {
    /// STEP/DIR pin toggling.
    Pulse(PulseChannel<P>),
    /// Command-driven smart driver.
    Command(CommandChannel<D>),
}

impl<P: OutputPin, D: SmartDriver> AxisChannel<P, D> {
    fn set_direction(&mut self, dir: Direction) {
        match self {
            AxisChannel::Pulse(ch) => ch.set_direction(dir),
            AxisChannel::Command(ch) => ch.set_direction(dir),
        }
    }

    fn step<DL: DelayNs>(&mut self, delay: &mut DL, width_ns: u32, count: u8) {
        match self {
            AxisChannel::Pulse(ch) => ch.pulse(delay, width_ns, count),
            AxisChannel::Command(ch) => ch.step(count),
        }
    }

    fn busy(&mut self) -> bool {
        match self {
            AxisChannel::Pulse(_) => false,
            AxisChannel::Command(ch) => ch.busy(),
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        match self {
            AxisChannel::Pulse(ch) => ch.set_enabled(enabled),
            AxisChannel::Command(_) => {}
        }
    }
}

struct AxisSlot<P: OutputPin, D: SmartDriver> {
    primary: AxisChannel<P, D>,
    secondary: Option<(PulseChannel<P>, DualMode)>,
}

/// Default step pulse width, matching common driver datasheet minimums with
/// margin.
const DEFAULT_PULSE_WIDTH_NS: u32 = 2_000;

/// Complete sink for an X/Y/Z gantry plus up to three extruder channels.
pub struct MachineSink<P: OutputPin, D: SmartDriver, DL: DelayNs> {
    axes: [AxisSlot<P, D>; 3],
    extruders: heapless::Vec<AxisChannel<P, D>, MAX_EXTRUDERS>,
    active_extruder: u8,
    duplication: bool,
    pulse_width_ns: u32,
    delay: DL,
}

impl<P: OutputPin, D: SmartDriver, DL: DelayNs> MachineSink<P, D, DL> {
    /// Assemble a sink from the three gantry channels. Extruder channels are
    /// added with [`add_extruder`]; secondary drivers with [`set_secondary`].
    ///
    /// [`add_extruder`]: MachineSink::add_extruder
    /// [`set_secondary`]: MachineSink::set_secondary
    pub fn new(
        x: AxisChannel<P, D>,
        y: AxisChannel<P, D>,
        z: AxisChannel<P, D>,
        delay: DL,
    ) -> Self {
        Self {
            axes: [
                AxisSlot {
                    primary: x,
                    secondary: None,
                },
                AxisSlot {
                    primary: y,
                    secondary: None,
                },
                AxisSlot {
                    primary: z,
                    secondary: None,
                },
            ],
            extruders: heapless::Vec::new(),
            active_extruder: 0,
            duplication: false,
            pulse_width_ns: DEFAULT_PULSE_WIDTH_NS,
            delay,
        }
    }

    /// Override the step pulse active time.
    pub fn with_pulse_width_ns(mut self, width: u32) -> Self {
        self.pulse_width_ns = width;
        self
    }

    /// Append an extruder channel behind the E axis.
    pub fn add_extruder(&mut self, channel: AxisChannel<P, D>) -> Result<()> {
        self.extruders.push(channel).map_err(|_| {
            Error::Config(ConfigError::InvalidExtruderCount(
                MAX_EXTRUDERS as u8 + 1,
            ))
        })?;
        Ok(())
    }

    /// Attach a secondary pulse driver to a gantry axis.
    pub fn set_secondary(
        &mut self,
        axis: Axis,
        channel: PulseChannel<P>,
        mode: DualMode,
    ) -> Result<()> {
        if axis == Axis::E {
            return Err(Error::Config(ConfigError::InvalidDualDriver(axis)));
        }
        self.axes[axis.index()].secondary = Some((channel, mode));
        Ok(())
    }

    fn e_channel(&mut self) -> Option<&mut AxisChannel<P, D>> {
        self.extruders.get_mut(self.active_extruder as usize)
    }
}

impl<P: OutputPin, D: SmartDriver, DL: DelayNs> StepSink for MachineSink<P, D, DL> {
    fn set_direction(&mut self, axis: Axis, dir: Direction) {
        if axis == Axis::E {
            if let Some(ch) = self.e_channel() {
                ch.set_direction(dir);
            }
            return;
        }

        let duplication = self.duplication;
        let active = self.active_extruder;
        let slot = &mut self.axes[axis.index()];
        match &mut slot.secondary {
            Some((second, DualMode::Carriage)) => {
                if duplication {
                    slot.primary.set_direction(dir);
                    second.set_direction(dir);
                } else if active != 0 {
                    second.set_direction(dir);
                } else {
                    slot.primary.set_direction(dir);
                }
            }
            Some((second, DualMode::Mirror)) => {
                slot.primary.set_direction(dir);
                second.set_direction(dir);
            }
            None => slot.primary.set_direction(dir),
        }
    }

    fn step(&mut self, axis: Axis, count: u8) {
        if count == 0 {
            return;
        }
        if axis == Axis::E {
            let width = self.pulse_width_ns;
            let active = self.active_extruder as usize;
            if let Some(ch) = self.extruders.get_mut(active) {
                ch.step(&mut self.delay, width, count);
            }
            return;
        }

        let duplication = self.duplication;
        let active = self.active_extruder;
        let width = self.pulse_width_ns;
        let slot = &mut self.axes[axis.index()];
        match &mut slot.secondary {
            Some((second, DualMode::Carriage)) => {
                if duplication {
                    slot.primary.step(&mut self.delay, width, count);
                    second.pulse(&mut self.delay, width, count);
                } else if active != 0 {
                    second.pulse(&mut self.delay, width, count);
                } else {
                    slot.primary.step(&mut self.delay, width, count);
                }
            }
            Some((second, DualMode::Mirror)) => {
                slot.primary.step(&mut self.delay, width, count);
                second.pulse(&mut self.delay, width, count);
            }
            None => slot.primary.step(&mut self.delay, width, count),
        }
    }

    fn busy(&mut self, axis: Axis) -> bool {
        if axis == Axis::E {
            return self.e_channel().map(AxisChannel::busy).unwrap_or(false);
        }
        self.axes[axis.index()].primary.busy()
    }

    fn set_active_extruder(&mut self, extruder: u8) {
        self.active_extruder = extruder;
    }

    fn set_duplication(&mut self, enabled: bool) {
        self.duplication = enabled;
    }

    fn enable(&mut self, axis: Axis) {
        self.set_axis_enabled(axis, true);
    }

    fn disable(&mut self, axis: Axis) {
        self.set_axis_enabled(axis, false);
    }
}

impl<P: OutputPin, D: SmartDriver, DL: DelayNs> MachineSink<P, D, DL> {
    fn set_axis_enabled(&mut self, axis: Axis, enabled: bool) {
        if axis == Axis::E {
            for ch in &mut self.extruders {
                ch.set_enabled(enabled);
            }
            return;
        }
        let slot = &mut self.axes[axis.index()];
        slot.primary.set_enabled(enabled);
        if let Some((second, _)) = &mut slot.secondary {
            second.set_enabled(enabled);
        }
    }
}
