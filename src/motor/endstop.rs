//! Endstop sampling, debounce and latching.
//!
//! Sampled once per tick before stepping, only for the switch the current
//! travel direction could hit. A hit needs two consecutive asserted reads;
//! a confirmed hit latches the position and force-completes the block.

use crate::config::{CoreConfig, DualMode, Kinematics};
use crate::planner::{Axis, Block};

use super::position::PositionCounters;

/// Which end of travel a switch sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndstopSide {
    /// Negative end of travel.
    Min,
    /// Positive end of travel.
    Max,
}

/// Raw limit-switch inputs. Implementations return the electrical level; the
/// monitor applies the configured polarity. Pull-up configuration happens at
/// board init from [`SwitchConfig::pullup`](crate::config::SwitchConfig).
pub trait EndstopPort {
    /// Read the input for `axis`/`side`.
    fn read(&mut self, axis: Axis, side: EndstopSide) -> bool;
}

/// Foreground report of latched hits, produced by
/// [`MotionCore::check_hit_endstops`](super::MotionCore::check_hit_endstops).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndstopReport {
    /// Trigger position in configured units for X, Y, Z where hit.
    pub triggers: [Option<f32>; 3],
    /// The abort-on-hit policy fired: the queue was drained.
    pub aborted: bool,
}

/// Per-axis latched state plus the one-tick debounce history.
#[derive(Debug)]
pub(crate) struct EndstopMonitor {
    prev: [[bool; 2]; 3],
    hit: [bool; 3],
    trigsteps: [i32; 3],
    enabled: bool,
}

impl EndstopMonitor {
    /// Checking starts enabled; homing disables it afterwards.
    pub fn new() -> Self {
        Self {
            prev: [[false; 2]; 3],
            hit: [false; 3],
            trigsteps: [0; 3],
            enabled: true,
        }
    }

    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[inline]
    pub fn any_hit(&self) -> bool {
        self.hit.iter().any(|&h| h)
    }

    #[inline]
    pub fn hit(&self, axis: Axis) -> bool {
        self.hit[axis.index()]
    }

    #[inline]
    pub fn trigger_steps(&self, axis: Axis) -> i32 {
        self.trigsteps[axis.index()]
    }

    pub fn clear(&mut self) {
        self.hit = [false; 3];
    }

    /// Sample the switches relevant to the block's travel directions.
    /// Returns true when a confirmed hit must force-complete the block.
    pub fn sample<E: EndstopPort>(
        &mut self,
        port: &mut E,
        config: &CoreConfig,
        block: &Block,
        position: &PositionCounters,
    ) -> bool {
        if !self.enabled {
            return false;
        }

        let mut forced = false;
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let moving_negative = toward_negative(config.kinematics, block, axis);
            let side = if moving_negative {
                EndstopSide::Min
            } else {
                EndstopSide::Max
            };

            let cfg = config.axis(axis);

            // With two X carriages only the active carriage's homing
            // direction arms the check.
            if let Some(dual) = &cfg.dual {
                if dual.mode == DualMode::Carriage {
                    let home_dir = if block.active_extruder == 0 {
                        cfg.home_dir
                    } else {
                        dual.home_dir
                    };
                    let wanted = if moving_negative { -1 } else { 1 };
                    if home_dir != wanted {
                        continue;
                    }
                }
            }

            let switch = match side {
                EndstopSide::Min => &cfg.endstops.min,
                EndstopSide::Max => &cfg.endstops.max,
            };
            let Some(switch) = switch else { continue };

            let asserted = port.read(axis, side) != switch.inverting;
            let i = axis.index();
            let s = side as usize;
            if asserted && self.prev[i][s] && block.steps[i] > 0 {
                self.trigsteps[i] = position.get(axis);
                self.hit[i] = true;
                forced = true;
            }
            self.prev[i][s] = asserted;
        }
        forced
    }
}

/// Endstop-relevant travel direction of an axis.
///
/// Under CoreXY the X and Y carriage directions are combinations of the A/B
/// motor directions carried in the block: -X is commanded by -A-B, -Y by
/// -A+B.
fn toward_negative(kinematics: Kinematics, block: &Block, axis: Axis) -> bool {
    match kinematics {
        Kinematics::Cartesian => block.direction_bits.is_negative(axis),
        Kinematics::CoreXy => {
            let neg_a = block.direction_bits.is_negative(Axis::X);
            let neg_b = block.direction_bits.is_negative(Axis::Y);
            match axis {
                Axis::X => neg_a && neg_b,
                Axis::Y => neg_a && !neg_b,
                _ => block.direction_bits.is_negative(axis),
            }
        }
    }
}
