//! System-wide configuration for the motion core.

use serde::Deserialize;

use crate::planner::Axis;

use super::AxisConfig;

/// Hardware timer prescaler. A 16 MHz clock yields a 2 MHz tick base; the
/// speed tables are regenerated from `f_cpu` so other clocks keep working.
pub const TIMER_PRESCALE: u32 = 8;

/// Frame kinematics, as far as the execution core needs to know them.
///
/// CoreXY only changes which endstop a combined A/B direction arms; step
/// distribution itself is per-motor either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Kinematics {
    /// One motor per cartesian axis.
    #[default]
    Cartesian,
    /// A/B mixed gantry: X = A + B, Y = A - B.
    CoreXy,
}

/// Complete configuration of the motion core.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// CPU clock feeding the step timer.
    #[serde(default = "default_f_cpu")]
    pub f_cpu: u32,

    /// Upper clamp on the commanded step rate (Hz).
    #[serde(default = "default_max_step_frequency")]
    pub max_step_frequency: u32,

    /// Frame kinematics.
    #[serde(default)]
    pub kinematics: Kinematics,

    /// Number of extruder channels behind the E axis (1 to 3).
    #[serde(default = "default_extruders")]
    pub extruders: u8,

    /// Enable the pressure-advance integrator and its drain timer.
    #[serde(default)]
    pub advance: bool,

    /// Defer the Z driver enable by ~1 ms after a block with Z motion starts.
    #[serde(default)]
    pub z_late_enable: bool,

    /// Treat a confirmed endstop hit as fatal: drain the queue and report.
    #[serde(default)]
    pub abort_on_endstop_hit: bool,

    /// X axis options.
    pub x: AxisConfig,
    /// Y axis options.
    pub y: AxisConfig,
    /// Z axis options.
    pub z: AxisConfig,
    /// E axis options.
    pub e: AxisConfig,
}

fn default_f_cpu() -> u32 {
    16_000_000
}

fn default_max_step_frequency() -> u32 {
    40_000
}

fn default_extruders() -> u8 {
    1
}

impl CoreConfig {
    /// Per-axis options.
    #[inline]
    pub fn axis(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
            Axis::E => &self.e,
        }
    }

    /// Step timer tick frequency.
    #[inline]
    pub fn timer_hz(&self) -> u32 {
        self.f_cpu / TIMER_PRESCALE
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            f_cpu: default_f_cpu(),
            max_step_frequency: default_max_step_frequency(),
            kinematics: Kinematics::Cartesian,
            extruders: default_extruders(),
            advance: false,
            z_late_enable: false,
            abort_on_endstop_hit: false,
            x: AxisConfig::new(80.0),
            y: AxisConfig::new(80.0),
            z: AxisConfig::new(4000.0),
            e: AxisConfig::new(500.0),
        }
    }
}
