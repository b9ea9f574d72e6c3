//! Per-axis configuration.

use serde::Deserialize;

/// Which backend kind drives an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// STEP/DIR pin toggling.
    Pulse,
    /// Command-driven smart driver (SPI stepper IC).
    Command,
}

/// How a secondary driver on the same axis is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum DualMode {
    /// The second driver always mirrors the first (dual Y/Z gantries).
    Mirror,
    /// The second driver belongs to a second carriage. The active extruder
    /// selects which carriage moves; duplication mode drives both.
    Carriage,
}

/// Secondary-driver options for an axis.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DualDriverConfig {
    /// Wiring mode of the secondary driver.
    pub mode: DualMode,
    /// Homing direction of the second carriage (carriage mode only).
    #[serde(default = "default_second_home_dir")]
    pub home_dir: i8,
}

fn default_second_home_dir() -> i8 {
    1
}

/// One limit switch input.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SwitchConfig {
    /// Input reads active-low when set.
    #[serde(default)]
    pub inverting: bool,
    /// Enable the internal pull-up on the input.
    #[serde(default)]
    pub pullup: bool,
}

/// Min/max limit switches fitted to an axis.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EndstopPair {
    /// Switch at the negative end of travel, if fitted.
    #[serde(default)]
    pub min: Option<SwitchConfig>,
    /// Switch at the positive end of travel, if fitted.
    #[serde(default)]
    pub max: Option<SwitchConfig>,
}

/// Complete configuration for one axis.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Steps per configured unit of travel (mm or degree).
    pub steps_per_unit: f32,

    /// Invert the direction signal.
    #[serde(default)]
    pub invert_dir: bool,

    /// Invert the step pulse polarity.
    #[serde(default)]
    pub invert_step: bool,

    /// Driver enable line is active-high instead of the usual active-low.
    #[serde(default)]
    pub enable_active_high: bool,

    /// Homing direction: -1 toward min, 1 toward max.
    #[serde(default = "default_home_dir")]
    pub home_dir: i8,

    /// Backend kind driving this axis.
    #[serde(default = "default_driver")]
    pub driver: DriverKind,

    /// Limit switches fitted to this axis.
    #[serde(default)]
    pub endstops: EndstopPair,

    /// Optional secondary driver.
    #[serde(default)]
    pub dual: Option<DualDriverConfig>,
}

fn default_home_dir() -> i8 {
    -1
}

fn default_driver() -> DriverKind {
    DriverKind::Pulse
}

impl AxisConfig {
    /// A pulse-driven axis with the given resolution and all defaults.
    pub fn new(steps_per_unit: f32) -> Self {
        Self {
            steps_per_unit,
            invert_dir: false,
            invert_step: false,
            enable_active_high: false,
            home_dir: -1,
            driver: DriverKind::Pulse,
            endstops: EndstopPair::default(),
            dual: None,
        }
    }

    /// Fit a limit switch at the negative end of travel.
    pub fn with_min_endstop(mut self, switch: SwitchConfig) -> Self {
        self.endstops.min = Some(switch);
        self
    }

    /// Fit a limit switch at the positive end of travel.
    pub fn with_max_endstop(mut self, switch: SwitchConfig) -> Self {
        self.endstops.max = Some(switch);
        self
    }
}
