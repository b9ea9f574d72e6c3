//! Configuration module for motion-core.
//!
//! Provides types for loading and validating the core's system and per-axis
//! options from TOML files (with `std` feature) or pre-built structs.

mod axis;
#[cfg(feature = "std")]
mod loader;
mod system;
mod validation;

pub use axis::{AxisConfig, DriverKind, DualDriverConfig, DualMode, EndstopPair, SwitchConfig};
pub use system::{CoreConfig, Kinematics, TIMER_PRESCALE};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};
