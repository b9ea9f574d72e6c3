//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::planner::{Axis, MAX_EXTRUDERS};

use super::{CoreConfig, DriverKind, DualMode};

/// Validate a core configuration.
///
/// Checks:
/// - Clock and step-frequency bounds are usable by the speed tables
/// - Per-axis steps-per-unit and homing directions are sane
/// - Extruder count is within range
/// - Pressure advance is only combined with a pulse-driven extruder
/// - Secondary drivers sit on axes that can carry them
pub fn validate_config(config: &CoreConfig) -> Result<()> {
    // The minimum representable rate is f_cpu / 500_000; below 1 MHz the
    // table index math degenerates.
    if config.f_cpu < 1_000_000 {
        return Err(Error::Config(ConfigError::InvalidClockFrequency(
            config.f_cpu,
        )));
    }

    let min_rate = config.f_cpu / 500_000;
    if config.max_step_frequency <= min_rate {
        return Err(Error::Config(ConfigError::InvalidMaxStepFrequency(
            config.max_step_frequency,
        )));
    }

    if config.extruders == 0 || config.extruders as usize > MAX_EXTRUDERS {
        return Err(Error::Config(ConfigError::InvalidExtruderCount(
            config.extruders,
        )));
    }

    for axis in Axis::ALL {
        validate_axis(axis, config)?;
    }

    if config.advance && config.e.driver == DriverKind::Command {
        return Err(Error::Config(ConfigError::AdvanceRequiresPulseDriver));
    }

    Ok(())
}

fn validate_axis(axis: Axis, config: &CoreConfig) -> Result<()> {
    let cfg = config.axis(axis);

    if !(cfg.steps_per_unit > 0.0) {
        return Err(Error::Config(ConfigError::InvalidStepsPerUnit {
            axis,
            value: cfg.steps_per_unit,
        }));
    }

    if cfg.home_dir != -1 && cfg.home_dir != 1 {
        return Err(Error::Config(ConfigError::InvalidHomeDirection {
            axis,
            value: cfg.home_dir,
        }));
    }

    if let Some(dual) = &cfg.dual {
        // Secondary drivers are pulse-only, never on the extruder, and
        // carriage routing exists for X alone.
        if axis == Axis::E || cfg.driver == DriverKind::Command {
            return Err(Error::Config(ConfigError::InvalidDualDriver(axis)));
        }
        if dual.mode == DualMode::Carriage {
            if axis != Axis::X {
                return Err(Error::Config(ConfigError::InvalidDualDriver(axis)));
            }
            if dual.home_dir != -1 && dual.home_dir != 1 {
                return Err(Error::Config(ConfigError::InvalidHomeDirection {
                    axis,
                    value: dual.home_dir,
                }));
            }
        }
    }

    Ok(())
}
