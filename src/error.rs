//! Error types for motion-core.
//!
//! Provides unified error handling across configuration and the planner-facing
//! block queue. The tick path itself is infallible: timing faults are clamped
//! and recorded as diagnostic flags instead of being surfaced as errors.

use core::fmt;

use crate::planner::Axis;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all motion-core operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Block queue error
    Queue(QueueError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Timer base frequency too low to derive the speed tables
    InvalidClockFrequency(u32),
    /// Maximum step frequency must exceed the minimum representable rate
    InvalidMaxStepFrequency(u32),
    /// Steps-per-unit must be positive
    InvalidStepsPerUnit {
        /// Axis the bad value was configured for
        axis: Axis,
        /// The rejected value
        value: f32,
    },
    /// Homing direction must be -1 or 1
    InvalidHomeDirection {
        /// Axis the bad value was configured for
        axis: Axis,
        /// The rejected value
        value: i8,
    },
    /// Extruder count out of range (1 to 3)
    InvalidExtruderCount(u8),
    /// Pressure advance requires a pulse-driven extruder channel
    AdvanceRequiresPulseDriver,
    /// A secondary driver was configured on an axis that cannot carry one
    InvalidDualDriver(Axis),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Block queue errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The ring is full; the planner must retry after the core drains a block
    Full,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Queue(e) => write!(f, "Queue error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidClockFrequency(v) => {
                write!(f, "Invalid clock frequency: {} Hz. Must be at least 1 MHz", v)
            }
            ConfigError::InvalidMaxStepFrequency(v) => {
                write!(f, "Invalid max step frequency: {} Hz", v)
            }
            ConfigError::InvalidStepsPerUnit { axis, value } => {
                write!(f, "Invalid steps-per-unit for {:?}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidHomeDirection { axis, value } => {
                write!(f, "Invalid homing direction for {:?}: {}. Must be -1 or 1", axis, value)
            }
            ConfigError::InvalidExtruderCount(n) => {
                write!(f, "Invalid extruder count: {}. Must be 1 to 3", n)
            }
            ConfigError::AdvanceRequiresPulseDriver => {
                write!(f, "Pressure advance is not supported on a command-driven extruder")
            }
            ConfigError::InvalidDualDriver(axis) => {
                write!(f, "Axis {:?} cannot carry a secondary driver", axis)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full => write!(f, "Block queue is full"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Error::Queue(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for QueueError {}
