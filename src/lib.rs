//! # motion-core
//!
//! Motion execution core for multi-axis stepper machines: consumes
//! pre-planned motion blocks from a queue and emits precisely-timed step and
//! direction signals from a hardware-timer tick.
//!
//! ## Features
//!
//! - **Trapezoid generator**: per-tick acceleration math in fixed point, no
//!   division or floating point on the tick path
//! - **Bresenham tracer**: one event distributed across four axes, with 2x/4x
//!   event multipliers above 10/20 kHz
//! - **Pluggable step sinks**: STEP/DIR pin toggling via embedded-hal 1.0 or
//!   command-driven smart drivers, selected per axis
//! - **Endstop monitor**: debounced limit-switch sampling with position
//!   latching and block abort
//! - **Pressure advance**: optional feed-forward extruder correction drained
//!   by a secondary timer
//! - **Configuration-driven**: system and per-axis options from TOML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use motion_core::{Block, BlockRing, MotionCore};
//!
//! let config = motion_core::load_config("motion.toml")?;
//! let mut queue: BlockRing = BlockRing::new();
//! let mut core = MotionCore::new(config, sink, endstops, timer)?;
//!
//! // Foreground: plan and enqueue blocks.
//! queue.push(block)?;
//! core.wake();
//!
//! // Timer interrupt: execute them.
//! core.tick(&mut queue);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): TOML file loading and `std::error::Error` impls
//! - `defmt`: defmt formatting for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod config;
pub mod error;
pub mod motion;
pub mod motor;
pub mod planner;

// Re-exports for ergonomic API
pub use config::{AxisConfig, CoreConfig, DriverKind, DualMode, Kinematics};
pub use error::{Error, Result};
pub use motion::{MotionPhase, RateLookup, SpeedTable};
pub use motor::{
    AxisChannel, CommandChannel, EndstopPort, EndstopReport, EndstopSide, MachineSink,
    MotionCore, PositionCounters, PulseChannel, SmartDriver, StepSink, StepTimer,
};
pub use planner::{Axis, Block, BlockQueue, BlockRing, Direction, DirectionBits};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};
