//! Hardware-facing side of the core: timer bridge, step sinks, endstops,
//! position counters and the [`MotionCore`] context itself.

mod core;
mod endstop;
mod gpio;
mod position;
mod sink;
mod smart;
mod timer;

pub use self::core::MotionCore;
pub use endstop::{EndstopPort, EndstopReport, EndstopSide};
pub use gpio::PulseChannel;
pub use position::PositionCounters;
pub use sink::{AxisChannel, MachineSink, StepSink};
pub use smart::{CommandChannel, SmartDriver};
pub use timer::{StepTimer, IDLE_INTERVAL};
