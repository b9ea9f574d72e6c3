//! Rate math and per-tick motion state.
//!
//! Everything in this module is pure state-machine code with no hardware
//! access, so it is unit-testable on the host.

mod advance;
mod speed_table;
mod tracer;
mod trapezoid;

pub use speed_table::{RateLookup, SpeedTable, MIN_INTERVAL};
pub use trapezoid::MotionPhase;

pub(crate) use advance::AdvanceIntegrator;
pub(crate) use tracer::EventTracer;
pub(crate) use trapezoid::TrapezoidGenerator;
