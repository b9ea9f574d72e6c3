//! Planner-facing types: motion blocks and the block queue contract.
//!
//! The planner produces [`Block`]s (straight-line segments with trapezoidal
//! speed profiles) and pushes them into a [`BlockRing`]; the motion core
//! consumes them from tick context through the [`BlockQueue`] trait.

mod block;
mod queue;

pub use block::{Axis, Block, Direction, DirectionBits, MAX_EXTRUDERS, NUM_AXES};
pub use queue::{BlockQueue, BlockRing};
