//! The motion core: block claim, per-tick execution and the control surface.
//!
//! [`MotionCore::tick`] is the timer interrupt workhorse. It claims blocks
//! from the queue and executes them by pulsing the step sink, in this order
//! within a tick: endstop sample, direction apply, step burst, phase
//! evaluation, schedule next interval. Foreground methods that touch state
//! shared with the tick mask the driver interrupt for the critical region.

use crate::config::{validate_config, CoreConfig};
use crate::error::Result;
use crate::motion::{
    AdvanceIntegrator, EventTracer, MotionPhase, SpeedTable, TrapezoidGenerator,
};
use crate::planner::{Axis, Block, BlockQueue, Direction, MAX_EXTRUDERS};

use super::endstop::{EndstopMonitor, EndstopPort, EndstopReport};
use super::sink::StepSink;
use super::timer::{InterruptMask, StepTimer, IDLE_INTERVAL, Z_LATE_DELAY};
use super::position::PositionCounters;

/// Pressure-advance runtime state: the integrator plus the per-extruder step
/// backlog drained by the secondary timer.
#[derive(Debug, Default)]
struct AdvanceState {
    integrator: AdvanceIntegrator,
    e_steps: [i32; MAX_EXTRUDERS],
}

/// The motion execution core.
///
/// Owns the trapezoid generator, Bresenham tracer, endstop monitor and
/// position counters, and drives a [`StepSink`] from tick context. The block
/// queue stays outside (the planner owns it) and is passed into the methods
/// that consume it.
pub struct MotionCore<S: StepSink, E: EndstopPort, T: StepTimer> {
    config: CoreConfig,
    table: SpeedTable,
    sink: S,
    endstop_port: E,
    timer: T,
    trapezoid: TrapezoidGenerator,
    tracer: EventTracer,
    endstops: EndstopMonitor,
    position: PositionCounters,
    current: Option<Block>,
    advance: Option<AdvanceState>,
    over_rate: bool,
}

impl<S: StepSink, E: EndstopPort, T: StepTimer> MotionCore<S, E, T> {
    /// Build a core from a validated configuration. The timer starts armed
    /// at the idle interval with its interrupt still masked; call [`wake`]
    /// to begin ticking.
    ///
    /// [`wake`]: MotionCore::wake
    pub fn new(config: CoreConfig, sink: S, endstop_port: E, mut timer: T) -> Result<Self> {
        validate_config(&config)?;
        let table = SpeedTable::new(config.f_cpu, config.max_step_frequency);
        timer.arm(IDLE_INTERVAL);
        let advance = config.advance.then(AdvanceState::default);
        Ok(Self {
            config,
            table,
            sink,
            endstop_port,
            timer,
            trapezoid: TrapezoidGenerator::new(),
            tracer: EventTracer::new(),
            endstops: EndstopMonitor::new(),
            position: PositionCounters::new(),
            current: None,
            advance,
            over_rate: false,
        })
    }

    /// The stepper driver interrupt body. Never blocks and never fails;
    /// timing faults are clamped and latched for [`report_diagnostics`].
    ///
    /// [`report_diagnostics`]: MotionCore::report_diagnostics
    pub fn tick<Q: BlockQueue>(&mut self, queue: &mut Q) {
        if self.current.is_none() {
            let Some(block) = queue.claim_current() else {
                self.timer.arm(IDLE_INTERVAL);
                return;
            };
            block.debug_assert_valid();
            let initial = self.trapezoid.reset(&block, &self.table);
            self.over_rate |= initial.clamped;
            self.tracer.reset(&block, initial.shift);
            if let Some(adv) = &mut self.advance {
                let delta = adv.integrator.reset(&block);
                adv.e_steps[block.active_extruder as usize] += delta;
            }
            let defer_z = self.config.z_late_enable && block.steps[Axis::Z.index()] > 0;
            self.current = Some(block);
            if defer_z {
                self.sink.enable(Axis::Z);
                self.timer.arm(Z_LATE_DELAY);
                return;
            }
        }

        let Some(block) = self.current else { return };
        let advance_active = self.advance.is_some();

        self.sink.set_active_extruder(block.active_extruder);
        for axis in Axis::ALL {
            // With advance, the drain timer owns the E direction signal.
            if axis == Axis::E && advance_active {
                continue;
            }
            self.sink
                .set_direction(axis, block.direction_bits.direction(axis));
        }

        if self.endstops.sample(
            &mut self.endstop_port,
            &self.config,
            &block,
            &self.position,
        ) {
            self.tracer.force_complete(&block);
        } else if !self.tracer.is_complete(&block) {
            let burst = self.tracer.trace(&block, advance_active);
            for axis in Axis::ALL {
                let count = burst.pulses[axis.index()];
                if count > 0 {
                    self.sink.step(axis, count);
                    self.position
                        .apply(axis, block.direction_bits.sign(axis) * count as i32);
                }
            }
            if let Some(adv) = &mut self.advance {
                adv.e_steps[block.active_extruder as usize] += burst.e_events as i32;
            }
        }

        let step = self
            .trapezoid
            .next(&block, self.tracer.events_completed(), &self.table);
        self.over_rate |= step.clamped;
        self.tracer.set_shift(step.shift);
        if let Some(adv) = &mut self.advance {
            let delta = match step.phase {
                MotionPhase::Accelerating => adv.integrator.accelerate(&block, step.shift),
                MotionPhase::Decelerating => adv.integrator.decelerate(&block, step.shift),
                MotionPhase::Cruising => 0,
            };
            adv.e_steps[block.active_extruder as usize] += delta;
        }
        self.timer.arm(step.compare);

        if self.tracer.is_complete(&block) {
            self.current = None;
            queue.discard_current();
        }
    }

    /// Secondary-timer interrupt body (~10 kHz): drain queued advance steps,
    /// up to four per extruder per activation. Must run below the motion
    /// tick's priority or otherwise never preempt it.
    pub fn advance_tick(&mut self) {
        let Some(adv) = &mut self.advance else { return };
        let extruders = self.config.extruders as usize;
        for _ in 0..4 {
            for extruder in 0..extruders {
                let pending = adv.e_steps[extruder];
                if pending == 0 {
                    continue;
                }
                let dir = if pending < 0 {
                    Direction::Negative
                } else {
                    Direction::Positive
                };
                self.sink.set_active_extruder(extruder as u8);
                self.sink.set_direction(Axis::E, dir);
                self.sink.step(Axis::E, 1);
                self.position.apply(Axis::E, dir.sign());
                adv.e_steps[extruder] -= dir.sign();
            }
        }
    }

    /// Whether a block is in flight.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Enable the stepper timer interrupt.
    pub fn wake(&mut self) {
        self.timer.enable_interrupt();
    }

    /// Discard all queued blocks and abandon the block in flight. Position
    /// stays consistent with the pulses already emitted; no deceleration is
    /// attempted. The next tick idles.
    pub fn quick_stop<Q: BlockQueue>(&mut self, queue: &mut Q) {
        let _mask = InterruptMask::new(&mut self.timer);
        queue.clear();
        self.current = None;
    }

    /// Block the foreground until the queue drains. `idle` runs every
    /// iteration; it is where cooperative tasks (heaters, UI, inactivity)
    /// get their time while motion completes.
    pub fn synchronize<Q: BlockQueue>(
        &mut self,
        queue: &mut Q,
        mut idle: impl FnMut(&mut Self, &mut Q),
    ) {
        while self.current.is_some() || queue.has_blocks() {
            idle(self, queue);
        }
    }

    /// Synchronize, then power down every driver channel.
    pub fn finish_and_disable<Q: BlockQueue>(
        &mut self,
        queue: &mut Q,
        idle: impl FnMut(&mut Self, &mut Q),
    ) {
        self.synchronize(queue, idle);
        for axis in Axis::ALL {
            self.sink.disable(axis);
        }
    }

    /// Overwrite all position counters.
    pub fn set_position(&mut self, x: i32, y: i32, z: i32, e: i32) {
        let _mask = InterruptMask::new(&mut self.timer);
        self.position.set_all([x, y, z, e]);
    }

    /// Overwrite the extruder position counter.
    pub fn set_e_position(&mut self, e: i32) {
        let _mask = InterruptMask::new(&mut self.timer);
        self.position.set(Axis::E, e);
    }

    /// Read one position counter.
    pub fn position_steps(&mut self, axis: Axis) -> i32 {
        let _mask = InterruptMask::new(&mut self.timer);
        self.position.get(axis)
    }

    /// Read one position counter in configured units.
    pub fn position_units(&mut self, axis: Axis) -> f32 {
        self.position_steps(axis) as f32 / self.config.axis(axis).steps_per_unit
    }

    /// Gate endstop checking (disabled after homing).
    pub fn enable_endstops(&mut self, check: bool) {
        self.endstops.set_enabled(check);
    }

    /// Clear latched endstop hits without reporting (expected hits while
    /// homing).
    pub fn endstops_hit_on_purpose(&mut self) {
        self.endstops.clear();
    }

    /// Report and clear latched endstop hits.
    ///
    /// Returns `None` when nothing is latched. With the abort policy
    /// enabled, the queue is drained before returning; cancelling the print
    /// source and heaters stays with the caller.
    pub fn check_hit_endstops<Q: BlockQueue>(&mut self, queue: &mut Q) -> Option<EndstopReport> {
        if !self.endstops.any_hit() {
            return None;
        }

        let mut report = EndstopReport::default();
        for (i, axis) in [Axis::X, Axis::Y, Axis::Z].into_iter().enumerate() {
            if self.endstops.hit(axis) {
                let units = self.endstops.trigger_steps(axis) as f32
                    / self.config.axis(axis).steps_per_unit;
                report.triggers[i] = Some(units);
                log::warn!("endstop hit on {:?} at {}", axis, units);
            }
        }
        self.endstops.clear();

        if self.config.abort_on_endstop_hit {
            self.quick_stop(queue);
            report.aborted = true;
        }
        Some(report)
    }

    /// Log and clear pending tick diagnostics. One message per saturation,
    /// however many ticks clamped.
    pub fn report_diagnostics(&mut self) {
        if self.over_rate {
            self.over_rate = false;
            log::warn!("step rate above limit; interval clamped");
        }
    }

    /// One out-of-band step, bypassing the planner and the position
    /// counters (the physical offset is the point). ISR context only; the
    /// caller must guarantee no tick interleaves. The direction of the
    /// block in flight is restored afterwards.
    pub fn babystep(&mut self, axis: Axis, dir: Direction) {
        self.sink.enable(axis);
        self.sink.set_direction(axis, dir);
        self.sink.step(axis, 1);
        if let Some(block) = &self.current {
            self.sink
                .set_direction(axis, block.direction_bits.direction(axis));
        }
    }

    /// The step sink, for board-level setup (enabling drivers, duplication
    /// mode).
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The core's configuration.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}
