//! Integration tests for the motion core.
//!
//! These drive complete blocks through `MotionCore::tick` against recording
//! fakes and check the externally observable contract: pulse counts, position
//! accounting, interval scheduling, endstop aborts and queue discipline.

use std::cell::RefCell;
use std::rc::Rc;

use motion_core::config::{DualDriverConfig, DualMode, SwitchConfig};
use motion_core::motor::IDLE_INTERVAL;
use motion_core::{
    Axis, Block, BlockQueue, BlockRing, CoreConfig, Direction, DirectionBits, EndstopPort,
    EndstopSide, Kinematics, MotionCore, StepSink, StepTimer,
};

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct SinkState {
    totals: [u32; 4],
    calls: Vec<(Axis, u8)>,
    dirs: [Option<Direction>; 4],
    enabled: [Option<bool>; 4],
    active_extruder: u8,
}

#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<SinkState>>);

impl StepSink for SharedSink {
    fn set_direction(&mut self, axis: Axis, dir: Direction) {
        self.0.borrow_mut().dirs[axis.index()] = Some(dir);
    }

    fn step(&mut self, axis: Axis, count: u8) {
        let mut s = self.0.borrow_mut();
        s.totals[axis.index()] += count as u32;
        s.calls.push((axis, count));
    }

    fn set_active_extruder(&mut self, extruder: u8) {
        self.0.borrow_mut().active_extruder = extruder;
    }

    fn enable(&mut self, axis: Axis) {
        self.0.borrow_mut().enabled[axis.index()] = Some(true);
    }

    fn disable(&mut self, axis: Axis) {
        self.0.borrow_mut().enabled[axis.index()] = Some(false);
    }
}

impl SharedSink {
    fn total(&self, axis: Axis) -> u32 {
        self.0.borrow().totals[axis.index()]
    }
}

#[derive(Clone, Default)]
struct SharedEndstops(Rc<RefCell<[[bool; 2]; 3]>>);

impl EndstopPort for SharedEndstops {
    fn read(&mut self, axis: Axis, side: EndstopSide) -> bool {
        self.0.borrow()[axis.index()][side as usize]
    }
}

impl SharedEndstops {
    fn set(&self, axis: Axis, side: EndstopSide, level: bool) {
        self.0.borrow_mut()[axis.index()][side as usize] = level;
    }
}

#[derive(Default)]
struct TimerState {
    arms: Vec<u16>,
    enabled: bool,
}

#[derive(Clone, Default)]
struct SharedTimer(Rc<RefCell<TimerState>>);

impl StepTimer for SharedTimer {
    fn arm(&mut self, compare: u16) {
        self.0.borrow_mut().arms.push(compare);
    }

    fn enable_interrupt(&mut self) {
        self.0.borrow_mut().enabled = true;
    }

    fn disable_interrupt(&mut self) {
        self.0.borrow_mut().enabled = false;
    }
}

impl SharedTimer {
    fn take_arms(&self) -> Vec<u16> {
        std::mem::take(&mut self.0.borrow_mut().arms)
    }

    fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
}

type TestCore = MotionCore<SharedSink, SharedEndstops, SharedTimer>;

fn build(config: CoreConfig) -> (TestCore, SharedSink, SharedEndstops, SharedTimer) {
    let sink = SharedSink::default();
    let stops = SharedEndstops::default();
    let timer = SharedTimer::default();
    let core = MotionCore::new(config, sink.clone(), stops.clone(), timer.clone())
        .expect("config should validate");
    timer.take_arms(); // drop the idle arm from construction
    (core, sink, stops, timer)
}

fn cruise_block(steps: [u32; 4], rate: u32) -> Block {
    let event_count = steps.iter().copied().max().unwrap();
    Block {
        steps,
        step_event_count: event_count,
        initial_rate: rate,
        nominal_rate: rate,
        final_rate: rate,
        accelerate_until: 0,
        decelerate_after: event_count,
        ..Default::default()
    }
}

/// Tick until the queue drains, returning the compare values armed while a
/// block was active.
fn run_to_idle(core: &mut TestCore, queue: &mut BlockRing, timer: &SharedTimer) -> Vec<u16> {
    timer.take_arms();
    let mut active_arms = Vec::new();
    for _ in 0..1_000_000 {
        core.tick(queue);
        let arm = timer.take_arms();
        if !core.is_active() && !queue.has_blocks() {
            if arm != [IDLE_INTERVAL] {
                active_arms.extend(arm);
            }
            return active_arms;
        }
        active_arms.extend(arm);
    }
    panic!("block never completed");
}

// =============================================================================
// Scenario 1: constant-rate block
// =============================================================================

#[test]
fn cruise_block_emits_exact_pulses_on_schedule() {
    let (mut core, sink, _stops, timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();
    queue.push(cruise_block([100, 0, 0, 0], 1000)).unwrap();

    let arms = run_to_idle(&mut core, &mut queue, &timer);

    assert_eq!(sink.total(Axis::X), 100);
    assert_eq!(sink.total(Axis::Y), 0);
    // 100 events at 1 kHz: 100 ms within a millisecond, in 2 MHz ticks.
    let duration: u64 = arms.iter().map(|&a| a as u64).sum();
    assert!(
        (198_000..=202_000).contains(&duration),
        "duration {} ticks",
        duration
    );
    // Direction bit clear means positive travel.
    assert_eq!(core.position_steps(Axis::X), 100);
}

#[test]
fn negative_direction_counts_down() {
    let (mut core, sink, _stops, timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();
    let mut block = cruise_block([0, 50, 0, 0], 1000);
    block.direction_bits = DirectionBits::POSITIVE.with_negative(Axis::Y);
    queue.push(block).unwrap();

    run_to_idle(&mut core, &mut queue, &timer);

    assert_eq!(sink.total(Axis::Y), 50);
    assert_eq!(core.position_steps(Axis::Y), -50);
}

// =============================================================================
// Scenario 2: trapezoid ramp
// =============================================================================

#[test]
fn trapezoid_ramp_is_symmetric() {
    let (mut core, sink, _stops, timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();
    queue
        .push(Block {
            steps: [100, 0, 0, 0],
            step_event_count: 100,
            initial_rate: 400,
            nominal_rate: 4000,
            final_rate: 400,
            acceleration_rate: Block::acceleration_rate_for(158_400, 2_000_000),
            accelerate_until: 50,
            decelerate_after: 50,
            ..Default::default()
        })
        .unwrap();

    let arms = run_to_idle(&mut core, &mut queue, &timer);
    assert_eq!(sink.total(Axis::X), 100);

    // Intervals shrink through the first half and grow through the second.
    let min_pos = arms
        .iter()
        .enumerate()
        .min_by_key(|(_, &a)| a)
        .map(|(i, _)| i)
        .unwrap();
    assert!(
        (arms.len() / 3..2 * arms.len() / 3).contains(&min_pos),
        "fastest interval at {} of {}",
        min_pos,
        arms.len()
    );
    // Slow at both ends (near 400 Hz), fast in the middle (near 4 kHz).
    assert!(*arms.first().unwrap() >= 2000 && *arms.last().unwrap() >= 2000);
    assert!(*arms.iter().min().unwrap() <= 600);

    // Ramping 400 -> 4000 -> 400 Hz at 158400 steps/s^2 over 100 steps takes
    // 2 * (3600 / 158400) s = 45.45 ms. Discretization smears the edges.
    let duration: u64 = arms.iter().map(|&a| a as u64).sum();
    assert!(
        (80_000..=104_000).contains(&duration),
        "duration {} ticks",
        duration
    );

    // Symmetry: time spent below and above the midpoint of the ramp match
    // within a tenth.
    let first_half: u64 = arms[..arms.len() / 2].iter().map(|&a| a as u64).sum();
    let second_half: u64 = arms[arms.len() / 2..].iter().map(|&a| a as u64).sum();
    let diff = first_half.abs_diff(second_half);
    assert!(
        diff <= duration / 10,
        "halves {} vs {}",
        first_half,
        second_half
    );
}

// =============================================================================
// Scenario 3: back-to-back blocks
// =============================================================================

#[test]
fn matched_junction_rates_leave_no_gap() {
    let (mut core, sink, _stops, timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();
    queue.push(cruise_block([40, 0, 0, 0], 2000)).unwrap();
    queue.push(cruise_block([40, 0, 0, 0], 2000)).unwrap();

    let arms = run_to_idle(&mut core, &mut queue, &timer);

    assert_eq!(sink.total(Axis::X), 80);
    // Every armed interval across both blocks and the junction is the cruise
    // interval; the core never dropped to the idle rate in between.
    assert!(
        arms.iter().all(|&a| a == 1000),
        "intervals: {:?}",
        &arms[..arms.len().min(90)]
    );
}

// =============================================================================
// Scenario 4: endstop hit
// =============================================================================

#[test]
fn debounced_endstop_hit_force_completes_the_block() {
    let mut config = CoreConfig::default();
    config.x.endstops.min = Some(SwitchConfig::default());
    let (mut core, sink, stops, timer) = build(config);
    let mut queue: BlockRing = BlockRing::new();

    let mut block = cruise_block([100, 0, 0, 0], 1000);
    block.direction_bits = DirectionBits::POSITIVE.with_negative(Axis::X);
    queue.push(block).unwrap();

    stops.set(Axis::X, EndstopSide::Min, true);
    run_to_idle(&mut core, &mut queue, &timer);

    // First tick samples (debounce arm) and steps once; the second tick
    // confirms the hit and skips its burst.
    assert_eq!(sink.total(Axis::X), 1);
    assert_eq!(core.position_steps(Axis::X), -1);

    let report = core.check_hit_endstops(&mut queue).expect("hit latched");
    let trigger = report.triggers[0].expect("X latched");
    // Latched at the position of the hit, reported in configured units.
    assert!((trigger - (-1.0 / 80.0)).abs() < 1e-6);
    assert!(!report.aborted);

    // Latches clear after reporting.
    assert!(core.check_hit_endstops(&mut queue).is_none());
}

#[test]
fn abort_policy_drains_the_queue() {
    let mut config = CoreConfig::default();
    config.x.endstops.min = Some(SwitchConfig::default());
    config.abort_on_endstop_hit = true;
    let (mut core, _sink, stops, timer) = build(config);
    let mut queue: BlockRing = BlockRing::new();

    let mut block = cruise_block([100, 0, 0, 0], 1000);
    block.direction_bits = DirectionBits::POSITIVE.with_negative(Axis::X);
    queue.push(block).unwrap();
    queue.push(cruise_block([100, 0, 0, 0], 1000)).unwrap();

    stops.set(Axis::X, EndstopSide::Min, true);
    core.tick(&mut queue);
    core.tick(&mut queue);
    timer.take_arms();

    let report = core.check_hit_endstops(&mut queue).expect("hit latched");
    assert!(report.aborted);
    assert!(!queue.has_blocks());
    assert!(!core.is_active());
}

#[test]
fn homing_clears_latches_on_purpose() {
    let mut config = CoreConfig::default();
    config.x.endstops.min = Some(SwitchConfig::default());
    let (mut core, _sink, stops, timer) = build(config);
    let mut queue: BlockRing = BlockRing::new();

    let mut block = cruise_block([10, 0, 0, 0], 1000);
    block.direction_bits = DirectionBits::POSITIVE.with_negative(Axis::X);
    queue.push(block).unwrap();
    stops.set(Axis::X, EndstopSide::Min, true);
    run_to_idle(&mut core, &mut queue, &timer);

    core.endstops_hit_on_purpose();
    assert!(core.check_hit_endstops(&mut queue).is_none());
}

// =============================================================================
// Scenario 5: event multiplier above 10 kHz
// =============================================================================

#[test]
fn sixteen_kilohertz_steps_twice_per_tick() {
    let (mut core, sink, _stops, timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();
    queue.push(cruise_block([200, 0, 0, 0], 16_000)).unwrap();

    let arms = run_to_idle(&mut core, &mut queue, &timer);

    assert_eq!(sink.total(Axis::X), 200);
    // Bursts of two events per tick.
    assert!(sink.0.borrow().calls.iter().all(|&(_, n)| n == 2));
    // The interval is computed for half the rate: 8 kHz at the 2 MHz base.
    let expected = arms[arms.len() / 2];
    assert!(
        (248..=252).contains(&expected),
        "cruise interval {}",
        expected
    );
    // Emitted events per second are preserved: 200 events in ~12.5 ms.
    let duration: u64 = arms.iter().map(|&a| a as u64).sum();
    assert!(
        (24_000..=26_500).contains(&duration),
        "duration {} ticks",
        duration
    );
}

// =============================================================================
// Scenario 6: quick stop
// =============================================================================

#[test]
fn quick_stop_abandons_the_block_consistently() {
    let (mut core, sink, _stops, timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();
    queue.push(cruise_block([1000, 0, 0, 0], 2000)).unwrap();
    queue.push(cruise_block([1000, 0, 0, 0], 2000)).unwrap();

    for _ in 0..500 {
        core.tick(&mut queue);
    }
    assert_eq!(sink.total(Axis::X), 500);

    core.quick_stop(&mut queue);
    assert!(!core.is_active());
    assert!(!queue.has_blocks());
    // The interrupt mask was restored on exit.
    assert!(timer.is_enabled());

    // Position reflects exactly the pulses emitted; further ticks idle.
    assert_eq!(core.position_steps(Axis::X), 500);
    timer.take_arms();
    core.tick(&mut queue);
    assert_eq!(timer.take_arms(), [IDLE_INTERVAL]);
    assert_eq!(sink.total(Axis::X), 500);
}

// =============================================================================
// Position control surface
// =============================================================================

#[test]
fn set_then_get_position_round_trips() {
    let (mut core, _sink, _stops, _timer) = build(CoreConfig::default());

    core.set_position(100, -200, 300, -400);
    assert_eq!(core.position_steps(Axis::X), 100);
    assert_eq!(core.position_steps(Axis::Y), -200);
    assert_eq!(core.position_steps(Axis::Z), 300);
    assert_eq!(core.position_steps(Axis::E), -400);

    core.set_e_position(7);
    assert_eq!(core.position_steps(Axis::E), 7);

    // Unit conversion divides by steps-per-unit (Z default is 4000).
    assert!((core.position_units(Axis::Z) - 0.075).abs() < 1e-6);
}

#[test]
fn wake_enables_the_timer_interrupt() {
    let (mut core, _sink, _stops, timer) = build(CoreConfig::default());
    assert!(!timer.is_enabled());
    core.wake();
    assert!(timer.is_enabled());
}

#[test]
fn synchronize_yields_until_the_queue_drains() {
    let (mut core, sink, _stops, _timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();
    queue.push(cruise_block([25, 0, 0, 0], 1000)).unwrap();

    // The idle hook stands in for the cooperative scheduler; ticks keep
    // firing while the foreground waits.
    let mut polls = 0;
    core.synchronize(&mut queue, |core, queue| {
        polls += 1;
        core.tick(queue);
    });
    assert!(polls >= 25);
    assert_eq!(sink.total(Axis::X), 25);
}

#[test]
fn finish_and_disable_powers_down_every_axis() {
    let (mut core, sink, _stops, _timer) = build(CoreConfig::default());
    let mut queue: BlockRing = BlockRing::new();

    core.finish_and_disable(&mut queue, |_, _| {});
    for axis in Axis::ALL {
        assert_eq!(sink.0.borrow().enabled[axis.index()], Some(false));
    }
}

// =============================================================================
// CoreXY endstop selection
// =============================================================================

#[test]
fn corexy_arms_the_x_endstop_for_combined_negative_motion() {
    let mut config = CoreConfig::default();
    config.kinematics = Kinematics::CoreXy;
    config.x.endstops.min = Some(SwitchConfig::default());
    config.y.endstops.min = Some(SwitchConfig::default());
    let (mut core, _sink, stops, timer) = build(config);
    let mut queue: BlockRing = BlockRing::new();

    // -A-B commands -X; only the X latch may fire even though both motors
    // step.
    let mut block = cruise_block([60, 60, 0, 0], 1000);
    block.direction_bits = DirectionBits::POSITIVE
        .with_negative(Axis::X)
        .with_negative(Axis::Y);
    queue.push(block).unwrap();

    stops.set(Axis::X, EndstopSide::Min, true);
    stops.set(Axis::Y, EndstopSide::Min, true);
    run_to_idle(&mut core, &mut queue, &timer);

    let report = core.check_hit_endstops(&mut queue).expect("hit latched");
    assert!(report.triggers[0].is_some());
    assert!(report.triggers[1].is_none());
}

#[test]
fn dual_carriage_only_arms_the_active_carriage_home_direction() {
    let mut config = CoreConfig::default();
    config.extruders = 2;
    config.x.endstops.min = Some(SwitchConfig::default());
    config.x.dual = Some(DualDriverConfig {
        mode: DualMode::Carriage,
        home_dir: 1,
    });
    let (mut core, sink, stops, timer) = build(config);
    let mut queue: BlockRing = BlockRing::new();

    // Carriage 1 homes to max; a -X move with carriage 1 active must ignore
    // the min switch entirely.
    let mut block = cruise_block([30, 0, 0, 0], 1000);
    block.direction_bits = DirectionBits::POSITIVE.with_negative(Axis::X);
    block.active_extruder = 1;
    queue.push(block).unwrap();

    stops.set(Axis::X, EndstopSide::Min, true);
    run_to_idle(&mut core, &mut queue, &timer);

    assert_eq!(sink.total(Axis::X), 30);
    assert!(core.check_hit_endstops(&mut queue).is_none());
}

// =============================================================================
// Z late enable
// =============================================================================

#[test]
fn z_late_enable_defers_the_first_burst() {
    let mut config = CoreConfig::default();
    config.z_late_enable = true;
    let (mut core, sink, _stops, timer) = build(config);
    let mut queue: BlockRing = BlockRing::new();
    queue.push(cruise_block([0, 0, 20, 0], 1000)).unwrap();

    core.tick(&mut queue);
    // The claim tick only powers the driver and reschedules ~1 ms out.
    assert_eq!(sink.total(Axis::Z), 0);
    assert_eq!(sink.0.borrow().enabled[Axis::Z.index()], Some(true));
    assert_eq!(timer.take_arms(), [2000]);

    run_to_idle(&mut core, &mut queue, &timer);
    assert_eq!(sink.total(Axis::Z), 20);
}

// =============================================================================
// Pressure advance
// =============================================================================

#[test]
fn advance_routes_extra_e_steps_through_the_drain() {
    let mut config = CoreConfig::default();
    config.advance = true;
    let (mut core, sink, _stops, timer) = build(config);
    let mut queue: BlockRing = BlockRing::new();

    let mut block = cruise_block([100, 0, 0, 50], 1000);
    block.initial_advance = 256 * 3;
    block.final_advance = 0;
    queue.push(block).unwrap();

    run_to_idle(&mut core, &mut queue, &timer);

    // The motion tick never pulses E itself under advance.
    assert_eq!(sink.total(Axis::E), 0);

    // The drain emits the block's E steps plus the three advance steps.
    for _ in 0..60 {
        core.advance_tick();
    }
    assert_eq!(sink.total(Axis::E), 53);
    assert_eq!(core.position_steps(Axis::E), 53);
    // The drain leaves the selector on the extruder it stepped.
    assert_eq!(sink.0.borrow().active_extruder, 0);
}

#[test]
fn babystep_pulses_once_and_restores_direction() {
    let (mut core, sink, _stops, _timer) = build(CoreConfig::default());

    core.babystep(Axis::Z, Direction::Negative);
    assert_eq!(sink.total(Axis::Z), 1);
    assert_eq!(
        sink.0.borrow().dirs[Axis::Z.index()],
        Some(Direction::Negative)
    );
    assert_eq!(sink.0.borrow().enabled[Axis::Z.index()], Some(true));
    // Position is deliberately untouched: the offset is physical.
    assert_eq!(core.position_steps(Axis::Z), 0);
}
