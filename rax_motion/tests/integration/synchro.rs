//! Integration test: synchronized motion.
//!
//! Master scale motion → Bresenham target advance → pulse drain, across
//! ratios, reversals, and the bad-ratio rejection path.

use rax_common::config::MotionConfig;
use rax_common::mode::Mode;
use rax_common::hal::AxisDriver;
use rax_hal::SimAxisDriver;
use rax_motion::engine::MotionEngine;

// ── Helpers ─────────────────────────────────────────────────────────

fn engine() -> MotionEngine<SimAxisDriver> {
    MotionEngine::new(MotionConfig::default(), SimAxisDriver::new()).unwrap()
}

/// Arm synchronized motion through the supervisor, as the operator would.
fn synchro_engine(num: i32, den: i32) -> MotionEngine<SimAxisDriver> {
    let mut engine = engine();
    {
        let regs = engine.registers();
        regs.set_syn_ratio_num(num);
        regs.set_syn_ratio_den(den);
        regs.set_mode(Mode::SynchroInit);
    }
    engine.tick_supervisor();
    assert_eq!(engine.registers().mode(), Some(Mode::Synchro));
    engine
}

/// Run sync ticks until the target is drained and no pulse is in flight.
fn settle(engine: &mut MotionEngine<SimAxisDriver>) {
    for _ in 0..10_000 {
        engine.tick_sync();
        if engine.registers().outstanding_steps() == 0 && !engine.hal().pulse_busy() {
            return;
        }
    }
    panic!(
        "target never drained: outstanding {}",
        engine.registers().outstanding_steps()
    );
}

/// Move the master and settle.
fn master_move(engine: &mut MotionEngine<SimAxisDriver>, counts: i32) {
    engine.hal_mut().feed_scale(0, counts);
    settle(engine);
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn two_to_one_halves_master_motion() {
    let mut engine = synchro_engine(2, 1);
    engine.hal_mut().feed_scale(0, 10);
    engine.tick_sync();
    assert_eq!(engine.registers().final_position(), 5);

    // Five pulse completions later the axis has caught up.
    settle(&mut engine);
    assert_eq!(engine.registers().current_position(), 5);
    assert_eq!(engine.hal().pulses_emitted(), 5);
}

#[test]
fn three_to_two_advance_and_accumulator_period() {
    let mut engine = synchro_engine(3, 2);
    let d0 = engine.synchronizer().error_accumulator();
    master_move(&mut engine, 6);
    assert_eq!(engine.registers().final_position(), 4);
    assert_eq!(engine.registers().current_position(), 4);
    // Six master counts complete one accumulator period.
    assert_eq!(engine.synchronizer().error_accumulator(), d0);
}

#[test]
fn bad_ratio_emits_no_pulses() {
    let mut engine = engine();
    {
        let regs = engine.registers();
        regs.set_syn_ratio_num(1);
        regs.set_syn_ratio_den(2);
        regs.set_mode(Mode::SynchroInit);
    }
    engine.tick_supervisor();
    assert_eq!(engine.registers().mode(), Some(Mode::SynchroBadRatio));

    engine.hal_mut().feed_scale(0, 100);
    for _ in 0..50 {
        engine.tick_sync();
    }
    assert_eq!(engine.registers().final_position(), 0);
    assert_eq!(engine.hal().pulses_emitted(), 0);
}

#[test]
fn reverse_motion_returns_and_deasserts_direction() {
    let mut engine = synchro_engine(2, 1);
    master_move(&mut engine, 10);
    assert_eq!(engine.registers().final_position(), 5);
    assert!(engine.hal().direction());

    // Master runs backwards: target retreats by the same five steps.
    engine.hal_mut().feed_scale(0, -10);
    engine.tick_sync();
    assert_eq!(engine.registers().final_position(), 0);

    // Direction line drops for the backward drain.
    engine.tick_sync();
    assert!(!engine.hal().direction());

    settle(&mut engine);
    assert_eq!(engine.registers().current_position(), 0);
    assert_eq!(engine.hal().pulses_emitted(), 10);
}

#[test]
fn palindrome_master_path_is_reversible() {
    let mut engine = synchro_engine(7, 3);
    let deltas = [3, 11, -4, 20, 1, -9, 13, 2];

    for delta in deltas {
        master_move(&mut engine, delta);
    }
    for delta in deltas.iter().rev() {
        master_move(&mut engine, -delta);
    }

    // The master is back at its origin; so is the slave, exactly.
    assert_eq!(engine.registers().final_position(), 0);
    assert_eq!(engine.registers().current_position(), 0);
}

#[test]
fn long_run_ratio_error_stays_bounded() {
    let (num, den) = (7i32, 3i32);
    let mut engine = synchro_engine(num, den);

    // Deterministic varied walk.
    let mut state = 0x2545_f491u32;
    let mut xorshift = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state % 41) as i32 - 20
    };

    let mut master_total = 0i64;
    for _ in 0..500 {
        let delta = xorshift();
        master_total += i64::from(delta);
        master_move(&mut engine, delta);

        // |final − M·den/num| < 1, in integer form.
        let final_position = i64::from(engine.registers().final_position());
        let error = final_position * i64::from(num) - master_total * i64::from(den);
        assert!(
            error.abs() < i64::from(num),
            "ratio error {error} out of bounds after {master_total} counts"
        );
    }
}

#[test]
fn reinit_discards_outstanding_target() {
    let mut engine = synchro_engine(1, 1);
    engine.hal_mut().feed_scale(0, 8);
    engine.tick_sync();
    assert_eq!(engine.registers().outstanding_steps(), 8);

    // Operator re-arms mid-drain: the outstanding steps are discarded.
    engine.registers().set_mode(Mode::SynchroInit);
    engine.tick_supervisor();
    assert_eq!(engine.registers().outstanding_steps(), 0);

    // No stale master delta bleeds into the fresh session.
    engine.tick_sync();
    assert_eq!(engine.registers().outstanding_steps(), 0);
}

#[test]
fn selects_configured_scale_channel() {
    let mut engine = engine();
    {
        let regs = engine.registers();
        regs.set_syn_ratio_num(1);
        regs.set_syn_ratio_den(1);
        regs.set_syn_scale_index(2);
        regs.set_mode(Mode::SynchroInit);
    }
    engine.tick_supervisor();

    // Motion on other channels is ignored.
    engine.hal_mut().feed_scale(0, 50);
    engine.hal_mut().feed_scale(1, 50);
    engine.tick_sync();
    assert_eq!(engine.registers().final_position(), 0);

    master_move(&mut engine, 0); // settle sampler
    engine.hal_mut().feed_scale(2, 6);
    engine.tick_sync();
    assert_eq!(engine.registers().final_position(), 6);
}
