//! Integration test: trapezoidal index moves.
//!
//! Operator-commanded moves through the register window, their speed
//! profile, and their composition with synchronized motion.

use rax_common::config::MotionConfig;
use rax_common::mode::Mode;
use rax_common::hal::AxisDriver;
use rax_hal::SimAxisDriver;
use rax_motion::engine::MotionEngine;

// ── Helpers ─────────────────────────────────────────────────────────

fn engine() -> MotionEngine<SimAxisDriver> {
    let engine = MotionEngine::new(MotionConfig::default(), SimAxisDriver::new()).unwrap();
    let regs = engine.registers();
    regs.set_max_speed(1000.0);
    regs.set_min_speed(100.0);
    regs.set_acceleration(10.0);
    regs.set_step_ratio_num(1);
    regs.set_step_ratio_den(1);
    engine
}

/// Run index ticks until the move completes.
fn run_move(engine: &mut MotionEngine<SimAxisDriver>, max_ticks: usize) {
    for _ in 0..max_ticks {
        engine.tick_index();
        if engine.indexer().is_idle() && engine.registers().index_delta_steps() == 0 {
            return;
        }
    }
    panic!("index move never completed");
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn full_trapezoid_in_halt_mode() {
    let mut engine = engine();
    engine.registers().set_index_delta_steps(200);

    let mut speeds = Vec::new();
    for _ in 0..200 {
        engine.tick_index();
        speeds.push(engine.registers().current_speed());
    }

    let regs = engine.registers();
    assert_eq!(regs.final_position(), 200);
    assert_eq!(regs.index_delta_steps(), 0);
    assert!(engine.indexer().is_idle());
    assert_eq!(engine.indexer().current_step(), engine.indexer().total_steps());

    // Profile shape: rises from the floor, holds the ceiling, returns.
    assert_eq!(speeds[0], 110.0);
    let peak = speeds.iter().cloned().fold(0.0f32, f32::max);
    assert_eq!(peak, 1000.0);
    assert_eq!(*speeds.last().unwrap(), 100.0);

    // No pulses in HALT: the target simply runs ahead of the axis.
    assert_eq!(engine.hal().pulses_emitted(), 0);
    assert_eq!(regs.current_position(), 0);
}

#[test]
fn acceptance_handshake_within_one_tick() {
    let mut engine = engine();
    engine.registers().set_index_delta_steps(-37);
    engine.tick_index();
    assert_eq!(engine.registers().index_delta_steps(), 0);
    assert_eq!(engine.indexer().total_steps(), 37);
    assert_eq!(engine.indexer().direction(), -1);
}

#[test]
fn index_overlays_synchronized_motion() {
    let mut engine = engine();
    {
        let regs = engine.registers();
        regs.set_syn_ratio_num(1);
        regs.set_syn_ratio_den(1);
        regs.set_mode(Mode::SynchroInit);
    }
    engine.tick_supervisor();
    assert_eq!(engine.registers().mode(), Some(Mode::Synchro));

    // Master contributes +10 through the synchronizer.
    engine.hal_mut().feed_scale(0, 10);
    engine.tick_sync();
    assert_eq!(engine.registers().final_position(), 10);

    // The index move adds +20 on top, additively.
    engine.registers().set_index_delta_steps(20);
    run_move(&mut engine, 100);
    assert_eq!(engine.registers().final_position(), 30);

    // The shared drain path emits all thirty steps.
    for _ in 0..100 {
        engine.tick_sync();
        if engine.registers().outstanding_steps() == 0 && !engine.hal().pulse_busy() {
            break;
        }
    }
    assert_eq!(engine.registers().current_position(), 30);
    assert_eq!(engine.hal().pulses_emitted(), 30);
}

#[test]
fn back_to_back_moves_cancel_out() {
    let mut engine = engine();
    engine.registers().set_index_delta_steps(150);
    run_move(&mut engine, 200);
    engine.registers().set_index_delta_steps(-150);
    run_move(&mut engine, 200);
    assert_eq!(engine.registers().final_position(), 0);
}

#[test]
fn refused_profile_surfaces_halt_and_keeps_request() {
    let mut engine = engine();
    engine.registers().set_mode(Mode::Synchro);
    engine.registers().set_step_ratio_den(0);
    engine.registers().set_index_delta_steps(50);
    engine.tick_index();

    let regs = engine.registers();
    assert_eq!(regs.mode(), Some(Mode::Halt));
    assert_eq!(regs.index_delta_steps(), 50);
    assert_eq!(regs.final_position(), 0);

    // Operator repairs the ratio and the pending request goes through.
    regs.set_step_ratio_den(1);
    run_move(&mut engine, 100);
    assert_eq!(engine.registers().final_position(), 50);
    assert_eq!(engine.registers().index_delta_steps(), 0);
}

#[test]
fn idle_indexer_keeps_slow_tick() {
    let mut engine = engine();
    let idle_reload = engine.config().index_idle_reload;
    let tick_compare = engine.config().index_tick_compare;

    // A completed move parks the timer back at the idle rate.
    engine.registers().set_index_delta_steps(10);
    run_move(&mut engine, 50);
    engine.tick_index();
    assert_eq!(engine.hal().index_timing(), (idle_reload, tick_compare));
}
