//! Trapezoidal index moves.
//!
//! A finite operator-commanded displacement overlaid on whatever the
//! synchronizer is doing. The indexer runs from its own timer and rewrites
//! that timer's auto-reload every tick to modulate its own step frequency:
//! accelerate while below half the move, record the step count where
//! acceleration ended, decelerate over the same count at the tail. The
//! symmetric step count makes the profile square-root free.
//!
//! The indexer writes only the commanded target; physical pulses come out
//! of the synchronizer's drain phase, so index steps inherit the pulse-rate
//! limit and compose additively with synchronized motion.

use rax_common::consts::INDEX_RELOAD_MAX;
use rax_common::hal::AxisDriver;
use rax_common::mode::Mode;
use rax_common::registers::RegisterWindow;

/// Trapezoidal profile state, private to the index tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Indexer {
    /// Tick period [clock cycles], recomputed as speed changes.
    accel_interval: f32,
    /// Axis steps per physical unit, latched at acceptance.
    step_ratio: f32,
    /// Steps emitted so far in the active move.
    current_step: i32,
    /// Total steps of the active move. Equal to `current_step` when idle.
    total_steps: i32,
    /// Step count at which acceleration ended; deceleration starts this
    /// many steps before the end.
    decel_steps: i32,
    /// Move direction unit (−1 or +1).
    direction: i32,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// No move in progress.
    #[inline]
    pub const fn is_idle(&self) -> bool {
        self.current_step == self.total_steps
    }

    #[inline]
    pub const fn current_step(&self) -> i32 {
        self.current_step
    }

    #[inline]
    pub const fn total_steps(&self) -> i32 {
        self.total_steps
    }

    #[inline]
    pub const fn decel_steps(&self) -> i32 {
        self.decel_steps
    }

    #[inline]
    pub const fn direction(&self) -> i32 {
        self.direction
    }

    /// Profile registers usable for a new move: finite floats, positive
    /// floor speed and acceleration, and a positive step ratio.
    fn profile_valid(regs: &RegisterWindow) -> bool {
        let max_speed = regs.max_speed();
        let min_speed = regs.min_speed();
        let acceleration = regs.acceleration();
        if !max_speed.is_finite() || !min_speed.is_finite() || !acceleration.is_finite() {
            return false;
        }
        if min_speed <= 0.0 || acceleration <= 0.0 || max_speed < min_speed {
            return false;
        }
        let num = regs.step_ratio_num();
        let den = regs.step_ratio_den();
        if num == 0 || den == 0 {
            return false;
        }
        (num > 0) == (den > 0)
    }

    /// One index tick.
    pub fn tick<D: AxisDriver>(
        &mut self,
        regs: &RegisterWindow,
        hal: &mut D,
        clock_hz: u32,
        idle_reload: u16,
        tick_compare: u16,
    ) {
        // ── Acceptance: idle and a request is pending ──
        if self.is_idle() && regs.index_delta_steps() != 0 {
            if !Self::profile_valid(regs) {
                // Refuse without consuming the request; the operator sees
                // the non-acknowledgement plus the HALT fallback.
                regs.set_mode(Mode::Halt);
                return;
            }
            let delta = i32::from(regs.take_index_delta_steps());
            if delta != 0 {
                self.direction = if delta > 0 { 1 } else { -1 };
                self.current_step = 0;
                self.total_steps = delta.abs();
                self.accel_interval = regs.acceleration();
                regs.set_current_speed(regs.min_speed());
                self.step_ratio = regs.step_ratio_num() as f32 / regs.step_ratio_den() as f32;
                self.decel_steps = 0;
            }
        }

        // ── Idle: keep the tick alive at a slow rate ──
        if self.is_idle() {
            hal.rearm_index_timer(idle_reload, tick_compare);
            return;
        }

        let max_speed = regs.max_speed();
        let min_speed = regs.min_speed();
        let acceleration = regs.acceleration();

        // ── Acceleration phase ──
        if regs.current_speed() < max_speed && self.current_step < self.total_steps / 2 {
            let speed = (regs.current_speed() + acceleration).min(max_speed);
            regs.set_current_speed(speed);
            self.accel_interval = clock_hz as f32 * self.step_ratio / speed;
        } else if self.decel_steps == 0 {
            // First tick past acceleration: latch the symmetric step count
            // at which deceleration must start.
            self.decel_steps = self.current_step;
        }

        // ── Deceleration phase ──
        // Inclusive thresholds pair each deceleration tick with one
        // acceleration tick, so the profile lands back on the floor speed.
        if regs.current_speed() > min_speed
            && self.current_step >= self.total_steps / 2
            && self.current_step >= self.total_steps - self.decel_steps
        {
            let speed = (regs.current_speed() - acceleration).max(min_speed);
            regs.set_current_speed(speed);
            self.accel_interval = clock_hz as f32 * self.step_ratio / speed;
        }

        // ── Tick rearm at the new period ──
        let reload = if self.accel_interval > INDEX_RELOAD_MAX {
            u16::MAX
        } else {
            self.accel_interval as u16
        };
        hal.rearm_index_timer(reload, tick_compare);

        // ── Emit one step into the shared target ──
        self.current_step += 1;
        regs.add_final_position(self.direction);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
