//! The motion engine: single owner of the register window and the axis
//! hardware.
//!
//! All mutation funnels through the engine's four entry points, one per
//! execution context:
//!
//! | Entry point | Context | Rate |
//! |---|---|---|
//! | pulse-completion drain (inside `tick_sync`) | highest | per pulse |
//! | [`MotionEngine::tick_sync`] | high | ~50 kHz |
//! | [`MotionEngine::tick_index`] | medium | ≤10 kHz, self-paced |
//! | [`MotionEngine::tick_supervisor`] | background | ~20 Hz |
//!
//! The fieldbus reaches the same window through its word map; it is never
//! given the engine.

use rax_common::config::MotionConfig;
use rax_common::hal::{AxisDriver, HalError};
use rax_common::registers::RegisterWindow;

use crate::index::Indexer;
use crate::supervisor;
use crate::sync::Synchronizer;

/// Engine over a hardware backend `D`.
pub struct MotionEngine<D: AxisDriver> {
    regs: RegisterWindow,
    hal: D,
    sync: Synchronizer,
    index: Indexer,
    config: MotionConfig,
}

impl<D: AxisDriver> MotionEngine<D> {
    /// Build the engine: bring up the driver, assert the motor-enable line,
    /// and publish the profile boot defaults into the register window.
    pub fn new(config: MotionConfig, mut hal: D) -> Result<Self, HalError> {
        hal.init(&config)?;
        hal.set_enable(true);
        hal.rearm_index_timer(config.index_idle_reload, config.index_tick_compare);

        let regs = RegisterWindow::new();
        regs.set_max_speed(config.profile.max_speed);
        regs.set_min_speed(config.profile.min_speed);
        regs.set_acceleration(config.profile.acceleration);

        Ok(Self {
            regs,
            hal,
            sync: Synchronizer::new(),
            index: Indexer::new(),
            config,
        })
    }

    /// The register window, as the fieldbus driver sees it.
    pub fn registers(&self) -> &RegisterWindow {
        &self.regs
    }

    pub fn hal(&self) -> &D {
        &self.hal
    }

    /// Simulation and test access to the backend.
    pub fn hal_mut(&mut self) -> &mut D {
        &mut self.hal
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn indexer(&self) -> &Indexer {
        &self.index
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    /// Sync tick. Drains pulse completions first — the completion context
    /// outranks everything — then samples the scales and runs the
    /// synchronizer.
    pub fn tick_sync(&mut self) {
        while self.hal.take_pulse_complete() {
            let step = if self.hal.direction() { 1 } else { -1 };
            self.regs.add_current_position(step);
        }
        self.hal.update_scales();
        self.sync.tick(&self.regs, &mut self.hal);
    }

    /// Index tick, from the self-paced indexer timer.
    pub fn tick_index(&mut self) {
        self.index.tick(
            &self.regs,
            &mut self.hal,
            self.config.clock_hz,
            self.config.index_idle_reload,
            self.config.index_tick_compare,
        );
    }

    /// Supervisor cycle, from the background task.
    pub fn tick_supervisor(&mut self) {
        supervisor::run_cycle(&self.regs, &mut self.hal, &mut self.sync, &self.config);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
