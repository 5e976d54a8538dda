//! Axis hardware driver trait and error types.
//!
//! The motion engine owns its hardware through this trait, enabling
//! pluggable backends (simulation, timer-peripheral firmware ports).
//! The trait covers the three timer roles and two level outputs of the
//! axis controller plus the master scale sampler.

use thiserror::Error;

use crate::config::MotionConfig;

/// Error types for driver operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed.
    #[error("initialization failed: {0}")]
    InitFailed(String),

    /// Scale channel outside the configured bank.
    #[error("scale channel {channel} out of range (have {channels})")]
    BadChannel {
        /// Requested channel.
        channel: usize,
        /// Channels the driver provides.
        channels: usize,
    },
}

/// Interface between the motion engine and the axis hardware.
///
/// # Lifecycle
///
/// 1. `init()` — once, before any tick source runs
/// 2. tick-path methods — from the engine's tick contexts
///
/// # Timing contracts
///
/// Every tick-path method must be constant-time and non-blocking; the
/// synchronizer calls into the driver at up to 50 kHz.
pub trait AxisDriver: Send {
    /// Driver identifier (e.g. "sim").
    fn name(&self) -> &'static str;

    /// Bring up timers, lines, and the scale bank.
    ///
    /// # Errors
    /// Returns [`HalError::InitFailed`] if the backend cannot satisfy the
    /// configuration.
    fn init(&mut self, config: &MotionConfig) -> Result<(), HalError>;

    // ── Single-pulse generator ──

    /// Program the pulse channel period and width [clock cycles].
    fn set_pulse_timing(&mut self, reload: u16, compare: u16);

    /// Arm one step pulse. Dropped if a pulse is already in flight;
    /// arbitration keeps that from happening.
    fn request_pulse(&mut self);

    /// A pulse is armed or being emitted.
    fn pulse_busy(&self) -> bool;

    /// Drain one pulse-completion event, if any. The engine polls this
    /// before anything else on a sync tick — completions outrank both
    /// tick sources.
    fn take_pulse_complete(&mut self) -> bool;

    // ── Level outputs ──

    /// Drive the direction line. High = positive direction.
    fn set_direction(&mut self, forward: bool);

    /// Sample the direction line.
    fn direction(&self) -> bool;

    /// Drive the motor-enable line. Asserted at boot, left asserted.
    fn set_enable(&mut self, enabled: bool);

    // ── Indexer tick timer ──

    /// Rewrite the indexer timer auto-reload and compare [clock cycles].
    fn rearm_index_timer(&mut self, reload: u16, compare: u16);

    /// Auto-reload currently programmed on the indexer timer.
    fn index_timer_reload(&self) -> u16;

    // ── Master scales ──

    /// Advance the sampler so `scale_position` reflects the hardware.
    fn update_scales(&mut self);

    /// Number of scale channels the driver provides.
    fn scale_count(&self) -> usize;

    /// Accumulated signed count of `channel`. The caller guarantees
    /// `channel < scale_count()`.
    fn scale_position(&self, channel: usize) -> i32;

    /// Set `channel` to `value` and clear any residual hardware delta so
    /// the next `update_scales` observes zero motion.
    ///
    /// # Errors
    /// Returns [`HalError::BadChannel`] for a channel outside the bank.
    fn preset_scale(&mut self, channel: usize, value: i32) -> Result<(), HalError>;
}
