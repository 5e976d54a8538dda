//! System-wide constants for the RAX workspace.
//!
//! Single source of truth for timing defaults and channel limits.
//! Imported by all crates — no duplication permitted.

/// Number of master scale channels mapped into the register window.
pub const SCALE_COUNT: usize = 4;

/// Timer/step clock frequency [Hz] used for all tick-period arithmetic.
pub const CLOCK_HZ: u32 = 1_000_000;

/// Nominal synchronizer tick rate [Hz].
pub const SYNC_TICK_HZ: u32 = 50_000;

/// Supervisor task period [ms].
pub const SUPERVISOR_PERIOD_MS: u64 = 50;

/// Single-pulse generator auto-reload [clock cycles].
pub const PULSE_RELOAD: u16 = 150;

/// Single-pulse generator compare value — half the reload, 50% width.
pub const PULSE_COMPARE: u16 = 75;

/// Indexer tick reload while idle [clock cycles] (100 Hz at 1 MHz).
pub const INDEX_IDLE_RELOAD: u16 = 10_000;

/// Indexer tick compare value [clock cycles].
pub const INDEX_TICK_COMPARE: u16 = 10;

/// Largest programmable indexer tick reload (16-bit auto-reload register).
pub const INDEX_RELOAD_MAX: f32 = 65_535.0;

/// Fieldbus slave unit id the register window is published under.
pub const FIELDBUS_UNIT_ID: u8 = 17;

/// Fieldbus inactivity timeout [ms].
pub const FIELDBUS_TIMEOUT_MS: u16 = 1000;

/// Boot default profile ceiling speed [steps/s].
pub const DEFAULT_MAX_SPEED: f32 = 10_000.0;

/// Boot default profile floor speed [steps/s].
pub const DEFAULT_MIN_SPEED: f32 = 100.0;

/// Boot default acceleration [steps/s per index tick].
pub const DEFAULT_ACCELERATION: f32 = 10.0;
