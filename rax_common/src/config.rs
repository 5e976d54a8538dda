//! Engine configuration loaded from TOML at startup.
//!
//! All fields use `#[serde(default)]` fed from [`crate::consts`], so an empty
//! file yields the stock controller. Immutable once the engine is built.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{
    CLOCK_HZ, DEFAULT_ACCELERATION, DEFAULT_MAX_SPEED, DEFAULT_MIN_SPEED, INDEX_IDLE_RELOAD,
    INDEX_TICK_COMPARE, PULSE_COMPARE, PULSE_RELOAD, SCALE_COUNT, SUPERVISOR_PERIOD_MS,
    SYNC_TICK_HZ,
};

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug)]
pub enum ConfigError {
    /// File I/O error.
    Io(String),
    /// TOML parse error.
    Parse(String),
    /// Parameter validation error.
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Validation(e) => write!(f, "config validation: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ─── Motion Config ──────────────────────────────────────────────────

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Timer/step clock frequency [Hz].
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,

    /// Synchronizer tick rate [Hz].
    #[serde(default = "default_sync_tick_hz")]
    pub sync_tick_hz: u32,

    /// Supervisor task period [ms].
    #[serde(default = "default_supervisor_period_ms")]
    pub supervisor_period_ms: u64,

    /// Single-pulse generator auto-reload [clock cycles].
    #[serde(default = "default_pulse_reload")]
    pub pulse_reload: u16,

    /// Single-pulse generator compare value [clock cycles].
    #[serde(default = "default_pulse_compare")]
    pub pulse_compare: u16,

    /// Indexer tick reload while idle [clock cycles].
    #[serde(default = "default_index_idle_reload")]
    pub index_idle_reload: u16,

    /// Indexer tick compare value [clock cycles].
    #[serde(default = "default_index_tick_compare")]
    pub index_tick_compare: u16,

    /// Number of master scale channels the driver provides.
    #[serde(default = "default_scale_channels")]
    pub scale_channels: usize,

    /// Profile parameters written into the register window at boot.
    #[serde(default)]
    pub profile: ProfileDefaults,
}

/// Trapezoidal profile boot defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDefaults {
    /// Ceiling speed [steps/s].
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    /// Floor speed [steps/s].
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
    /// Speed increment per index tick [steps/s].
    #[serde(default = "default_acceleration")]
    pub acceleration: f32,
}

fn default_clock_hz() -> u32 {
    CLOCK_HZ
}
fn default_sync_tick_hz() -> u32 {
    SYNC_TICK_HZ
}
fn default_supervisor_period_ms() -> u64 {
    SUPERVISOR_PERIOD_MS
}
fn default_pulse_reload() -> u16 {
    PULSE_RELOAD
}
fn default_pulse_compare() -> u16 {
    PULSE_COMPARE
}
fn default_index_idle_reload() -> u16 {
    INDEX_IDLE_RELOAD
}
fn default_index_tick_compare() -> u16 {
    INDEX_TICK_COMPARE
}
fn default_scale_channels() -> usize {
    SCALE_COUNT
}
fn default_max_speed() -> f32 {
    DEFAULT_MAX_SPEED
}
fn default_min_speed() -> f32 {
    DEFAULT_MIN_SPEED
}
fn default_acceleration() -> f32 {
    DEFAULT_ACCELERATION
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            max_speed: DEFAULT_MAX_SPEED,
            min_speed: DEFAULT_MIN_SPEED,
            acceleration: DEFAULT_ACCELERATION,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        // An empty TOML document deserializes to exactly this.
        Self {
            clock_hz: CLOCK_HZ,
            sync_tick_hz: SYNC_TICK_HZ,
            supervisor_period_ms: SUPERVISOR_PERIOD_MS,
            pulse_reload: PULSE_RELOAD,
            pulse_compare: PULSE_COMPARE,
            index_idle_reload: INDEX_IDLE_RELOAD,
            index_tick_compare: INDEX_TICK_COMPARE,
            scale_channels: SCALE_COUNT,
            profile: ProfileDefaults::default(),
        }
    }
}

impl MotionConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.clock_hz == 0 {
            return Err("clock_hz must be non-zero".into());
        }
        if self.sync_tick_hz == 0 || self.sync_tick_hz > self.clock_hz {
            return Err(format!(
                "sync_tick_hz {} out of range [1, {}]",
                self.sync_tick_hz, self.clock_hz
            ));
        }
        if self.supervisor_period_ms == 0 {
            return Err("supervisor_period_ms must be non-zero".into());
        }
        if self.pulse_compare == 0 || self.pulse_compare >= self.pulse_reload {
            return Err(format!(
                "pulse_compare {} must sit inside pulse_reload {}",
                self.pulse_compare, self.pulse_reload
            ));
        }
        if self.index_tick_compare >= self.index_idle_reload {
            return Err(format!(
                "index_tick_compare {} must sit inside index_idle_reload {}",
                self.index_tick_compare, self.index_idle_reload
            ));
        }
        if self.scale_channels == 0 || self.scale_channels > SCALE_COUNT {
            return Err(format!(
                "scale_channels {} out of range [1, {SCALE_COUNT}]",
                self.scale_channels
            ));
        }
        let p = &self.profile;
        if !p.max_speed.is_finite() || !p.min_speed.is_finite() || !p.acceleration.is_finite() {
            return Err("profile parameters must be finite".into());
        }
        if p.min_speed <= 0.0 || p.min_speed >= p.max_speed {
            return Err(format!(
                "min_speed {} must satisfy 0 < min_speed < max_speed {}",
                p.min_speed, p.max_speed
            ));
        }
        if p.acceleration <= 0.0 {
            return Err(format!("acceleration {} must be positive", p.acceleration));
        }
        Ok(())
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the engine configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MotionConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    load_config_from_str(&text)
}

/// Load config from a TOML string (also used by tests).
pub fn load_config_from_str(text: &str) -> Result<MotionConfig, ConfigError> {
    let config: MotionConfig =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
