//! Command/state mode register.
//!
//! The `mode` register is both the operator's command channel and the
//! engine's state report: the panel writes a request value, the supervisor
//! consumes it and writes back the resulting state. `#[repr(u16)]` matches
//! the 16-bit register it travels in.

use serde::{Deserialize, Serialize};

/// Axis command/state mode.
///
/// Written by the supervisor, by the synchronizer (bad-ratio transition
/// only), and by the fieldbus. Readers must accept stale values for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Mode {
    /// No motion source active; target chasing drains naturally.
    Halt = 0,
    /// Slaved to the master scale through the Bresenham interpolator.
    Synchro = 20,
    /// Request to (re)initialize synchronized motion.
    SynchroInit = 21,
    /// Jog placeholder — recognized, not acted upon.
    Jog = 30,
    /// Forward jog placeholder — recognized, not acted upon.
    JogForward = 31,
    /// Backward jog placeholder — recognized, not acted upon.
    JogBackward = 32,
    /// Request to preset a scale channel to an operator-supplied count.
    SetEncoder = 40,
    /// Synchro init rejected an out-of-range ratio. Terminal until the
    /// operator writes a new mode.
    SynchroBadRatio = 101,
}

impl Mode {
    /// Convert from the raw register value. Returns `None` for unknown values.
    #[inline]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Halt),
            20 => Some(Self::Synchro),
            21 => Some(Self::SynchroInit),
            30 => Some(Self::Jog),
            31 => Some(Self::JogForward),
            32 => Some(Self::JogBackward),
            40 => Some(Self::SetEncoder),
            101 => Some(Self::SynchroBadRatio),
            _ => None,
        }
    }

    /// Jog family check — all placeholders, none implemented.
    #[inline]
    pub const fn is_jog(&self) -> bool {
        matches!(self, Self::Jog | Self::JogForward | Self::JogBackward)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Halt
    }
}
