//! The fieldbus register window.
//!
//! A fixed-layout, word-addressable register file shared between the motion
//! engine and the external fieldbus slave. The engine side uses typed
//! accessors over aligned atomics (all fields are 16 or 32 bit; aligned
//! loads/stores are atomic on the target class, and telemetry readers
//! tolerate staleness). The fieldbus side uses the explicit 16-bit word map
//! below — multi-word fields are little-endian, low word at the lower
//! address — with per-field write permissions: position, speed, and scale
//! telemetry cannot be overwritten from outside.
//!
//! Word layout (offsets in 16-bit words):
//!
//! | Word | Field |
//! |---|---|
//! | 0 | mode |
//! | 2–3 | currentPosition (ro) |
//! | 4–5 | finalPosition (ro) |
//! | 6 | indexDeltaSteps |
//! | 8–9 | reserved |
//! | 10 | encoderPresetIndex |
//! | 11–12 | encoderPresetValue |
//! | 14–15 | reserved |
//! | 16–17 | maxSpeed |
//! | 18–19 | minSpeed |
//! | 20–21 | currentSpeed (ro) |
//! | 22–23 | acceleration |
//! | 24–25 | stepRatioNum |
//! | 26–27 | stepRatioDen |
//! | 28–29 | reserved |
//! | 30–31 | synRatioNum |
//! | 32–33 | synRatioDen |
//! | 34–35 | synOffset (reserved) |
//! | 36 | synScaleIndex |
//! | 37.. | scalesPosition[SCALE_COUNT] (ro) |
//!
//! Words 1, 7, and 13 are padding: they read as zero and ignore writes.

use std::sync::atomic::{AtomicI32, AtomicU16, AtomicU32, Ordering::Relaxed};

use static_assertions::{const_assert, const_assert_eq};
use thiserror::Error;

use crate::consts::SCALE_COUNT;
use crate::mode::Mode;

// ─── Word Map ───────────────────────────────────────────────────────

pub const WORD_MODE: u16 = 0;
pub const WORD_CURRENT_POSITION: u16 = 2;
pub const WORD_FINAL_POSITION: u16 = 4;
pub const WORD_INDEX_DELTA_STEPS: u16 = 6;
pub const WORD_RESERVED_8: u16 = 8;
pub const WORD_ENCODER_PRESET_INDEX: u16 = 10;
pub const WORD_ENCODER_PRESET_VALUE: u16 = 11;
pub const WORD_RESERVED_14: u16 = 14;
pub const WORD_MAX_SPEED: u16 = 16;
pub const WORD_MIN_SPEED: u16 = 18;
pub const WORD_CURRENT_SPEED: u16 = 20;
pub const WORD_ACCELERATION: u16 = 22;
pub const WORD_STEP_RATIO_NUM: u16 = 24;
pub const WORD_STEP_RATIO_DEN: u16 = 26;
pub const WORD_RESERVED_28: u16 = 28;
pub const WORD_SYN_RATIO_NUM: u16 = 30;
pub const WORD_SYN_RATIO_DEN: u16 = 32;
pub const WORD_SYN_OFFSET: u16 = 34;
pub const WORD_SYN_SCALE_INDEX: u16 = 36;
pub const WORD_SCALES_POSITION: u16 = 37;

/// Total window size in 16-bit words.
pub const WINDOW_WORDS: u16 = WORD_SCALES_POSITION + 2 * SCALE_COUNT as u16;

const_assert_eq!(WINDOW_WORDS, 45);
const_assert!(WORD_SYN_SCALE_INDEX < WORD_SCALES_POSITION);
const_assert_eq!(WORD_ENCODER_PRESET_VALUE, WORD_ENCODER_PRESET_INDEX + 1);

// ─── Errors ─────────────────────────────────────────────────────────

/// Fieldbus-side register access failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterAccessError {
    /// Word address outside the window.
    #[error("register word {0} is outside the window (size {WINDOW_WORDS})")]
    OutOfRange(u16),
    /// Field is owned by the engine and cannot be written from the fieldbus.
    #[error("register word {0} is read-only from the fieldbus")]
    ReadOnly(u16),
}

// ─── Register Window ────────────────────────────────────────────────

/// The register window itself. Lives for the process; shared by reference
/// between the engine contexts and the fieldbus driver.
#[derive(Debug, Default)]
pub struct RegisterWindow {
    mode: AtomicU16,
    current_position: AtomicI32,
    final_position: AtomicI32,
    index_delta_steps: AtomicU16,
    reserved_8: AtomicI32,
    encoder_preset_index: AtomicU16,
    encoder_preset_value: AtomicI32,
    reserved_14: AtomicI32,
    max_speed: AtomicU32,
    min_speed: AtomicU32,
    current_speed: AtomicU32,
    acceleration: AtomicU32,
    step_ratio_num: AtomicI32,
    step_ratio_den: AtomicI32,
    reserved_28: AtomicU32,
    syn_ratio_num: AtomicI32,
    syn_ratio_den: AtomicI32,
    syn_offset: AtomicI32,
    syn_scale_index: AtomicU16,
    scales_position: [AtomicI32; SCALE_COUNT],
}

impl RegisterWindow {
    pub fn new() -> Self {
        Self::default()
    }

    // ── mode ──

    #[inline]
    pub fn mode_raw(&self) -> u16 {
        self.mode.load(Relaxed)
    }

    /// Decoded mode; `None` while the register holds an unknown value.
    #[inline]
    pub fn mode(&self) -> Option<Mode> {
        Mode::from_u16(self.mode_raw())
    }

    #[inline]
    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u16, Relaxed);
    }

    // ── positions ──

    #[inline]
    pub fn current_position(&self) -> i32 {
        self.current_position.load(Relaxed)
    }

    /// Pulse-completion accounting: ±1 per completed pulse.
    #[inline]
    pub fn add_current_position(&self, delta: i32) {
        self.current_position.fetch_add(delta, Relaxed);
    }

    #[inline]
    pub fn set_current_position(&self, value: i32) {
        self.current_position.store(value, Relaxed);
    }

    #[inline]
    pub fn final_position(&self) -> i32 {
        self.final_position.load(Relaxed)
    }

    /// Target advance — a single aligned store per direction unit, so a
    /// preempting reader never observes a partial increment.
    #[inline]
    pub fn add_final_position(&self, delta: i32) {
        self.final_position.fetch_add(delta, Relaxed);
    }

    #[inline]
    pub fn set_final_position(&self, value: i32) {
        self.final_position.store(value, Relaxed);
    }

    /// Outstanding commanded step count.
    #[inline]
    pub fn outstanding_steps(&self) -> i32 {
        self.final_position().wrapping_sub(self.current_position())
    }

    // ── index request ──

    #[inline]
    pub fn index_delta_steps(&self) -> i16 {
        self.index_delta_steps.load(Relaxed) as i16
    }

    /// Operator-side request write.
    #[inline]
    pub fn set_index_delta_steps(&self, steps: i16) {
        self.index_delta_steps.store(steps as u16, Relaxed);
    }

    /// Indexer acceptance handshake: atomically claim the pending request,
    /// leaving zero behind for the operator to observe.
    #[inline]
    pub fn take_index_delta_steps(&self) -> i16 {
        self.index_delta_steps.swap(0, Relaxed) as i16
    }

    // ── encoder preset command ──

    #[inline]
    pub fn encoder_preset_index(&self) -> u16 {
        self.encoder_preset_index.load(Relaxed)
    }

    #[inline]
    pub fn set_encoder_preset_index(&self, index: u16) {
        self.encoder_preset_index.store(index, Relaxed);
    }

    #[inline]
    pub fn encoder_preset_value(&self) -> i32 {
        self.encoder_preset_value.load(Relaxed)
    }

    #[inline]
    pub fn set_encoder_preset_value(&self, value: i32) {
        self.encoder_preset_value.store(value, Relaxed);
    }

    // ── trapezoidal profile parameters ──

    #[inline]
    pub fn max_speed(&self) -> f32 {
        f32::from_bits(self.max_speed.load(Relaxed))
    }

    #[inline]
    pub fn set_max_speed(&self, value: f32) {
        self.max_speed.store(value.to_bits(), Relaxed);
    }

    #[inline]
    pub fn min_speed(&self) -> f32 {
        f32::from_bits(self.min_speed.load(Relaxed))
    }

    #[inline]
    pub fn set_min_speed(&self, value: f32) {
        self.min_speed.store(value.to_bits(), Relaxed);
    }

    #[inline]
    pub fn current_speed(&self) -> f32 {
        f32::from_bits(self.current_speed.load(Relaxed))
    }

    #[inline]
    pub fn set_current_speed(&self, value: f32) {
        self.current_speed.store(value.to_bits(), Relaxed);
    }

    #[inline]
    pub fn acceleration(&self) -> f32 {
        f32::from_bits(self.acceleration.load(Relaxed))
    }

    #[inline]
    pub fn set_acceleration(&self, value: f32) {
        self.acceleration.store(value.to_bits(), Relaxed);
    }

    // ── ratios ──

    #[inline]
    pub fn step_ratio_num(&self) -> i32 {
        self.step_ratio_num.load(Relaxed)
    }

    #[inline]
    pub fn set_step_ratio_num(&self, value: i32) {
        self.step_ratio_num.store(value, Relaxed);
    }

    #[inline]
    pub fn step_ratio_den(&self) -> i32 {
        self.step_ratio_den.load(Relaxed)
    }

    #[inline]
    pub fn set_step_ratio_den(&self, value: i32) {
        self.step_ratio_den.store(value, Relaxed);
    }

    #[inline]
    pub fn syn_ratio_num(&self) -> i32 {
        self.syn_ratio_num.load(Relaxed)
    }

    #[inline]
    pub fn set_syn_ratio_num(&self, value: i32) {
        self.syn_ratio_num.store(value, Relaxed);
    }

    #[inline]
    pub fn syn_ratio_den(&self) -> i32 {
        self.syn_ratio_den.load(Relaxed)
    }

    #[inline]
    pub fn set_syn_ratio_den(&self, value: i32) {
        self.syn_ratio_den.store(value, Relaxed);
    }

    // ── sync source selection ──

    #[inline]
    pub fn syn_scale_index(&self) -> u16 {
        self.syn_scale_index.load(Relaxed)
    }

    #[inline]
    pub fn set_syn_scale_index(&self, index: u16) {
        self.syn_scale_index.store(index, Relaxed);
    }

    // ── telemetry ──

    /// Scale telemetry read. `channel` must be below [`SCALE_COUNT`].
    #[inline]
    pub fn scales_position(&self, channel: usize) -> i32 {
        self.scales_position[channel].load(Relaxed)
    }

    /// Scale telemetry refresh, supervisor only.
    #[inline]
    pub fn set_scales_position(&self, channel: usize, value: i32) {
        self.scales_position[channel].store(value, Relaxed);
    }

    // ─── Fieldbus Word Access ───────────────────────────────────────

    /// Word-granular read for the fieldbus slave.
    pub fn read_word(&self, addr: u16) -> Result<u16, RegisterAccessError> {
        if addr >= WINDOW_WORDS {
            return Err(RegisterAccessError::OutOfRange(addr));
        }
        let word = match addr {
            WORD_MODE => self.mode.load(Relaxed),
            WORD_CURRENT_POSITION => lo32(self.current_position.load(Relaxed) as u32),
            w if w == WORD_CURRENT_POSITION + 1 => {
                hi32(self.current_position.load(Relaxed) as u32)
            }
            WORD_FINAL_POSITION => lo32(self.final_position.load(Relaxed) as u32),
            w if w == WORD_FINAL_POSITION + 1 => hi32(self.final_position.load(Relaxed) as u32),
            WORD_INDEX_DELTA_STEPS => self.index_delta_steps.load(Relaxed),
            WORD_RESERVED_8 => lo32(self.reserved_8.load(Relaxed) as u32),
            w if w == WORD_RESERVED_8 + 1 => hi32(self.reserved_8.load(Relaxed) as u32),
            WORD_ENCODER_PRESET_INDEX => self.encoder_preset_index.load(Relaxed),
            WORD_ENCODER_PRESET_VALUE => lo32(self.encoder_preset_value.load(Relaxed) as u32),
            w if w == WORD_ENCODER_PRESET_VALUE + 1 => {
                hi32(self.encoder_preset_value.load(Relaxed) as u32)
            }
            WORD_RESERVED_14 => lo32(self.reserved_14.load(Relaxed) as u32),
            w if w == WORD_RESERVED_14 + 1 => hi32(self.reserved_14.load(Relaxed) as u32),
            WORD_MAX_SPEED => lo32(self.max_speed.load(Relaxed)),
            w if w == WORD_MAX_SPEED + 1 => hi32(self.max_speed.load(Relaxed)),
            WORD_MIN_SPEED => lo32(self.min_speed.load(Relaxed)),
            w if w == WORD_MIN_SPEED + 1 => hi32(self.min_speed.load(Relaxed)),
            WORD_CURRENT_SPEED => lo32(self.current_speed.load(Relaxed)),
            w if w == WORD_CURRENT_SPEED + 1 => hi32(self.current_speed.load(Relaxed)),
            WORD_ACCELERATION => lo32(self.acceleration.load(Relaxed)),
            w if w == WORD_ACCELERATION + 1 => hi32(self.acceleration.load(Relaxed)),
            WORD_STEP_RATIO_NUM => lo32(self.step_ratio_num.load(Relaxed) as u32),
            w if w == WORD_STEP_RATIO_NUM + 1 => hi32(self.step_ratio_num.load(Relaxed) as u32),
            WORD_STEP_RATIO_DEN => lo32(self.step_ratio_den.load(Relaxed) as u32),
            w if w == WORD_STEP_RATIO_DEN + 1 => hi32(self.step_ratio_den.load(Relaxed) as u32),
            WORD_RESERVED_28 => lo32(self.reserved_28.load(Relaxed)),
            w if w == WORD_RESERVED_28 + 1 => hi32(self.reserved_28.load(Relaxed)),
            WORD_SYN_RATIO_NUM => lo32(self.syn_ratio_num.load(Relaxed) as u32),
            w if w == WORD_SYN_RATIO_NUM + 1 => hi32(self.syn_ratio_num.load(Relaxed) as u32),
            WORD_SYN_RATIO_DEN => lo32(self.syn_ratio_den.load(Relaxed) as u32),
            w if w == WORD_SYN_RATIO_DEN + 1 => hi32(self.syn_ratio_den.load(Relaxed) as u32),
            WORD_SYN_OFFSET => lo32(self.syn_offset.load(Relaxed) as u32),
            w if w == WORD_SYN_OFFSET + 1 => hi32(self.syn_offset.load(Relaxed) as u32),
            WORD_SYN_SCALE_INDEX => self.syn_scale_index.load(Relaxed),
            w if w >= WORD_SCALES_POSITION => {
                let rel = (w - WORD_SCALES_POSITION) as usize;
                let value = self.scales_position[rel / 2].load(Relaxed) as u32;
                if rel % 2 == 0 { lo32(value) } else { hi32(value) }
            }
            // Padding words 1, 7, 13.
            _ => 0,
        };
        Ok(word)
    }

    /// Word-granular write for the fieldbus slave.
    ///
    /// Engine-owned telemetry (`currentPosition`, `finalPosition`,
    /// `currentSpeed`, `scalesPosition[]`) is rejected with
    /// [`RegisterAccessError::ReadOnly`]. Padding words accept and discard
    /// the value.
    pub fn write_word(&self, addr: u16, value: u16) -> Result<(), RegisterAccessError> {
        if addr >= WINDOW_WORDS {
            return Err(RegisterAccessError::OutOfRange(addr));
        }
        match addr {
            WORD_MODE => self.mode.store(value, Relaxed),
            w if w == WORD_CURRENT_POSITION || w == WORD_CURRENT_POSITION + 1 => {
                return Err(RegisterAccessError::ReadOnly(addr));
            }
            w if w == WORD_FINAL_POSITION || w == WORD_FINAL_POSITION + 1 => {
                return Err(RegisterAccessError::ReadOnly(addr));
            }
            WORD_INDEX_DELTA_STEPS => self.index_delta_steps.store(value, Relaxed),
            WORD_RESERVED_8 => store_lo_i32(&self.reserved_8, value),
            w if w == WORD_RESERVED_8 + 1 => store_hi_i32(&self.reserved_8, value),
            WORD_ENCODER_PRESET_INDEX => self.encoder_preset_index.store(value, Relaxed),
            WORD_ENCODER_PRESET_VALUE => store_lo_i32(&self.encoder_preset_value, value),
            w if w == WORD_ENCODER_PRESET_VALUE + 1 => {
                store_hi_i32(&self.encoder_preset_value, value)
            }
            WORD_RESERVED_14 => store_lo_i32(&self.reserved_14, value),
            w if w == WORD_RESERVED_14 + 1 => store_hi_i32(&self.reserved_14, value),
            WORD_MAX_SPEED => store_lo_u32(&self.max_speed, value),
            w if w == WORD_MAX_SPEED + 1 => store_hi_u32(&self.max_speed, value),
            WORD_MIN_SPEED => store_lo_u32(&self.min_speed, value),
            w if w == WORD_MIN_SPEED + 1 => store_hi_u32(&self.min_speed, value),
            w if w == WORD_CURRENT_SPEED || w == WORD_CURRENT_SPEED + 1 => {
                return Err(RegisterAccessError::ReadOnly(addr));
            }
            WORD_ACCELERATION => store_lo_u32(&self.acceleration, value),
            w if w == WORD_ACCELERATION + 1 => store_hi_u32(&self.acceleration, value),
            WORD_STEP_RATIO_NUM => store_lo_i32(&self.step_ratio_num, value),
            w if w == WORD_STEP_RATIO_NUM + 1 => store_hi_i32(&self.step_ratio_num, value),
            WORD_STEP_RATIO_DEN => store_lo_i32(&self.step_ratio_den, value),
            w if w == WORD_STEP_RATIO_DEN + 1 => store_hi_i32(&self.step_ratio_den, value),
            WORD_RESERVED_28 => store_lo_u32(&self.reserved_28, value),
            w if w == WORD_RESERVED_28 + 1 => store_hi_u32(&self.reserved_28, value),
            WORD_SYN_RATIO_NUM => store_lo_i32(&self.syn_ratio_num, value),
            w if w == WORD_SYN_RATIO_NUM + 1 => store_hi_i32(&self.syn_ratio_num, value),
            WORD_SYN_RATIO_DEN => store_lo_i32(&self.syn_ratio_den, value),
            w if w == WORD_SYN_RATIO_DEN + 1 => store_hi_i32(&self.syn_ratio_den, value),
            WORD_SYN_OFFSET => store_lo_i32(&self.syn_offset, value),
            w if w == WORD_SYN_OFFSET + 1 => store_hi_i32(&self.syn_offset, value),
            WORD_SYN_SCALE_INDEX => self.syn_scale_index.store(value, Relaxed),
            w if w >= WORD_SCALES_POSITION => {
                return Err(RegisterAccessError::ReadOnly(addr));
            }
            // Padding words 1, 7, 13: accepted, discarded.
            _ => {}
        }
        Ok(())
    }
}

// ─── Word Helpers ───────────────────────────────────────────────────

#[inline]
const fn lo32(value: u32) -> u16 {
    (value & 0xFFFF) as u16
}

#[inline]
const fn hi32(value: u32) -> u16 {
    (value >> 16) as u16
}

/// Replace the low word of a 32-bit field. The fieldbus is the only word
/// writer of operator fields, so plain read-modify-write suffices.
#[inline]
fn store_lo_i32(field: &AtomicI32, word: u16) {
    let old = field.load(Relaxed) as u32;
    field.store(((old & 0xFFFF_0000) | word as u32) as i32, Relaxed);
}

#[inline]
fn store_hi_i32(field: &AtomicI32, word: u16) {
    let old = field.load(Relaxed) as u32;
    field.store(((old & 0x0000_FFFF) | ((word as u32) << 16)) as i32, Relaxed);
}

#[inline]
fn store_lo_u32(field: &AtomicU32, word: u16) {
    let old = field.load(Relaxed);
    field.store((old & 0xFFFF_0000) | word as u32, Relaxed);
}

#[inline]
fn store_hi_u32(field: &AtomicU32, word: u16) {
    let old = field.load(Relaxed);
    field.store((old & 0x0000_FFFF) | ((word as u32) << 16), Relaxed);
}

// ─── Tests ──────────────────────────────────────────────────────────
