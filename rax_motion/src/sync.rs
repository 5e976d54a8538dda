//! Encoder-synchronized step generation.
//!
//! Slaving master scale counts to slave steps is integer line rasterization
//! with slope `den/num`: per master count, a Bresenham error accumulator
//! decides whether the slave advances. The long-run ratio is exact with
//! error bounded by one step and no floating-point drift.
//!
//! Each tick runs two phases. Phase A drains any outstanding target by
//! setting the direction line and requesting a pulse — how much the master
//! moved is decoupled from how fast the generator can emit, so a burst of
//! master counts is never lost, only drained late. Phase B runs when the
//! target is fully drained and folds the master delta since the previous
//! tick into the target.

use rax_common::hal::AxisDriver;
use rax_common::mode::Mode;
use rax_common::registers::RegisterWindow;

/// Why synchronized-motion initialization refused to arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncInitRejection {
    /// Ratio outside `num > 0 ∧ den > 0 ∧ num ≥ den`.
    BadRatio,
    /// Selected master channel not present on the driver.
    BadScaleIndex,
}

/// Bresenham interpolator state, private to the sync tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Synchronizer {
    /// Master position at the previous tick.
    position_previous: i32,
    /// Master position at this tick.
    position_current: i32,
    /// Bresenham error accumulator.
    d: i32,
    /// Slave step unit applied per accepted master count.
    yi: i32,
    /// Sign of the last observed master motion.
    direction: i32,
    /// Ratio latched at initialization.
    ratio_num: i32,
    ratio_den: i32,
    /// Master channel latched at initialization.
    scale_index: usize,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign of the last observed master motion (−1, 0, +1).
    #[inline]
    pub const fn direction(&self) -> i32 {
        self.direction
    }

    /// Error accumulator, exposed for ratio diagnostics.
    #[inline]
    pub const fn error_accumulator(&self) -> i32 {
        self.d
    }

    /// Arm synchronized motion.
    ///
    /// Validates the ratio and master channel, seeds the interpolator,
    /// programs the pulse generator, and asserts `currentPosition =
    /// finalPosition` so any prior outstanding steps are discarded. The
    /// master snapshot is aligned to the current scale reading so the first
    /// tick in `SYNCHRO` sees zero delta.
    ///
    /// The ratio registers are latched here; rewriting them over the
    /// fieldbus takes effect only through a new `SYNCHRO_INIT`.
    ///
    /// The caller owns the resulting mode transition.
    pub fn initialize<D: AxisDriver>(
        &mut self,
        regs: &RegisterWindow,
        hal: &mut D,
        pulse_reload: u16,
        pulse_compare: u16,
    ) -> Result<(), SyncInitRejection> {
        let num = regs.syn_ratio_num();
        let den = regs.syn_ratio_den();
        if num <= 0 || den <= 0 || den > num {
            return Err(SyncInitRejection::BadRatio);
        }
        let scale_index = regs.syn_scale_index() as usize;
        if scale_index >= hal.scale_count() {
            return Err(SyncInitRejection::BadScaleIndex);
        }

        self.ratio_num = num;
        self.ratio_den = den;
        self.scale_index = scale_index;
        self.yi = 1;
        self.d = 2 * (den - num);
        self.direction = 0;
        self.position_current = hal.scale_position(scale_index);
        self.position_previous = self.position_current;

        hal.set_pulse_timing(pulse_reload, pulse_compare);
        regs.set_current_position(regs.final_position());
        Ok(())
    }

    /// One sync tick.
    pub fn tick<D: AxisDriver>(&mut self, regs: &RegisterWindow, hal: &mut D) {
        if regs.mode() != Some(Mode::Synchro) {
            return;
        }

        // ── Phase A: drain outstanding target ──
        let outstanding = regs.outstanding_steps();
        if outstanding != 0 {
            hal.set_direction(outstanding > 0);
            if !hal.pulse_busy() {
                hal.request_pulse();
            }
            return;
        }

        // ── Phase B: advance target from master delta ──
        self.position_previous = self.position_current;
        self.position_current = hal.scale_position(self.scale_index);
        let delta = self.position_current - self.position_previous;

        if delta > 0 {
            self.direction = 1;
            for _ in 0..delta {
                if self.d >= 0 {
                    regs.add_final_position(self.yi);
                    self.d += 2 * (self.ratio_den - self.ratio_num);
                } else {
                    self.d += 2 * self.ratio_den;
                }
            }
        } else if delta < 0 {
            self.direction = -1;
            // The accumulator holds D = 2·r − 2·(num − den) where r is the
            // master-count remainder mod num. Stepping down must undo
            // exactly the counts that stepped up (r < den), which puts the
            // reverse threshold at 2·(2·den − num); a retraced master path
            // then returns the target to its starting value exactly.
            let threshold = 2 * (2 * self.ratio_den - self.ratio_num);
            for _ in 0..-delta {
                if self.d < threshold {
                    regs.add_final_position(-self.yi);
                    self.d -= 2 * (self.ratio_den - self.ratio_num);
                } else {
                    self.d -= 2 * self.ratio_den;
                }
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
