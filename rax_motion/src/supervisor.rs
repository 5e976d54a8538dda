//! Mode supervisor — the slow background task.
//!
//! Translates command-mode requests from the operator into initialized
//! subsystem state and back, and refreshes the scale telemetry block. Runs
//! cooperatively at tens of milliseconds; everything latency-sensitive
//! lives in the tick paths.

use tracing::{info, warn};

use rax_common::config::MotionConfig;
use rax_common::hal::AxisDriver;
use rax_common::mode::Mode;
use rax_common::registers::RegisterWindow;

use crate::sync::{SyncInitRejection, Synchronizer};

/// One supervisor cycle.
pub fn run_cycle<D: AxisDriver>(
    regs: &RegisterWindow,
    hal: &mut D,
    sync: &mut Synchronizer,
    config: &MotionConfig,
) {
    // Refresh scale telemetry for the operator panel.
    for channel in 0..hal.scale_count() {
        regs.set_scales_position(channel, hal.scale_position(channel));
    }

    match regs.mode() {
        Some(Mode::SynchroInit) => {
            match sync.initialize(regs, hal, config.pulse_reload, config.pulse_compare) {
                Ok(()) => {
                    regs.set_mode(Mode::Synchro);
                    info!(
                        num = regs.syn_ratio_num(),
                        den = regs.syn_ratio_den(),
                        channel = regs.syn_scale_index(),
                        "synchronized motion armed"
                    );
                }
                Err(SyncInitRejection::BadRatio) => {
                    regs.set_mode(Mode::SynchroBadRatio);
                    warn!(
                        num = regs.syn_ratio_num(),
                        den = regs.syn_ratio_den(),
                        "sync ratio rejected"
                    );
                }
                Err(SyncInitRejection::BadScaleIndex) => {
                    regs.set_mode(Mode::Halt);
                    warn!(
                        channel = regs.syn_scale_index(),
                        channels = hal.scale_count(),
                        "sync scale channel rejected"
                    );
                }
            }
        }
        Some(Mode::SetEncoder) => {
            let channel = regs.encoder_preset_index() as usize;
            let value = regs.encoder_preset_value();
            match hal.preset_scale(channel, value) {
                Ok(()) => {
                    regs.set_scales_position(channel, value);
                    info!(channel, value, "scale preset");
                }
                Err(e) => warn!(error = %e, "scale preset rejected"),
            }
            regs.set_mode(Mode::Halt);
        }
        // HALT, SYNCHRO, the jog placeholders, the bad-ratio latch, and
        // unknown register values: nothing to do here.
        _ => {}
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
