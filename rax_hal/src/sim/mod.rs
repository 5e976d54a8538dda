//! Simulation driver.
//!
//! Stands in for the controller board: the single-pulse step generator, the
//! direction and enable lines, the indexer tick timer, and a bank of
//! simulated scale channels. A requested pulse completes by the next
//! completion poll, which serializes emission at the sync tick rate exactly
//! like the one-pulse timer channel it models.
//!
//! Test and demo code drives the master axis through [`SimAxisDriver::feed_scale`].

pub mod scales;

use heapless::Vec;
use tracing::{debug, trace};

use rax_common::config::MotionConfig;
use rax_common::consts::SCALE_COUNT;
use rax_common::hal::{AxisDriver, HalError};

use scales::ScaleChannel;

/// Simulated single-pulse timer channel.
#[derive(Debug, Clone, Copy, Default)]
struct PulseChannel {
    reload: u16,
    compare: u16,
    in_flight: bool,
    emitted: u64,
}

/// Simulated axis hardware.
#[derive(Debug, Default)]
pub struct SimAxisDriver {
    pulse: PulseChannel,
    direction: bool,
    enabled: bool,
    index_reload: u16,
    index_compare: u16,
    scales: Vec<ScaleChannel, SCALE_COUNT>,
}

impl SimAxisDriver {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Simulation-side controls (not part of the driver contract) ──

    /// Feed encoder edges into a scale channel's hardware counter.
    pub fn feed_scale(&mut self, channel: usize, counts: i32) {
        self.scales[channel].feed(counts);
    }

    /// Total step pulses emitted since construction.
    pub const fn pulses_emitted(&self) -> u64 {
        self.pulse.emitted
    }

    /// Programmed pulse timing (reload, compare).
    pub const fn pulse_timing(&self) -> (u16, u16) {
        (self.pulse.reload, self.pulse.compare)
    }

    /// Programmed indexer timing (reload, compare).
    pub const fn index_timing(&self) -> (u16, u16) {
        (self.index_reload, self.index_compare)
    }

    /// Enable line level.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }
}

impl AxisDriver for SimAxisDriver {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn init(&mut self, config: &MotionConfig) -> Result<(), HalError> {
        if config.scale_channels > SCALE_COUNT {
            return Err(HalError::InitFailed(format!(
                "{} scale channels requested, bank holds {SCALE_COUNT}",
                config.scale_channels
            )));
        }
        self.scales.clear();
        for _ in 0..config.scale_channels {
            // Capacity checked above.
            let _ = self.scales.push(ScaleChannel::new());
        }
        self.index_reload = config.index_idle_reload;
        self.index_compare = config.index_tick_compare;
        debug!(
            channels = config.scale_channels,
            "simulation driver initialized"
        );
        Ok(())
    }

    fn set_pulse_timing(&mut self, reload: u16, compare: u16) {
        self.pulse.reload = reload;
        self.pulse.compare = compare;
    }

    fn request_pulse(&mut self) {
        if self.pulse.in_flight {
            // One-pulse channel still running: the request is dropped.
            trace!("pulse request dropped, channel busy");
            return;
        }
        self.pulse.in_flight = true;
    }

    fn pulse_busy(&self) -> bool {
        self.pulse.in_flight
    }

    fn take_pulse_complete(&mut self) -> bool {
        if self.pulse.in_flight {
            self.pulse.in_flight = false;
            self.pulse.emitted += 1;
            true
        } else {
            false
        }
    }

    fn set_direction(&mut self, forward: bool) {
        if self.direction != forward {
            trace!(forward, "direction line");
        }
        self.direction = forward;
    }

    fn direction(&self) -> bool {
        self.direction
    }

    fn set_enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn rearm_index_timer(&mut self, reload: u16, compare: u16) {
        self.index_reload = reload;
        self.index_compare = compare;
    }

    fn index_timer_reload(&self) -> u16 {
        self.index_reload
    }

    fn update_scales(&mut self) {
        for scale in self.scales.iter_mut() {
            scale.sample();
        }
    }

    fn scale_count(&self) -> usize {
        self.scales.len()
    }

    fn scale_position(&self, channel: usize) -> i32 {
        self.scales[channel].position()
    }

    fn preset_scale(&mut self, channel: usize, value: i32) -> Result<(), HalError> {
        let channels = self.scales.len();
        let scale = self
            .scales
            .get_mut(channel)
            .ok_or(HalError::BadChannel { channel, channels })?;
        scale.preset(value);
        trace!(channel, value, "scale preset");
        Ok(())
    }
}
