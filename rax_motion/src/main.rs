//! # RAX Motion Engine
//!
//! Stepper-axis controller binary: loads the TOML configuration, brings up
//! the hardware backend, and enters the paced motion loop. The operator
//! panel talks to the running engine through the fieldbus register window.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use rax_common::config::{MotionConfig, load_config};
use rax_common::consts::{FIELDBUS_TIMEOUT_MS, FIELDBUS_UNIT_ID};
use rax_common::hal::AxisDriver;
use rax_hal::SimAxisDriver;
use rax_motion::engine::MotionEngine;
use rax_motion::runtime::{EngineRuntime, rt_setup};

#[derive(Parser, Debug)]
#[command(name = "rax_motion", about = "RAX single-axis stepper controller")]
struct Args {
    /// Path to the engine configuration TOML. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CPU core to pin the motion loop to (rt builds).
    #[arg(long, default_value_t = 0)]
    cpu_core: usize,

    /// SCHED_FIFO priority for the motion loop (rt builds).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MotionConfig::default(),
    };

    let hal = SimAxisDriver::new();
    let engine = MotionEngine::new(config, hal)?;
    info!(
        driver = engine.hal().name(),
        sync_tick_hz = engine.config().sync_tick_hz,
        unit_id = FIELDBUS_UNIT_ID,
        bus_timeout_ms = FIELDBUS_TIMEOUT_MS,
        "axis controller starting"
    );

    rt_setup(args.cpu_core, args.rt_priority)?;

    let mut runtime = EngineRuntime::new(engine);
    runtime.run()?;
    Ok(())
}
