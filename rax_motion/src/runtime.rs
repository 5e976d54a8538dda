//! Deterministic runtime: paced loop, cycle statistics, RT setup.
//!
//! The loop is paced at the synchronizer tick rate. The indexer tick is
//! derived from the auto-reload value the indexer itself programs, and the
//! supervisor fires on its slow period — one loop multiplexing the three
//! timekeeping contexts, highest rate first.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)` — lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` — pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO)` — RT priority.
//!
//! All RT calls are no-ops without the `rt` feature, so the same binary
//! shape runs on a development host.

use rax_common::hal::AxisDriver;

use crate::engine::MotionEngine;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that exceeded the budget. The engine is best-effort real
    /// time: overruns are counted, never fatal.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }

    /// Average cycle time [ns] (0 before the first cycle).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup.
#[derive(Debug)]
pub enum RuntimeError {
    /// RT system call failed.
    RtSetup(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RtSetup(msg) => write!(f, "RT setup error: {msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), RuntimeError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| RuntimeError::RtSetup(format!("mlockall failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), RuntimeError> {
    Ok(()) // No-op in simulation mode
}

/// Prefault stack pages so the paced loop never page-faults.
fn prefault_stack() {
    let mut buf = [0u8; 1024 * 1024];
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a specific CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), RuntimeError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| RuntimeError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| RuntimeError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), RuntimeError> {
    Ok(()) // No-op in simulation mode
}

/// Set SCHED_FIFO with the given RT priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), RuntimeError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(RuntimeError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), RuntimeError> {
    Ok(()) // No-op in simulation mode
}

/// Perform the full RT setup sequence. Must run before the paced loop.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), RuntimeError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Paced Loop ─────────────────────────────────────────────────────

/// The paced runtime over a built engine.
pub struct EngineRuntime<D: AxisDriver> {
    engine: MotionEngine<D>,
    stats: CycleStats,
    /// Sync cycle period [ns].
    cycle_ns: i64,
    /// Time until the next indexer tick [ns].
    index_countdown_ns: i64,
    /// Time until the next supervisor cycle [ns].
    supervisor_countdown_ns: i64,
}

impl<D: AxisDriver> EngineRuntime<D> {
    pub fn new(engine: MotionEngine<D>) -> Self {
        let config = engine.config();
        let cycle_ns = 1_000_000_000i64 / i64::from(config.sync_tick_hz);
        let index_countdown_ns =
            reload_ns(engine.hal().index_timer_reload(), config.clock_hz);
        let supervisor_countdown_ns = config.supervisor_period_ms as i64 * 1_000_000;
        Self {
            engine,
            stats: CycleStats::new(),
            cycle_ns,
            index_countdown_ns,
            supervisor_countdown_ns,
        }
    }

    pub fn engine(&self) -> &MotionEngine<D> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MotionEngine<D> {
        &mut self.engine
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// One multiplexed cycle: sync tick always, indexer and supervisor when
    /// their countdowns expire. An indexer period shorter than the sync
    /// cycle fires once per cycle — the tick is rate-limited, never queued.
    pub fn step(&mut self) {
        self.engine.tick_sync();

        self.index_countdown_ns -= self.cycle_ns;
        if self.index_countdown_ns <= 0 {
            self.engine.tick_index();
            self.index_countdown_ns = reload_ns(
                self.engine.hal().index_timer_reload(),
                self.engine.config().clock_hz,
            );
        }

        self.supervisor_countdown_ns -= self.cycle_ns;
        if self.supervisor_countdown_ns <= 0 {
            self.engine.tick_supervisor();
            self.supervisor_countdown_ns =
                self.engine.config().supervisor_period_ms as i64 * 1_000_000;
        }
    }

    /// Enter the paced loop. Does not return under normal operation.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        #[cfg(feature = "rt")]
        {
            self.run_rt_loop()
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop()
        }
    }

    /// RT loop: absolute-time sleep on `CLOCK_MONOTONIC` for drift-free
    /// pacing.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self) -> Result<(), RuntimeError> {
        use nix::time::{ClockId, clock_gettime};

        let clock = ClockId::CLOCK_MONOTONIC;
        let mut next_wake = clock_gettime(clock)
            .map_err(|e| RuntimeError::RtSetup(format!("clock_gettime: {e}")))?;

        loop {
            next_wake = timespec_add_ns(next_wake, self.cycle_ns);

            let cycle_start = clock_gettime(clock)
                .map_err(|e| RuntimeError::RtSetup(format!("clock_gettime: {e}")))?;
            self.step();
            let cycle_end = clock_gettime(clock)
                .map_err(|e| RuntimeError::RtSetup(format!("clock_gettime: {e}")))?;

            self.stats
                .record(timespec_diff_ns(&cycle_end, &cycle_start), self.cycle_ns);

            let _ = clock_nanosleep_until(clock, &next_wake);
        }
    }

    /// Simulation loop: relative sleep, approximate pacing.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self) -> Result<(), RuntimeError> {
        use std::time::{Duration, Instant};

        let cycle_duration = Duration::from_nanos(self.cycle_ns as u64);

        loop {
            let cycle_start = Instant::now();
            self.step();
            let elapsed = cycle_start.elapsed();

            self.stats.record(elapsed.as_nanos() as i64, self.cycle_ns);

            if let Some(remaining) = cycle_duration.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }
}

/// Nanoseconds a timer reload value spans at the given clock.
#[inline]
fn reload_ns(reload: u16, clock_hz: u32) -> i64 {
    i64::from(reload) * 1_000_000_000 / i64::from(clock_hz)
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

#[cfg(feature = "rt")]
fn clock_nanosleep_until(
    clock: nix::time::ClockId,
    deadline: &nix::sys::time::TimeSpec,
) -> nix::Result<()> {
    use nix::time::{ClockNanosleepFlags, clock_nanosleep};
    clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, deadline).map(|_| ())
}

// ─── Tests ──────────────────────────────────────────────────────────
