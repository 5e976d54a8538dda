//! # RAX Motion Engine
//!
//! Real-time core of a single-axis stepper controller that slaves the axis
//! to an external master scale through a rational ratio, with an operator
//! commanded trapezoidal index move overlaid on top. State is published
//! through the fieldbus register window in `rax_common`.
//!
//! ## Step Sources
//!
//! 1. **Synchronizer** — Bresenham interpolation of master counts into
//!    target steps, plus the shared drain path that emits physical pulses
//! 2. **Indexer** — finite trapezoidal move feeding the same target
//!
//! Both sources only ever advance the commanded target; the pulse generator
//! drains the target toward the physical position one pulse at a time, so
//! step emission is rate-limited by hardware and the sources compose
//! additively.
//!
//! ## Execution Contexts
//!
//! Pulse completion outranks the sync tick, which outranks the index tick;
//! the supervisor runs as a slow background task. Private subsystem state is
//! touched only by its owning tick, and every cross-context register lives
//! in the atomic window.

pub mod engine;
pub mod index;
pub mod runtime;
pub mod supervisor;
pub mod sync;
