//! RAX hardware backends.
//!
//! Currently ships the [`sim`] driver: a cycle-accurate stand-in for the
//! timer peripherals, GPIO lines, and quadrature scale counters of the real
//! controller board. Firmware ports implement
//! [`rax_common::hal::AxisDriver`] against their vendor peripherals.

pub mod sim;

pub use sim::SimAxisDriver;
