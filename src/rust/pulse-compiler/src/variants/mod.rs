// SPDX-License-Identifier: Apache-2.0

//! Protocol variants.
//!
//! Each variant is a pure composition of the shared primitives — a
//! typed configuration plus a function from that configuration to a
//! compiled [`crate::program::Program`]. The variants differ only in
//! which pulses, sweep axis and timeline shape they compose.

pub mod decoupling_sweep;
pub mod envelope_sweep;
pub mod power_sweep;
pub mod spectrum_sweep;

pub use decoupling_sweep::{DecouplingSweepConfig, build_decoupling_sweep};
pub use envelope_sweep::{EnvelopeSweepConfig, build_envelope_sweep};
pub use power_sweep::{PowerSweepConfig, build_power_sweep};
pub use spectrum_sweep::{SpectrumSweepConfig, build_spectrum_sweep};
