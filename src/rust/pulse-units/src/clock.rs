// SPDX-License-Identifier: Apache-2.0

//! Conversions between wall-clock units and generator clock cycles.
//!
//! The timing processor counts in cycles of the generator fabric clock.
//! All schedule offsets and pulse lengths are expressed in these cycles;
//! configuration values arrive in microseconds or nanoseconds and are
//! converted once, up front.

/// A duration or timestamp expressed in generator clock cycles.
pub type Cycles = i64;

/// Sampling clock and register geometry of one generator channel.
///
/// `freq_bits` is the width of the frequency register: a frequency `f`
/// maps to the register value `f / fs * 2^freq_bits`, so the register
/// spans exactly one Nyquist range of the sampling clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSpec {
    /// Fabric clock frequency in MHz.
    pub fs_mhz: f64,
    /// Width of the frequency register in bits.
    pub freq_bits: u32,
}

impl ClockSpec {
    pub fn us_to_cycles(&self, us: f64) -> Cycles {
        (us * self.fs_mhz).round() as Cycles
    }

    pub fn ns_to_cycles(&self, ns: f64) -> Cycles {
        self.us_to_cycles(ns / 1e3)
    }

    /// Microseconds to cycles without rounding, for quantities that
    /// stay fractional (e.g. an envelope standard deviation).
    pub fn us_to_cycles_frac(&self, us: f64) -> f64 {
        us * self.fs_mhz
    }

    pub fn cycles_to_us(&self, cycles: Cycles) -> f64 {
        cycles as f64 / self.fs_mhz
    }

    /// Frequency in MHz to frequency register value (round to nearest).
    pub fn freq_to_reg(&self, mhz: f64) -> i64 {
        let scale = 2f64.powi(self.freq_bits as i32);
        (mhz / self.fs_mhz * scale).round() as i64
    }

    /// Frequency register value back to MHz.
    pub fn reg_to_freq(&self, reg: i64) -> f64 {
        let scale = 2f64.powi(self.freq_bits as i32);
        reg as f64 / scale * self.fs_mhz
    }
}

pub fn floor_to_grid(value: i64, grid: i64) -> i64 {
    value - value % grid
}

pub fn ceil_to_grid(value: i64, grid: i64) -> i64 {
    value + (grid - (value % grid)) % grid
}
