// SPDX-License-Identifier: Apache-2.0

//! Fixed-point phase register values.
//!
//! The generator's phase register divides one full turn into `2^32`
//! units. Conversion from degrees truncates to the register grid, the
//! same policy the firmware applies; arithmetic wraps modulo one turn.

use std::num::Wrapping;
use std::ops::{Add, Sub};

use num_traits::{AsPrimitive, Float, FromPrimitive};

const PHASE_BITS: u32 = 32;

/// A phase expressed in device register units on a wrapping
/// `2^32`-per-turn grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PhaseReg(Wrapping<u32>);

impl PhaseReg {
    fn period<F: Float + FromPrimitive>() -> F {
        F::from_u64(1u64 << PHASE_BITS).unwrap()
    }

    /// Wrap the value into [0, 1) turns.
    fn normalize<F: Float>(turns: F) -> F {
        let frac = turns.fract();
        if frac < F::zero() { frac + F::one() } else { frac }
    }

    /// Creates a phase register value from degrees. Values outside
    /// [0, 360) wrap; fractional register units truncate.
    pub fn from_degrees<F>(degrees: F) -> Self
    where
        F: Float + AsPrimitive<u32> + FromPrimitive,
    {
        let turns = Self::normalize(degrees / F::from_u16(360).unwrap());
        let scaled = (turns * Self::period()).trunc();
        PhaseReg(Wrapping(scaled.as_()))
    }

    pub const fn from_raw(raw: u32) -> Self {
        PhaseReg(Wrapping(raw))
    }

    pub const fn to_raw(self) -> u32 {
        self.0.0
    }

    /// Returns the phase in degrees within [0, 360).
    pub fn to_degrees<F: Float + FromPrimitive>(self) -> F {
        let value = F::from_u32(self.0.0).unwrap();
        value / Self::period::<F>() * F::from_u16(360).unwrap()
    }

    pub fn zero() -> Self {
        PhaseReg(Wrapping(0))
    }
}

impl Add for PhaseReg {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for PhaseReg {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_turn() {
        let phase = PhaseReg::from_degrees(90.0);
        assert_eq!(phase.to_raw(), 1 << 30);
        assert_eq!(phase.to_degrees::<f64>(), 90.0);
    }

    #[test]
    fn test_wrapping_input() {
        assert_eq!(
            PhaseReg::from_degrees(450.0),
            PhaseReg::from_degrees(90.0)
        );
        assert_eq!(
            PhaseReg::from_degrees(-90.0),
            PhaseReg::from_degrees(270.0)
        );
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let sum = PhaseReg::from_degrees(270.0) + PhaseReg::from_degrees(180.0);
        assert_eq!(sum, PhaseReg::from_degrees(90.0));

        let diff = PhaseReg::from_degrees(0.0) - PhaseReg::from_degrees(90.0);
        assert_eq!(diff, PhaseReg::from_degrees(270.0));
    }

    #[test]
    fn test_zero() {
        assert_eq!(PhaseReg::zero().to_raw(), 0);
        assert_eq!(PhaseReg::from_degrees(360.0), PhaseReg::zero());
    }
}
