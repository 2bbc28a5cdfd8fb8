// SPDX-License-Identifier: Apache-2.0

//! Linear register sweep planning.
//!
//! A sweep axis steps one hardware register across evenly spaced values
//! over repeated program executions. The trajectory is inclusive: the
//! first point equals `start`, the last equals `end`. Registers hold
//! integers, so each planned value is truncated toward zero before it
//! is written; see [`plan_registers`] for the rationale.

use log::warn;

use crate::program::ChannelId;
use crate::{Error, Result};

/// Physical interpretation of a swept register's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepUnit {
    Unitless,
    Frequency,
    Time,
    Phase,
}

/// A register binding swept across a linear range.
///
/// The register is referenced by name: `"gain"`, `"freq"` and `"phase"`
/// resolve to the channel's pulse registers, any other name to a
/// user-defined register that must be bound on the channel before the
/// sweep is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepAxis {
    pub channel: ChannelId,
    pub register: String,
    pub start: f64,
    pub end: f64,
    pub points: usize,
    pub unit: SweepUnit,
}

impl SweepAxis {
    /// Plans the per-iteration register values for this axis.
    pub fn plan_registers(&self) -> Result<Vec<i64>> {
        plan_registers(self.start, self.end, self.points)
    }
}

/// Computes the inclusive evenly spaced trajectory from `start` to
/// `end` over `points` values.
///
/// For `points == 1` the trajectory is exactly `[start]` and `end` is
/// ignored. For `points > 1` the i-th value is
/// `start + i * (end - start) / (points - 1)`; a degenerate range
/// (`end == start`) is rejected.
pub fn plan(start: f64, end: f64, points: usize) -> Result<Vec<f64>> {
    if points < 1 {
        return Err(Error::SweepRange(
            "sweep must have at least one point".to_string(),
        ));
    }
    if points == 1 {
        return Ok(vec![start]);
    }
    if end == start {
        return Err(Error::SweepRange(format!(
            "sweep over {points} points has a degenerate range (start == end == {start})"
        )));
    }
    let span = end - start;
    // Multiply before dividing so the final point lands on `end`
    // exactly whenever `span * (points - 1)` is representable.
    Ok((0..points)
        .map(|i| start + span * i as f64 / (points - 1) as f64)
        .collect())
}

/// Plans a trajectory for an integer-valued hardware register.
///
/// Each planned value is truncated toward zero. This reproduces the
/// instrument's write path and keeps the endpoints exact whenever
/// `start` and `end` are integers, but it biases intermediate values
/// downward when the step is fractional. Round-to-nearest would halve
/// that bias; the truncation policy is kept for hardware compatibility.
pub fn plan_registers(start: f64, end: f64, points: usize) -> Result<Vec<i64>> {
    let values = plan(start, end, points)?;
    let mut lost = 0.0f64;
    let registers: Vec<i64> = values
        .iter()
        .map(|v| {
            let t = v.trunc();
            lost = lost.max((v - t).abs());
            t as i64
        })
        .collect();
    if lost > 0.5 {
        warn!(
            "integer sweep {start}..{end} over {points} points truncates up to {lost:.3} register units per step"
        );
    }
    Ok(registers)
}
