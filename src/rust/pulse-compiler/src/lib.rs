// SPDX-License-Identifier: Apache-2.0

//! Compiler for parameterized RF pulse programs.
//!
//! Translates a declarative description of one experimental protocol
//! (generator channels, envelope waveforms, timed pulse and trigger
//! events, synchronization barriers and linear register sweeps) into an
//! immutable [`program::Program`]: the per-repetition schedule an
//! external real-time executor runs once per sweep point and
//! repetition.

pub mod config;
pub mod program;
pub mod scheduler;
pub mod sweep;
pub mod variants;
pub mod waveform;

/// A duration or timestamp in generator clock cycles.
pub type Samples = i64;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Missing or out-of-range configuration input.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Invalid envelope parameters or waveform name collision.
    #[error("waveform error: {0}")]
    Waveform(String),
    /// Invalid point count or degenerate sweep range.
    #[error("sweep range error: {0}")]
    SweepRange(String),
    /// Unresolved entity reference or event emitted out of order.
    #[error("schedule order error: {0}")]
    ScheduleOrder(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
