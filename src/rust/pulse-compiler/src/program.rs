// SPDX-License-Identifier: Apache-2.0

//! The compiled program data model.
//!
//! A [`Program`] is the immutable artifact handed to the external
//! real-time executor: channel declarations, the waveform library
//! snapshot, planned sweep trajectories and the linear event sequence
//! forming one repetition's body. Nothing in it is mutated after the
//! build phase; the executor iterates it once per sweep point times
//! once per repetition.

use crate::Samples;
use crate::sweep::SweepAxis;
use crate::waveform::WaveformLibrary;

/// Identifier of a logical generator channel.
pub type ChannelId = u8;

/// Maximum value of the gain register.
pub const GAIN_MAX: i32 = 32767;

/// A declared generator channel. Must be declared exactly once before
/// any pulse references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorChannel {
    pub id: ChannelId,
    /// Operating Nyquist zone of the DAC.
    pub nyquist_zone: u8,
}

/// Emission style of a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseStyle {
    /// Constant amplitude for an explicit length.
    Constant,
    /// Arbitrary envelope played from a named waveform table.
    Arbitrary,
}

/// Pulse register state for one channel: what the next emitted pulse
/// on that channel plays.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseRegisters {
    pub style: PulseStyle,
    /// Target frequency in frequency-register units.
    pub freq: i64,
    /// Gain register value, `0..=GAIN_MAX`.
    pub gain: i32,
    /// Phase in device phase-register units.
    pub phase: u32,
    /// Emission length in cycles; required for `Constant` style.
    pub length: Option<Samples>,
    /// Waveform name on the same channel; required for `Arbitrary`.
    pub waveform: Option<String>,
}

/// One pulse emission, materialized from the channel's register state
/// at schedule-build time.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseEvent {
    pub channel: ChannelId,
    pub registers: PulseRegisters,
}

/// An out-of-band signal pulse on a dedicated output pin, used to gate
/// an external device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub pin: u8,
    pub width: Samples,
}

/// Timeline directives making up one repetition's body.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Pulse(PulseEvent),
    Trigger(TriggerEvent),
    /// Fixed settle delay so register writes apply before the first
    /// pulse.
    Settle(Samples),
    /// Block until every channel referenced earlier in the repetition
    /// has finished its queued pulses.
    WaitAll,
    /// Advance the shared time cursor past all queued pulses plus a
    /// fixed delay.
    Sync(Samples),
    /// Advance the shared time cursor by the current value of a swept
    /// user register.
    RegisterSync { channel: ChannelId, register: String },
}

/// One event at an offset relative to the repetition's time origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub offset: Samples,
    pub kind: EventKind,
}

/// A sweep axis together with its planned register trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSweep {
    pub axis: SweepAxis,
    /// Per-iteration register values, truncated toward zero.
    pub values: Vec<i64>,
}

/// The compiled, immutable program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub channels: Vec<GeneratorChannel>,
    pub waveforms: WaveformLibrary,
    pub sweeps: Vec<PlannedSweep>,
    /// One repetition's body in execution order.
    pub body: Vec<TimelineEvent>,
    pub reps: u32,
    pub relax_delay: Samples,
}

impl Program {
    /// Iterates the Cartesian set of all bound axis trajectories, the
    /// first axis outermost. With no sweeps bound, yields a single
    /// empty point so the executor still runs the body once.
    pub fn sweep_points(&self) -> SweepPoints<'_> {
        SweepPoints {
            sweeps: &self.sweeps,
            index: vec![0; self.sweeps.len()],
            done: false,
        }
    }

    pub fn pulse_events(&self) -> impl Iterator<Item = &PulseEvent> {
        self.body.iter().filter_map(|event| match &event.kind {
            EventKind::Pulse(pulse) => Some(pulse),
            _ => None,
        })
    }
}

/// Iterator over the Cartesian product of sweep trajectories. Each item
/// holds one register value per bound axis, in axis order.
pub struct SweepPoints<'a> {
    sweeps: &'a [PlannedSweep],
    index: Vec<usize>,
    done: bool,
}

impl Iterator for SweepPoints<'_> {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let point = self
            .sweeps
            .iter()
            .zip(&self.index)
            .map(|(sweep, &i)| sweep.values[i])
            .collect();
        // Advance like a mixed-radix counter, last axis fastest.
        self.done = true;
        for pos in (0..self.index.len()).rev() {
            self.index[pos] += 1;
            if self.index[pos] < self.sweeps[pos].values.len() {
                self.done = false;
                break;
            }
            self.index[pos] = 0;
        }
        Some(point)
    }
}
