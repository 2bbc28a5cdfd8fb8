// SPDX-License-Identifier: Apache-2.0

//! Envelope waveform declarations and sample-table generation.
//!
//! A pulse either plays at constant amplitude for an explicit length or
//! plays a precomputed amplitude table. Tables are declared per channel
//! under a unique name and are immutable once built; pulse events refer
//! to them by name only.

use indexmap::IndexMap;

use crate::program::ChannelId;
use crate::{Error, Result};

/// Closed-form envelope shape of a declared waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeShape {
    /// Constant amplitude. No sample table is generated; pulses using
    /// the declaration carry an explicit emission length instead.
    Constant,
    /// Symmetric Gaussian bell with the given standard deviation in
    /// samples.
    Gaussian { sigma: f64 },
}

/// An immutable envelope declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub name: String,
    pub channel: ChannelId,
    pub shape: EnvelopeShape,
    /// Table length in samples. For `Constant` this is zero.
    pub length: usize,
    /// Normalized amplitude table, peak 1.0. Empty for `Constant`.
    pub samples: Vec<f64>,
}

/// Per-channel store of declared waveforms, keyed by (channel, name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformLibrary {
    tables: IndexMap<(ChannelId, String), Waveform>,
}

impl WaveformLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a waveform on `channel`.
    ///
    /// For a Gaussian shape the sample table is generated immediately;
    /// with `even_length` the table length is rounded up to the nearest
    /// even value, as playback memory requires even alignment.
    ///
    /// Fails if the shape parameters are invalid or the name is already
    /// taken on the same channel.
    pub fn declare(
        &mut self,
        channel: ChannelId,
        name: &str,
        shape: EnvelopeShape,
        length: usize,
        even_length: bool,
    ) -> Result<()> {
        let key = (channel, name.to_string());
        if self.tables.contains_key(&key) {
            return Err(Error::Waveform(format!(
                "waveform '{name}' is already declared on channel {channel}"
            )));
        }
        let waveform = match shape {
            EnvelopeShape::Constant => Waveform {
                name: name.to_string(),
                channel,
                shape,
                length: 0,
                samples: Vec::new(),
            },
            EnvelopeShape::Gaussian { sigma } => {
                if sigma <= 0.0 {
                    return Err(Error::Waveform(format!(
                        "waveform '{name}': sigma ({sigma}) must be positive"
                    )));
                }
                if length == 0 {
                    return Err(Error::Waveform(format!(
                        "waveform '{name}': length must be positive"
                    )));
                }
                let length = if even_length { length + length % 2 } else { length };
                Waveform {
                    name: name.to_string(),
                    channel,
                    shape,
                    length,
                    samples: gaussian_table(sigma, length),
                }
            }
        };
        self.tables.insert(key, waveform);
        Ok(())
    }

    pub fn get(&self, channel: ChannelId, name: &str) -> Option<&Waveform> {
        self.tables.get(&(channel, name.to_string()))
    }

    pub fn contains(&self, channel: ChannelId, name: &str) -> bool {
        self.get(channel, name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waveform> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Samples a symmetric Gaussian bell of `length` points centered on
/// `(length - 1) / 2`, normalized to peak amplitude 1.0.
pub fn gaussian_table(sigma: f64, length: usize) -> Vec<f64> {
    let center = (length as f64 - 1.0) / 2.0;
    (0..length)
        .map(|i| {
            let x = i as f64 - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_even_length_round_up() {
        let mut lib = WaveformLibrary::new();
        lib.declare(0, "gaussian", EnvelopeShape::Gaussian { sigma: 5.0 }, 21, true)
            .unwrap();
        let wf = lib.get(0, "gaussian").unwrap();
        assert_eq!(wf.length, 22);
        assert_eq!(wf.samples.len(), 22);
    }

    #[test]
    fn test_gaussian_symmetry() {
        let table = gaussian_table(5.0, 22);
        for i in 0..table.len() {
            let mirrored = table[table.len() - 1 - i];
            assert!(
                (table[i] - mirrored).abs() < 1e-12,
                "sample {i} not symmetric"
            );
        }
        // Peak amplitude sits at the two center samples.
        assert!(table[10] >= table[0]);
        assert_eq!(table[10], table[11]);
    }

    #[test]
    fn test_gaussian_odd_length_peak() {
        let table = gaussian_table(3.0, 21);
        assert_eq!(table.len(), 21);
        assert_eq!(table[10], 1.0);
    }

    #[test]
    fn test_gaussian_idempotent() {
        assert_eq!(gaussian_table(5.0, 22), gaussian_table(5.0, 22));
    }

    #[test]
    fn test_invalid_parameters() {
        let mut lib = WaveformLibrary::new();
        let err = lib
            .declare(0, "bad", EnvelopeShape::Gaussian { sigma: 0.0 }, 16, false)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Waveform(_)), "{err}");
        let err = lib
            .declare(0, "bad", EnvelopeShape::Gaussian { sigma: 2.0 }, 0, false)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Waveform(_)), "{err}");
    }

    #[test]
    fn test_name_collision_per_channel() {
        let mut lib = WaveformLibrary::new();
        lib.declare(0, "gaussian", EnvelopeShape::Gaussian { sigma: 2.0 }, 16, false)
            .unwrap();
        let err = lib
            .declare(0, "gaussian", EnvelopeShape::Gaussian { sigma: 3.0 }, 16, false)
            .unwrap_err();
        assert!(err.to_string().contains("already declared"), "{err}");
        // Same name on another channel is a distinct declaration.
        lib.declare(1, "gaussian", EnvelopeShape::Gaussian { sigma: 3.0 }, 16, false)
            .unwrap();
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn test_constant_declaration_has_no_table() {
        let mut lib = WaveformLibrary::new();
        lib.declare(0, "flat", EnvelopeShape::Constant, 0, false).unwrap();
        let wf = lib.get(0, "flat").unwrap();
        assert!(wf.samples.is_empty());
        assert_eq!(wf.length, 0);
    }
}
