// SPDX-License-Identifier: Apache-2.0

//! Power/frequency sweep: a fixed train of constant-style pulses with
//! the gain register stepped across a linear range, and a trailing
//! trigger gating the external detector.

use pulse_units::ClockSpec;
use serde::Deserialize;

use crate::config::{self, Parameters};
use crate::program::{ChannelId, GAIN_MAX, Program, PulseRegisters, PulseStyle};
use crate::scheduler::ScheduleBuilder;
use crate::sweep::{SweepAxis, SweepUnit};
use crate::{Result, Samples};

#[derive(Debug, Clone, Deserialize)]
pub struct PowerSweepConfig {
    /// Length of each pulse in microseconds.
    pub pulse_len_us: f64,
    /// Output pin driving the external gate line.
    pub gate_pin: u8,
    pub relax_delay_us: f64,
    pub trigger_width_us: f64,
    pub channel: ChannelId,
    pub nyquist_zone: u8,
    /// Target frequency in MHz.
    pub freq_mhz: f64,
    pub gain_start: i32,
    pub gain_end: i32,
    pub nsweep_points: usize,
    pub reps: u32,
    /// Number of back-to-back pulses per repetition body.
    pub pulses_per_rep: u32,
}

impl PowerSweepConfig {
    pub const REQUIRED: &'static [&'static str] = &[
        "pulse_len_us",
        "gate_pin",
        "relax_delay_us",
        "trigger_width_us",
        "channel",
        "nyquist_zone",
        "freq_mhz",
        "gain_start",
        "gain_end",
        "nsweep_points",
        "reps",
        "pulses_per_rep",
    ];

    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let cfg: Self = config::materialize(params, Self::REQUIRED)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        config::check_gain("gain_start", self.gain_start, GAIN_MAX)?;
        config::check_gain("gain_end", self.gain_end, GAIN_MAX)?;
        config::check_range_order("gain_start", self.gain_start, "gain_end", self.gain_end)?;
        config::check_positive("pulse_len_us", self.pulse_len_us)?;
        config::check_positive("nsweep_points", self.nsweep_points as i64)?;
        config::check_positive("reps", self.reps as i64)?;
        config::check_positive("pulses_per_rep", self.pulses_per_rep as i64)?;
        Ok(())
    }
}

pub fn build_power_sweep(cfg: &PowerSweepConfig, clock: &ClockSpec) -> Result<Program> {
    let pulse_len = clock.us_to_cycles(cfg.pulse_len_us);
    let mut builder = ScheduleBuilder::new(cfg.reps);
    builder.declare_channel(cfg.channel, cfg.nyquist_zone)?;
    builder.configure_pulse(
        cfg.channel,
        PulseRegisters {
            style: PulseStyle::Constant,
            freq: clock.freq_to_reg(cfg.freq_mhz),
            gain: cfg.gain_start,
            phase: 0,
            length: Some(pulse_len),
            waveform: None,
        },
    )?;
    builder.add_sweep(SweepAxis {
        channel: cfg.channel,
        register: "gain".to_string(),
        start: cfg.gain_start as f64,
        end: cfg.gain_end as f64,
        points: cfg.nsweep_points,
        unit: SweepUnit::Unitless,
    })?;
    builder.settle()?;
    for rep in 0..cfg.pulses_per_rep {
        builder.pulse(cfg.channel, rep as Samples * pulse_len)?;
    }
    builder.trigger(
        cfg.gate_pin,
        clock.us_to_cycles(cfg.trigger_width_us),
        0,
    )?;
    builder.wait_all()?;
    builder.relax(clock.us_to_cycles(cfg.relax_delay_us))?;
    builder.build()
}
