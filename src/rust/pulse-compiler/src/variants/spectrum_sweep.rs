// SPDX-License-Identifier: Apache-2.0

//! Duty-cycle/spectrum sweep: a single constant-style pulse per
//! repetition with a swept cycle-count register that indirectly
//! controls the emission duty cycle.

use pulse_units::ClockSpec;
use serde::Deserialize;

use crate::config::{self, Parameters};
use crate::program::{ChannelId, Program, PulseRegisters, PulseStyle};
use crate::scheduler::ScheduleBuilder;
use crate::sweep::{SweepAxis, SweepUnit};
use crate::Result;

const CYCLES_REGISTER: &str = "cycles";

/// Gain ceiling for continuous output, below the register maximum to
/// keep the amplifier in its linear range.
pub const SPECTRUM_GAIN_MAX: i32 = 30000;

#[derive(Debug, Clone, Deserialize)]
pub struct SpectrumSweepConfig {
    pub pulse_len_us: f64,
    pub gate_pin: u8,
    pub relax_delay_us: f64,
    pub trigger_width_us: f64,
    pub channel: ChannelId,
    pub nyquist_zone: u8,
    pub freq_mhz: f64,
    pub gain: i32,
    pub cycles_start: i64,
    pub cycles_end: i64,
    pub nsweep_points: usize,
    pub reps: u32,
}

impl SpectrumSweepConfig {
    pub const REQUIRED: &'static [&'static str] = &[
        "pulse_len_us",
        "gate_pin",
        "relax_delay_us",
        "trigger_width_us",
        "channel",
        "nyquist_zone",
        "freq_mhz",
        "gain",
        "cycles_start",
        "cycles_end",
        "nsweep_points",
        "reps",
    ];

    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let cfg: Self = config::materialize(params, Self::REQUIRED)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        config::check_gain("gain", self.gain, SPECTRUM_GAIN_MAX)?;
        config::check_range_order(
            "cycles_start",
            self.cycles_start,
            "cycles_end",
            self.cycles_end,
        )?;
        config::check_positive("pulse_len_us", self.pulse_len_us)?;
        config::check_positive("nsweep_points", self.nsweep_points as i64)?;
        config::check_positive("reps", self.reps as i64)?;
        Ok(())
    }
}

pub fn build_spectrum_sweep(cfg: &SpectrumSweepConfig, clock: &ClockSpec) -> Result<Program> {
    let mut builder = ScheduleBuilder::new(cfg.reps);
    builder.declare_channel(cfg.channel, cfg.nyquist_zone)?;
    builder.configure_pulse(
        cfg.channel,
        PulseRegisters {
            style: PulseStyle::Constant,
            freq: clock.freq_to_reg(cfg.freq_mhz),
            gain: cfg.gain,
            phase: 0,
            length: Some(clock.us_to_cycles(cfg.pulse_len_us)),
            waveform: None,
        },
    )?;
    builder.bind_register(cfg.channel, CYCLES_REGISTER, cfg.cycles_start)?;
    builder.add_sweep(SweepAxis {
        channel: cfg.channel,
        register: CYCLES_REGISTER.to_string(),
        start: cfg.cycles_start as f64,
        end: cfg.cycles_end as f64,
        points: cfg.nsweep_points,
        unit: SweepUnit::Unitless,
    })?;
    builder.settle()?;
    builder.pulse(cfg.channel, 0)?;
    builder.trigger(
        cfg.gate_pin,
        clock.us_to_cycles(cfg.trigger_width_us),
        0,
    )?;
    builder.wait_all()?;
    builder.relax(clock.us_to_cycles(cfg.relax_delay_us))?;
    builder.build()
}
