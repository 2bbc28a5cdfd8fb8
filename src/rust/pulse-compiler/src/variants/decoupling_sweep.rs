// SPDX-License-Identifier: Apache-2.0

//! Multi-pulse dynamical-decoupling sweep (CPMG-XY).
//!
//! Two Gaussian envelopes — a half-width and a full-width pulse — and
//! a swept inter-pulse delay register `tau`. The body plays a half-pi
//! pulse, then `n_pulses` repetitions of an X pulse (0°) and a Y pulse
//! (90°) separated by the swept delay, and closes with a second
//! half-pi pulse.

use pulse_units::{ClockSpec, PhaseReg};
use serde::Deserialize;

use crate::config::{self, Parameters};
use crate::program::{ChannelId, GAIN_MAX, Program, PulseRegisters, PulseStyle};
use crate::scheduler::ScheduleBuilder;
use crate::sweep::{SweepAxis, SweepUnit};
use crate::Result;

const HALF_PI_WAVEFORM: &str = "gaussian_half_pi";
const PI_WAVEFORM: &str = "gaussian_pi";
const TAU_REGISTER: &str = "tau";

#[derive(Debug, Clone, Deserialize)]
pub struct DecouplingSweepConfig {
    pub channel: ChannelId,
    pub nyquist_zone: u8,
    pub freq_mhz: f64,
    pub gain: i32,
    /// Standard deviation shared by both envelopes, in microseconds.
    pub pulse_sigma_us: f64,
    /// Length of the pi/2 envelope in microseconds.
    pub half_pi_pulse_len_us: f64,
    /// Length of the pi envelope in microseconds.
    pub pi_pulse_len_us: f64,
    /// Number of X/Y pulse pairs between the two half-pi pulses.
    pub n_pulses: u32,
    /// Inter-pulse delay sweep range in microseconds.
    pub tau_start_us: f64,
    pub tau_end_us: f64,
    pub nsweep_points: usize,
    pub reps: u32,
    pub relax_delay_us: f64,
}

impl DecouplingSweepConfig {
    pub const REQUIRED: &'static [&'static str] = &[
        "channel",
        "nyquist_zone",
        "freq_mhz",
        "gain",
        "pulse_sigma_us",
        "half_pi_pulse_len_us",
        "pi_pulse_len_us",
        "n_pulses",
        "tau_start_us",
        "tau_end_us",
        "nsweep_points",
        "reps",
        "relax_delay_us",
    ];

    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let cfg: Self = config::materialize(params, Self::REQUIRED)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        config::check_gain("gain", self.gain, GAIN_MAX)?;
        config::check_positive("pulse_sigma_us", self.pulse_sigma_us)?;
        config::check_positive("half_pi_pulse_len_us", self.half_pi_pulse_len_us)?;
        config::check_positive("pi_pulse_len_us", self.pi_pulse_len_us)?;
        config::check_positive("n_pulses", self.n_pulses as i64)?;
        config::check_range_order("tau_start_us", self.tau_start_us, "tau_end_us", self.tau_end_us)?;
        config::check_positive("nsweep_points", self.nsweep_points as i64)?;
        config::check_positive("reps", self.reps as i64)?;
        Ok(())
    }

    fn arb_registers(
        &self,
        clock: &ClockSpec,
        waveform: &str,
        phase_degrees: f64,
    ) -> PulseRegisters {
        PulseRegisters {
            style: PulseStyle::Arbitrary,
            freq: clock.freq_to_reg(self.freq_mhz),
            gain: self.gain,
            phase: PhaseReg::from_degrees(phase_degrees).to_raw(),
            length: None,
            waveform: Some(waveform.to_string()),
        }
    }
}

pub fn build_decoupling_sweep(cfg: &DecouplingSweepConfig, clock: &ClockSpec) -> Result<Program> {
    let sigma = clock.us_to_cycles_frac(cfg.pulse_sigma_us);
    let tau_start = clock.us_to_cycles(cfg.tau_start_us);
    let tau_end = clock.us_to_cycles(cfg.tau_end_us);
    let mut builder = ScheduleBuilder::new(cfg.reps);
    builder.declare_channel(cfg.channel, cfg.nyquist_zone)?;
    builder.add_gaussian(
        cfg.channel,
        HALF_PI_WAVEFORM,
        sigma,
        clock.us_to_cycles(cfg.half_pi_pulse_len_us) as usize,
        false,
    )?;
    builder.add_gaussian(
        cfg.channel,
        PI_WAVEFORM,
        sigma,
        clock.us_to_cycles(cfg.pi_pulse_len_us) as usize,
        false,
    )?;
    builder.configure_pulse(cfg.channel, cfg.arb_registers(clock, HALF_PI_WAVEFORM, 0.0))?;
    builder.bind_register(cfg.channel, TAU_REGISTER, tau_start)?;
    builder.add_sweep(SweepAxis {
        channel: cfg.channel,
        register: TAU_REGISTER.to_string(),
        start: tau_start as f64,
        end: tau_end as f64,
        points: cfg.nsweep_points,
        unit: SweepUnit::Time,
    })?;
    builder.settle()?;

    // Opening pi/2 pulse, then the swept delay.
    builder.pulse(cfg.channel, 0)?;
    builder.sync(0)?;
    builder.register_sync(cfg.channel, TAU_REGISTER)?;

    for _ in 0..cfg.n_pulses {
        // X pulse at 0 degrees.
        builder.configure_pulse(cfg.channel, cfg.arb_registers(clock, PI_WAVEFORM, 0.0))?;
        builder.pulse(cfg.channel, 0)?;
        builder.sync(0)?;
        builder.register_sync(cfg.channel, TAU_REGISTER)?;
        // Y pulse at 90 degrees.
        builder.configure_pulse(cfg.channel, cfg.arb_registers(clock, PI_WAVEFORM, 90.0))?;
        builder.pulse(cfg.channel, 0)?;
        builder.sync(0)?;
        builder.register_sync(cfg.channel, TAU_REGISTER)?;
    }

    // Closing pi/2 pulse.
    builder.configure_pulse(cfg.channel, cfg.arb_registers(clock, HALF_PI_WAVEFORM, 0.0))?;
    builder.pulse(cfg.channel, 0)?;
    builder.wait_all()?;
    builder.relax(clock.us_to_cycles(cfg.relax_delay_us))?;
    builder.build()
}
