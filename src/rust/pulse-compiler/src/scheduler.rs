// SPDX-License-Identifier: Apache-2.0

//! Assembly of one repetition's timeline.
//!
//! [`ScheduleBuilder`] collects channel declarations, waveform tables,
//! register state, sweep bindings and body events in the canonical
//! order every protocol follows:
//!
//! declare channel(s) → attach waveforms → configure pulse registers →
//! bind sweeps → settle → emit body (pulses, barriers, trigger) →
//! wait for all channels → relax.
//!
//! Each builder call is checked against the current build stage, so a
//! directive emitted out of order (a trigger before any channel is
//! declared, a pulse whose waveform was never attached) aborts
//! construction with [`Error::ScheduleOrder`] and no partial program
//! escapes. Event offsets are relative to the repetition's current
//! time cursor; sync barriers advance the cursor.

use indexmap::IndexMap;
use log::debug;

use crate::program::{
    ChannelId, EventKind, GAIN_MAX, GeneratorChannel, PlannedSweep, Program, PulseEvent,
    PulseRegisters, PulseStyle, TimelineEvent, TriggerEvent,
};
use crate::sweep::SweepAxis;
use crate::waveform::{EnvelopeShape, WaveformLibrary};
use crate::{Error, Result, Samples};

/// Cycles inserted after register configuration so the timing
/// processor applies the writes before the first pulse.
pub const SETTLE_DELAY: Samples = 100;

/// Pulse register names that exist implicitly on every declared
/// channel; anything else must be bound as a user register.
const IMPLICIT_REGISTERS: [&str; 3] = ["gain", "freq", "phase"];

/// Build stages of one program, in required order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Unconfigured,
    ChannelDeclared,
    RegistersConfigured,
    SweepBound,
    Settled,
    BodyEmitting,
    Triggered,
    BarrierWait,
    Relaxed,
}

pub struct ScheduleBuilder {
    stage: Stage,
    channels: Vec<GeneratorChannel>,
    waveforms: WaveformLibrary,
    /// Current pulse register state per channel.
    current: IndexMap<ChannelId, PulseRegisters>,
    /// User-defined registers and their initial values.
    user_registers: IndexMap<(ChannelId, String), i64>,
    sweeps: Vec<SweepAxis>,
    body: Vec<TimelineEvent>,
    reps: u32,
    relax_delay: Samples,
}

impl ScheduleBuilder {
    pub fn new(reps: u32) -> Self {
        ScheduleBuilder {
            stage: Stage::Unconfigured,
            channels: Vec::new(),
            waveforms: WaveformLibrary::new(),
            current: IndexMap::new(),
            user_registers: IndexMap::new(),
            sweeps: Vec::new(),
            body: Vec::new(),
            reps,
            relax_delay: 0,
        }
    }

    fn order_err(&self, op: &str) -> Error {
        Error::ScheduleOrder(format!(
            "'{op}' is not allowed in build stage {:?}",
            self.stage
        ))
    }

    fn channel(&self, id: ChannelId, op: &str) -> Result<&GeneratorChannel> {
        self.channels.iter().find(|ch| ch.id == id).ok_or_else(|| {
            Error::ScheduleOrder(format!("'{op}' references undeclared channel {id}"))
        })
    }

    /// Declares a generator channel operating in the given Nyquist
    /// zone. Every channel must be declared exactly once, before
    /// anything references it.
    pub fn declare_channel(&mut self, id: ChannelId, nyquist_zone: u8) -> Result<()> {
        if !matches!(self.stage, Stage::Unconfigured | Stage::ChannelDeclared) {
            return Err(self.order_err("declare_channel"));
        }
        if self.channels.iter().any(|ch| ch.id == id) {
            return Err(Error::ScheduleOrder(format!(
                "channel {id} is already declared"
            )));
        }
        debug!("declared channel {id} (nyquist zone {nyquist_zone})");
        self.channels.push(GeneratorChannel { id, nyquist_zone });
        self.stage = Stage::ChannelDeclared;
        Ok(())
    }

    /// Attaches a Gaussian envelope table to a declared channel.
    pub fn add_gaussian(
        &mut self,
        channel: ChannelId,
        name: &str,
        sigma: f64,
        length: usize,
        even_length: bool,
    ) -> Result<()> {
        if self.stage != Stage::ChannelDeclared {
            return Err(self.order_err("add_gaussian"));
        }
        self.channel(channel, "add_gaussian")?;
        self.waveforms.declare(
            channel,
            name,
            EnvelopeShape::Gaussian { sigma },
            length,
            even_length,
        )
    }

    /// Sets the pulse register state for a channel: what the next
    /// `pulse` call on that channel emits. Allowed once during setup
    /// and again inside the body for reconfiguration.
    pub fn configure_pulse(&mut self, channel: ChannelId, registers: PulseRegisters) -> Result<()> {
        if !matches!(
            self.stage,
            Stage::ChannelDeclared | Stage::RegistersConfigured | Stage::BodyEmitting
        ) {
            return Err(self.order_err("configure_pulse"));
        }
        self.channel(channel, "configure_pulse")?;
        if registers.gain < 0 || registers.gain > GAIN_MAX {
            return Err(Error::Configuration(format!(
                "gain ({}) must be within 0..={GAIN_MAX}",
                registers.gain
            )));
        }
        match registers.style {
            PulseStyle::Constant => {
                if registers.length.is_none() {
                    return Err(Error::ScheduleOrder(format!(
                        "constant-style pulse on channel {channel} has no length"
                    )));
                }
            }
            PulseStyle::Arbitrary => {
                let name = registers.waveform.as_deref().ok_or_else(|| {
                    Error::ScheduleOrder(format!(
                        "arbitrary-style pulse on channel {channel} names no waveform"
                    ))
                })?;
                if !self.waveforms.contains(channel, name) {
                    return Err(Error::ScheduleOrder(format!(
                        "waveform '{name}' is not declared on channel {channel}"
                    )));
                }
            }
        }
        self.current.insert(channel, registers);
        if self.stage == Stage::ChannelDeclared {
            self.stage = Stage::RegistersConfigured;
        }
        Ok(())
    }

    /// Binds a user-defined register on a channel, e.g. an inter-pulse
    /// delay or cycle counter, with its initial value.
    pub fn bind_register(&mut self, channel: ChannelId, name: &str, init: i64) -> Result<()> {
        if self.stage != Stage::RegistersConfigured {
            return Err(self.order_err("bind_register"));
        }
        self.channel(channel, "bind_register")?;
        if IMPLICIT_REGISTERS.contains(&name) {
            return Err(Error::ScheduleOrder(format!(
                "register name '{name}' is reserved for the pulse registers"
            )));
        }
        let key = (channel, name.to_string());
        if self.user_registers.contains_key(&key) {
            return Err(Error::ScheduleOrder(format!(
                "register '{name}' is already bound on channel {channel}"
            )));
        }
        self.user_registers.insert(key, init);
        Ok(())
    }

    /// Binds a sweep axis. The referenced register must resolve to a
    /// pulse register or a previously bound user register on a
    /// declared channel.
    pub fn add_sweep(&mut self, axis: SweepAxis) -> Result<()> {
        if !matches!(self.stage, Stage::RegistersConfigured | Stage::SweepBound) {
            return Err(self.order_err("add_sweep"));
        }
        self.channel(axis.channel, "add_sweep")?;
        let key = (axis.channel, axis.register.clone());
        if !IMPLICIT_REGISTERS.contains(&axis.register.as_str())
            && !self.user_registers.contains_key(&key)
        {
            return Err(Error::ScheduleOrder(format!(
                "sweep register '{}' was never bound on channel {}",
                axis.register, axis.channel
            )));
        }
        debug!(
            "bound sweep over '{}' on channel {}: {}..{} in {} points",
            axis.register, axis.channel, axis.start, axis.end, axis.points
        );
        self.sweeps.push(axis);
        self.stage = Stage::SweepBound;
        Ok(())
    }

    /// Inserts the fixed settle delay between configuration and the
    /// first pulse of the body.
    pub fn settle(&mut self) -> Result<()> {
        if !matches!(self.stage, Stage::RegistersConfigured | Stage::SweepBound) {
            return Err(self.order_err("settle"));
        }
        self.body.push(TimelineEvent {
            offset: 0,
            kind: EventKind::Settle(SETTLE_DELAY),
        });
        self.stage = Stage::Settled;
        Ok(())
    }

    /// Emits a pulse on `channel` at offset `t` from the current time
    /// cursor, materialized from the channel's register state.
    pub fn pulse(&mut self, channel: ChannelId, t: Samples) -> Result<()> {
        if !matches!(self.stage, Stage::Settled | Stage::BodyEmitting) {
            return Err(self.order_err("pulse"));
        }
        let registers = self.current.get(&channel).cloned().ok_or_else(|| {
            Error::ScheduleOrder(format!(
                "pulse on channel {channel} before its registers were configured"
            ))
        })?;
        self.body.push(TimelineEvent {
            offset: t,
            kind: EventKind::Pulse(PulseEvent { channel, registers }),
        });
        self.stage = Stage::BodyEmitting;
        Ok(())
    }

    /// Emits a trigger pulse on an output pin at offset `t` from the
    /// repetition origin.
    pub fn trigger(&mut self, pin: u8, width: Samples, t: Samples) -> Result<()> {
        if !matches!(self.stage, Stage::Settled | Stage::BodyEmitting) {
            return Err(self.order_err("trigger"));
        }
        self.body.push(TimelineEvent {
            offset: t,
            kind: EventKind::Trigger(TriggerEvent { pin, width }),
        });
        self.stage = Stage::Triggered;
        Ok(())
    }

    /// Advances the shared time cursor past all queued pulses plus
    /// `delay` cycles. A mid-body barrier; `delay` is usually zero.
    pub fn sync(&mut self, delay: Samples) -> Result<()> {
        if self.stage != Stage::BodyEmitting {
            return Err(self.order_err("sync"));
        }
        self.body.push(TimelineEvent {
            offset: 0,
            kind: EventKind::Sync(delay),
        });
        Ok(())
    }

    /// Advances the shared time cursor by the current value of a bound
    /// user register, e.g. a swept inter-pulse delay.
    pub fn register_sync(&mut self, channel: ChannelId, register: &str) -> Result<()> {
        if self.stage != Stage::BodyEmitting {
            return Err(self.order_err("register_sync"));
        }
        let key = (channel, register.to_string());
        if !self.user_registers.contains_key(&key) {
            return Err(Error::ScheduleOrder(format!(
                "register_sync references unbound register '{register}' on channel {channel}"
            )));
        }
        self.body.push(TimelineEvent {
            offset: 0,
            kind: EventKind::RegisterSync {
                channel,
                register: register.to_string(),
            },
        });
        Ok(())
    }

    /// Blocks until every channel referenced in the repetition has
    /// finished its queued pulses.
    pub fn wait_all(&mut self) -> Result<()> {
        if !matches!(self.stage, Stage::BodyEmitting | Stage::Triggered) {
            return Err(self.order_err("wait_all"));
        }
        self.body.push(TimelineEvent {
            offset: 0,
            kind: EventKind::WaitAll,
        });
        self.stage = Stage::BarrierWait;
        Ok(())
    }

    /// Terminates the repetition with the fixed relax delay before the
    /// next repetition or sweep point begins.
    pub fn relax(&mut self, delay: Samples) -> Result<()> {
        if self.stage != Stage::BarrierWait {
            return Err(self.order_err("relax"));
        }
        self.body.push(TimelineEvent {
            offset: 0,
            kind: EventKind::Sync(delay),
        });
        self.relax_delay = delay;
        self.stage = Stage::Relaxed;
        Ok(())
    }

    /// Seals the schedule into an immutable [`Program`].
    ///
    /// Plans every bound sweep axis and re-checks that all references
    /// resolve; any violation aborts with no partial program.
    pub fn build(self) -> Result<Program> {
        if self.stage != Stage::Relaxed {
            return Err(Error::ScheduleOrder(format!(
                "program body is incomplete in build stage {:?}; \
                 expected wait_all and relax before build",
                self.stage
            )));
        }
        let mut sweeps = Vec::with_capacity(self.sweeps.len());
        for axis in self.sweeps {
            let values = axis.plan_registers()?;
            sweeps.push(PlannedSweep { axis, values });
        }
        for event in &self.body {
            if let EventKind::Pulse(pulse) = &event.kind
                && let Some(name) = pulse.registers.waveform.as_deref()
                && !self.waveforms.contains(pulse.channel, name)
            {
                return Err(Error::ScheduleOrder(format!(
                    "pulse references waveform '{name}' not declared on channel {}",
                    pulse.channel
                )));
            }
        }
        debug!(
            "sealed program: {} channel(s), {} waveform(s), {} sweep axis(es), {} body event(s), {} rep(s)",
            self.channels.len(),
            self.waveforms.len(),
            sweeps.len(),
            self.body.len(),
            self.reps
        );
        Ok(Program {
            channels: self.channels,
            waveforms: self.waveforms,
            sweeps,
            body: self.body,
            reps: self.reps,
            relax_delay: self.relax_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SweepUnit;

    fn const_registers(gain: i32, length: Samples) -> PulseRegisters {
        PulseRegisters {
            style: PulseStyle::Constant,
            freq: 0x1000,
            gain,
            phase: 0,
            length: Some(length),
            waveform: None,
        }
    }

    fn gain_axis(points: usize) -> SweepAxis {
        SweepAxis {
            channel: 0,
            register: "gain".to_string(),
            start: 0.0,
            end: 32767.0,
            points,
            unit: SweepUnit::Unitless,
        }
    }

    fn minimal_program() -> Result<Program> {
        let mut builder = ScheduleBuilder::new(4);
        builder.declare_channel(0, 2)?;
        builder.configure_pulse(0, const_registers(1000, 430))?;
        builder.add_sweep(gain_axis(5))?;
        builder.settle()?;
        builder.pulse(0, 0)?;
        builder.trigger(1, 215, 0)?;
        builder.wait_all()?;
        builder.relax(4301)?;
        builder.build()
    }

    #[test]
    fn test_minimal_program_builds() {
        let program = minimal_program().unwrap();
        assert_eq!(program.channels.len(), 1);
        assert_eq!(program.sweeps.len(), 1);
        assert_eq!(program.sweeps[0].values, vec![0, 8191, 16383, 24575, 32767]);
        assert_eq!(program.reps, 4);
        assert_eq!(program.relax_delay, 4301);
        let kinds: Vec<_> = program
            .body
            .iter()
            .map(|e| std::mem::discriminant(&e.kind))
            .collect();
        assert_eq!(kinds.len(), 5); // settle, pulse, trigger, wait_all, relax
        assert!(matches!(program.body[0].kind, EventKind::Settle(SETTLE_DELAY)));
        assert!(matches!(program.body[3].kind, EventKind::WaitAll));
        assert!(matches!(program.body[4].kind, EventKind::Sync(4301)));
    }

    #[test]
    fn test_trigger_before_channel_declaration() {
        let mut builder = ScheduleBuilder::new(1);
        let err = builder.trigger(1, 215, 0).unwrap_err();
        assert!(matches!(err, Error::ScheduleOrder(_)), "{err}");
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        let err = builder.declare_channel(0, 2).unwrap_err();
        assert!(err.to_string().contains("already declared"), "{err}");
    }

    #[test]
    fn test_undeclared_waveform_reference() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        let registers = PulseRegisters {
            style: PulseStyle::Arbitrary,
            freq: 0,
            gain: 100,
            phase: 0,
            length: None,
            waveform: Some("gaussian".to_string()),
        };
        let err = builder.configure_pulse(0, registers).unwrap_err();
        assert!(matches!(err, Error::ScheduleOrder(_)), "{err}");
        assert!(err.to_string().contains("gaussian"), "{err}");
    }

    #[test]
    fn test_waveform_resolves_on_same_channel_only() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        builder.declare_channel(1, 1).unwrap();
        builder.add_gaussian(0, "gaussian", 5.0, 20, true).unwrap();
        let registers = PulseRegisters {
            style: PulseStyle::Arbitrary,
            freq: 0,
            gain: 100,
            phase: 0,
            length: None,
            waveform: Some("gaussian".to_string()),
        };
        // Declared on channel 0, referenced from channel 1.
        let err = builder.configure_pulse(1, registers).unwrap_err();
        assert!(matches!(err, Error::ScheduleOrder(_)), "{err}");
    }

    #[test]
    fn test_gain_out_of_range() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        let err = builder
            .configure_pulse(0, const_registers(GAIN_MAX + 1, 430))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");
        let err = builder
            .configure_pulse(0, const_registers(-1, 430))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }

    #[test]
    fn test_unbound_sweep_register() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        builder.configure_pulse(0, const_registers(100, 430)).unwrap();
        let axis = SweepAxis {
            channel: 0,
            register: "tau".to_string(),
            start: 10.0,
            end: 100.0,
            points: 10,
            unit: SweepUnit::Time,
        };
        let err = builder.add_sweep(axis).unwrap_err();
        assert!(err.to_string().contains("never bound"), "{err}");
    }

    #[test]
    fn test_user_register_sweep_resolves() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        builder.configure_pulse(0, const_registers(100, 430)).unwrap();
        builder.bind_register(0, "tau", 10).unwrap();
        let axis = SweepAxis {
            channel: 0,
            register: "tau".to_string(),
            start: 10.0,
            end: 100.0,
            points: 10,
            unit: SweepUnit::Time,
        };
        builder.add_sweep(axis).unwrap();
    }

    #[test]
    fn test_build_requires_complete_body() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        builder.configure_pulse(0, const_registers(100, 430)).unwrap();
        builder.settle().unwrap();
        builder.pulse(0, 0).unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, Error::ScheduleOrder(_)), "{err}");
    }

    #[test]
    fn test_pulse_before_settle_rejected() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        builder.configure_pulse(0, const_registers(100, 430)).unwrap();
        let err = builder.pulse(0, 0).unwrap_err();
        assert!(matches!(err, Error::ScheduleOrder(_)), "{err}");
    }

    #[test]
    fn test_degenerate_sweep_fails_at_build() {
        let mut builder = ScheduleBuilder::new(1);
        builder.declare_channel(0, 1).unwrap();
        builder.configure_pulse(0, const_registers(100, 430)).unwrap();
        let axis = SweepAxis {
            channel: 0,
            register: "gain".to_string(),
            start: 500.0,
            end: 500.0,
            points: 3,
            unit: SweepUnit::Unitless,
        };
        builder.add_sweep(axis).unwrap();
        builder.settle().unwrap();
        builder.pulse(0, 0).unwrap();
        builder.wait_all().unwrap();
        builder.relax(100).unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, Error::SweepRange(_)), "{err}");
    }
}
