//! The generator session configures and runs one fast analog output.

use std::time::Duration;

use log::{debug, info};
use measurements::{Angle, Frequency, Voltage};

use crate::{
    BoardLink, CommandChannel, RedPitayaError,
    error::check_range,
    settings::{OutputChannel, Shape, SweepDirection, SweepMode},
};

/// Lowest output frequency in Hz.
pub const FREQUENCY_MIN: f64 = 1e-6;
/// Highest output frequency in Hz.
pub const FREQUENCY_MAX: f64 = 50e6;
/// Highest amplitude in volts.
pub const AMPLITUDE_MAX: f64 = 1.0;
/// Largest magnitude of the offset in volts.
pub const OFFSET_MAX: f64 = 1.0;
/// Largest magnitude of the phase in degrees.
pub const PHASE_MAX: f64 = 360.0;
/// Shortest duration of one sweep.
pub const SWEEP_TIME_MIN: Duration = Duration::from_micros(1);

/// Frequency sweep settings of an output.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    /// How the frequency progresses.
    pub mode: SweepMode,
    /// Frequency at the start of the sweep.
    pub start_frequency: Frequency,
    /// Frequency at the end of the sweep.
    pub stop_frequency: Frequency,
    /// Duration of one sweep, transferred in microseconds.
    pub duration: Duration,
    /// Direction of the sweep.
    pub direction: SweepDirection,
    /// Sweep state. Together with the enabled output and [`GeneratorSession::run`], the sweep
    /// is emitted.
    pub enabled: bool,
}

/// Sweep fields written by the individual setters. A [`SweepConfig`] is only known once all
/// of them are set.
#[derive(Debug, Clone, Default)]
struct SweepFields {
    mode: Option<SweepMode>,
    start_frequency: Option<Frequency>,
    stop_frequency: Option<Frequency>,
    duration: Option<Duration>,
    direction: Option<SweepDirection>,
    enabled: Option<bool>,
}

impl SweepFields {
    fn complete(&self) -> Option<SweepConfig> {
        Some(SweepConfig {
            mode: self.mode?,
            start_frequency: self.start_frequency?,
            stop_frequency: self.stop_frequency?,
            duration: self.duration?,
            direction: self.direction?,
            enabled: self.enabled?,
        })
    }
}

impl From<&SweepConfig> for SweepFields {
    fn from(sweep: &SweepConfig) -> Self {
        SweepFields {
            mode: Some(sweep.mode),
            start_frequency: Some(sweep.start_frequency),
            stop_frequency: Some(sweep.stop_frequency),
            duration: Some(sweep.duration),
            direction: Some(sweep.direction),
            enabled: Some(sweep.enabled),
        }
    }
}

/// Waveform settings of an output.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Waveform shape.
    pub shape: Shape,
    /// Fixed frequency, used when no sweep is running.
    pub frequency: Frequency,
    /// Amplitude between 0 and 1 V.
    pub amplitude: Voltage,
    /// DC offset between -1 and 1 V.
    pub offset: Voltage,
    /// Phase between -360 and 360 degrees.
    pub phase: Angle,
    /// Duty cycle as a fraction, used by the PWM shape.
    pub duty_cycle: f64,
    /// Whether the output voltage should be switched on.
    pub enabled: bool,
    /// Optional frequency sweep.
    pub sweep: Option<SweepConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            shape: Shape::Sine,
            frequency: Frequency::from_hertz(1000.0),
            amplitude: Voltage::from_volts(0.5),
            offset: Voltage::from_volts(0.0),
            phase: Angle::from_degrees(0.0),
            duty_cycle: 0.5,
            enabled: false,
            sweep: None,
        }
    }
}

impl SweepConfig {
    fn validate(&self) -> Result<(), RedPitayaError> {
        check_frequency("Sweep start frequency", self.start_frequency)?;
        check_frequency("Sweep stop frequency", self.stop_frequency)?;
        check_sweep_duration(self.duration)
    }
}

impl GeneratorConfig {
    /// Check all bounded fields against the limits of the hardware.
    pub fn validate(&self) -> Result<(), RedPitayaError> {
        check_frequency("Frequency", self.frequency)?;
        check_amplitude(self.amplitude)?;
        check_offset(self.offset)?;
        check_phase(self.phase)?;
        check_duty_cycle(self.duty_cycle)?;
        if let Some(sweep) = &self.sweep {
            sweep.validate()?;
        }
        Ok(())
    }
}

fn check_frequency(name: &'static str, frequency: Frequency) -> Result<(), RedPitayaError> {
    check_range(name, frequency.as_hertz(), FREQUENCY_MIN, FREQUENCY_MAX)
}

fn check_amplitude(amplitude: Voltage) -> Result<(), RedPitayaError> {
    check_range("Amplitude", amplitude.as_volts(), 0.0, AMPLITUDE_MAX)
}

fn check_offset(offset: Voltage) -> Result<(), RedPitayaError> {
    check_range("Offset", offset.as_volts(), -OFFSET_MAX, OFFSET_MAX)
}

fn check_phase(phase: Angle) -> Result<(), RedPitayaError> {
    check_range("Phase", phase.as_degrees(), -PHASE_MAX, PHASE_MAX)
}

fn check_duty_cycle(duty_cycle: f64) -> Result<(), RedPitayaError> {
    check_range("Duty cycle", duty_cycle, 0.0, 1.0)
}

fn check_sweep_duration(duration: Duration) -> Result<(), RedPitayaError> {
    if duration < SWEEP_TIME_MIN {
        return Err(RedPitayaError::InvalidArgument(format!(
            "Sweep duration {duration:?} is shorter than {SWEEP_TIME_MIN:?}."
        )));
    }
    Ok(())
}

fn sweep_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// A generator session on one output of the board.
///
/// Settings are written field by field. The hardware has no atomic commit, so a fault in the
/// middle of [`GeneratorSession::configure`] leaves the output partially configured.
///
/// Before the session is dropped, [`GeneratorSession::release`] should be called, which
/// switches the output off.
pub struct GeneratorSession<C: CommandChannel> {
    link: BoardLink<C>,
    output: OutputChannel,
    config: GeneratorConfig,
    sweep_fields: SweepFields,
}

impl<C: CommandChannel> GeneratorSession<C> {
    /// Create a new session on the given output. No command is sent.
    pub fn new(link: BoardLink<C>, output: OutputChannel) -> Self {
        GeneratorSession {
            link,
            output,
            config: GeneratorConfig::default(),
            sweep_fields: SweepFields::default(),
        }
    }

    /// Validate and write a waveform configuration.
    ///
    /// Shape, frequency, amplitude, offset, phase, and duty cycle are written in this order,
    /// followed by the sweep settings if a sweep is configured. Without a sweep, the sweep
    /// settings written before are kept. The `enabled` field is not touched here, use
    /// [`GeneratorSession::set_enabled`].
    pub fn configure(&mut self, config: GeneratorConfig) -> Result<(), RedPitayaError> {
        config.validate()?;
        let out = self.output;
        self.link.with(|ch| {
            ch.set_shape(out, config.shape)?;
            ch.set_frequency(out, config.frequency.as_hertz())?;
            ch.set_amplitude(out, config.amplitude.as_volts())?;
            ch.set_offset(out, config.offset.as_volts())?;
            ch.set_phase(out, config.phase.as_degrees())?;
            ch.set_duty_cycle(out, config.duty_cycle)
        })?;
        if let Some(sweep) = &config.sweep {
            self.write_sweep(sweep)?;
            self.sweep_fields = SweepFields::from(sweep);
        }
        debug!("Generator {out} configured: {config:?}");
        let sweep = config.sweep.clone().or_else(|| self.config.sweep.take());
        self.config = GeneratorConfig {
            enabled: self.config.enabled,
            sweep,
            ..config
        };
        Ok(())
    }

    fn write_sweep(&self, sweep: &SweepConfig) -> Result<(), RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| {
            ch.set_sweep_mode(out, sweep.mode)?;
            ch.set_sweep_start_frequency(out, sweep.start_frequency.as_hertz())?;
            ch.set_sweep_stop_frequency(out, sweep.stop_frequency.as_hertz())?;
            ch.set_sweep_time_us(out, sweep_micros(sweep.duration))?;
            ch.set_sweep_direction(out, sweep.direction)?;
            ch.set_sweep_enabled(out, sweep.enabled)
        })
    }

    /// Set the waveform shape.
    pub fn set_shape(&mut self, shape: Shape) -> Result<(), RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| ch.set_shape(out, shape))?;
        self.config.shape = shape;
        Ok(())
    }

    /// Set the fixed frequency.
    pub fn set_frequency(&mut self, frequency: Frequency) -> Result<(), RedPitayaError> {
        check_frequency("Frequency", frequency)?;
        let out = self.output;
        self.link
            .with(|ch| ch.set_frequency(out, frequency.as_hertz()))?;
        self.config.frequency = frequency;
        Ok(())
    }

    /// Set the amplitude.
    pub fn set_amplitude(&mut self, amplitude: Voltage) -> Result<(), RedPitayaError> {
        check_amplitude(amplitude)?;
        let out = self.output;
        self.link
            .with(|ch| ch.set_amplitude(out, amplitude.as_volts()))?;
        self.config.amplitude = amplitude;
        Ok(())
    }

    /// Set the DC offset.
    pub fn set_offset(&mut self, offset: Voltage) -> Result<(), RedPitayaError> {
        check_offset(offset)?;
        let out = self.output;
        self.link.with(|ch| ch.set_offset(out, offset.as_volts()))?;
        self.config.offset = offset;
        Ok(())
    }

    /// Set the phase.
    pub fn set_phase(&mut self, phase: Angle) -> Result<(), RedPitayaError> {
        check_phase(phase)?;
        let out = self.output;
        self.link.with(|ch| ch.set_phase(out, phase.as_degrees()))?;
        self.config.phase = phase;
        Ok(())
    }

    /// Set the duty cycle as a fraction between 0 and 1.
    pub fn set_duty_cycle(&mut self, duty_cycle: f64) -> Result<(), RedPitayaError> {
        check_duty_cycle(duty_cycle)?;
        let out = self.output;
        self.link.with(|ch| ch.set_duty_cycle(out, duty_cycle))?;
        self.config.duty_cycle = duty_cycle;
        Ok(())
    }

    /// Set how the frequency progresses during a sweep.
    pub fn set_sweep_mode(&mut self, mode: SweepMode) -> Result<(), RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| ch.set_sweep_mode(out, mode))?;
        self.record_sweep(|s| s.mode = Some(mode));
        Ok(())
    }

    /// Set the start frequency of the sweep.
    pub fn set_sweep_start_frequency(&mut self, frequency: Frequency) -> Result<(), RedPitayaError> {
        check_frequency("Sweep start frequency", frequency)?;
        let out = self.output;
        self.link
            .with(|ch| ch.set_sweep_start_frequency(out, frequency.as_hertz()))?;
        self.record_sweep(|s| s.start_frequency = Some(frequency));
        Ok(())
    }

    /// Set the stop frequency of the sweep.
    pub fn set_sweep_stop_frequency(&mut self, frequency: Frequency) -> Result<(), RedPitayaError> {
        check_frequency("Sweep stop frequency", frequency)?;
        let out = self.output;
        self.link
            .with(|ch| ch.set_sweep_stop_frequency(out, frequency.as_hertz()))?;
        self.record_sweep(|s| s.stop_frequency = Some(frequency));
        Ok(())
    }

    /// Set the duration of one sweep.
    pub fn set_sweep_duration(&mut self, duration: Duration) -> Result<(), RedPitayaError> {
        check_sweep_duration(duration)?;
        let out = self.output;
        self.link
            .with(|ch| ch.set_sweep_time_us(out, sweep_micros(duration)))?;
        self.record_sweep(|s| s.duration = Some(duration));
        Ok(())
    }

    /// Set the direction of the sweep.
    pub fn set_sweep_direction(&mut self, direction: SweepDirection) -> Result<(), RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| ch.set_sweep_direction(out, direction))?;
        self.record_sweep(|s| s.direction = Some(direction));
        Ok(())
    }

    /// Switch the sweep on or off.
    pub fn set_sweep_enabled(&mut self, enable: bool) -> Result<(), RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| ch.set_sweep_enabled(out, enable))?;
        self.record_sweep(|s| s.enabled = Some(enable));
        Ok(())
    }

    /// Switch the output voltage on or off.
    pub fn set_enabled(&mut self, enable: bool) -> Result<(), RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| ch.set_output_enabled(out, enable))?;
        debug!("Generator {out} output {}", if enable { "on" } else { "off" });
        self.config.enabled = enable;
        Ok(())
    }

    /// Query whether the output voltage is switched on.
    pub fn is_enabled(&mut self) -> Result<bool, RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| ch.output_enabled(out))
    }

    /// Read the amplitude back from the board.
    pub fn amplitude(&mut self) -> Result<Voltage, RedPitayaError> {
        let out = self.output;
        Ok(Voltage::from_volts(self.link.with(|ch| ch.amplitude(out))?))
    }

    /// Read the fixed frequency back from the board.
    pub fn frequency(&mut self) -> Result<Frequency, RedPitayaError> {
        let out = self.output;
        Ok(Frequency::from_hertz(
            self.link.with(|ch| ch.frequency(out))?,
        ))
    }

    /// Commit the pending configuration to the active generator.
    ///
    /// This does not switch the output on, see [`GeneratorSession::set_enabled`].
    pub fn run(&mut self) -> Result<(), RedPitayaError> {
        let out = self.output;
        self.link.with(|ch| ch.run(out))
    }

    /// Reset both generators of the board to their defaults.
    pub fn reset_outputs(&mut self) -> Result<(), RedPitayaError> {
        self.link.with(|ch| ch.reset_outputs())?;
        self.config = GeneratorConfig::default();
        self.sweep_fields = SweepFields::default();
        Ok(())
    }

    /// Switch the output off and close the connection if this session holds the master link.
    pub fn release(mut self) -> Result<(), RedPitayaError> {
        self.set_enabled(false)?;
        info!("Generator {} released", self.output);
        if self.link.is_master() {
            self.link.close()?;
        }
        Ok(())
    }

    /// The output this session drives.
    pub fn output(&self) -> OutputChannel {
        self.output
    }

    /// The settings as last written by this session.
    ///
    /// The sweep is `None` until every sweep field was written, either by
    /// [`GeneratorSession::configure`] or by the individual sweep setters.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The link this session talks through.
    pub fn link(&self) -> &BoardLink<C> {
        &self.link
    }

    fn record_sweep<F: FnOnce(&mut SweepFields)>(&mut self, update: F) {
        update(&mut self.sweep_fields);
        if let Some(sweep) = self.sweep_fields.complete() {
            self.config.sweep = Some(sweep);
        }
    }
}
