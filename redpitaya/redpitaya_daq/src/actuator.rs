//! Drive amplitude and frequency of one output like the axes of a stage.

use std::fmt::Display;

use log::{debug, warn};
use measurements::{Frequency, Voltage};

use crate::{
    AMPLITUDE_MAX, CommandChannel, FREQUENCY_MAX, FREQUENCY_MIN, GeneratorConfig,
    GeneratorSession, RedPitayaError,
};

/// The axes of a [`GeneratorActuator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorAxis {
    /// Output amplitude in volts.
    Amplitude,
    /// Output frequency in Hz.
    Frequency,
}

impl ActuatorAxis {
    /// Unit of the axis values.
    pub fn unit(&self) -> &'static str {
        match self {
            ActuatorAxis::Amplitude => "V",
            ActuatorAxis::Frequency => "Hz",
        }
    }

    /// Lower and upper bound of the axis, both inclusive.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            ActuatorAxis::Amplitude => (0.0, AMPLITUDE_MAX),
            ActuatorAxis::Frequency => (FREQUENCY_MIN, FREQUENCY_MAX),
        }
    }

    fn idx(&self) -> usize {
        match self {
            ActuatorAxis::Amplitude => 0,
            ActuatorAxis::Frequency => 1,
        }
    }
}

impl Display for ActuatorAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuatorAxis::Amplitude => write!(f, "amplitude"),
            ActuatorAxis::Frequency => write!(f, "frequency"),
        }
    }
}

/// Actuator with an amplitude and a frequency axis on one generator output.
///
/// Targets outside the bounds of an axis are clamped, not rejected.
pub struct GeneratorActuator<C: CommandChannel> {
    generator: GeneratorSession<C>,
    targets: [f64; 2],
}

impl<C: CommandChannel> GeneratorActuator<C> {
    /// Initialize the actuator.
    ///
    /// Shape and output state of `config` are written, followed by a run command. Amplitude
    /// and frequency of `config` are the starting targets for relative moves.
    pub fn try_new(
        mut generator: GeneratorSession<C>,
        config: &GeneratorConfig,
    ) -> Result<Self, RedPitayaError> {
        generator.set_shape(config.shape)?;
        generator.set_enabled(config.enabled)?;
        generator.run()?;
        Ok(GeneratorActuator {
            generator,
            targets: [config.amplitude.as_volts(), config.frequency.as_hertz()],
        })
    }

    /// Read the value of an axis back from the board.
    pub fn current_value(&mut self, axis: ActuatorAxis) -> Result<f64, RedPitayaError> {
        match axis {
            ActuatorAxis::Amplitude => Ok(self.generator.amplitude()?.as_volts()),
            ActuatorAxis::Frequency => Ok(self.generator.frequency()?.as_hertz()),
        }
    }

    /// Move an axis to an absolute value and return the value that was written.
    ///
    /// The output is switched on first if it is off.
    pub fn move_abs(&mut self, axis: ActuatorAxis, value: f64) -> Result<f64, RedPitayaError> {
        if !self.generator.is_enabled()? {
            self.generator.set_enabled(true)?;
        }
        let (min, max) = axis.bounds();
        let target = value.clamp(min, max);
        if target != value {
            warn!(
                "Target {value} {} of the {axis} is out of bounds, moving to {target} {} instead",
                axis.unit(),
                axis.unit()
            );
        }
        match axis {
            ActuatorAxis::Amplitude => self
                .generator
                .set_amplitude(Voltage::from_volts(target))?,
            ActuatorAxis::Frequency => self
                .generator
                .set_frequency(Frequency::from_hertz(target))?,
        }
        debug!("Moved {axis} to {target} {}", axis.unit());
        self.targets[axis.idx()] = target;
        Ok(target)
    }

    /// Move an axis relative to its last target.
    pub fn move_rel(&mut self, axis: ActuatorAxis, delta: f64) -> Result<f64, RedPitayaError> {
        let value = self.targets[axis.idx()] + delta;
        self.move_abs(axis, value)
    }

    /// The last target of an axis.
    pub fn target(&self, axis: ActuatorAxis) -> f64 {
        self.targets[axis.idx()]
    }

    /// Switch the output off and release the generator session.
    pub fn close(self) -> Result<(), RedPitayaError> {
        self.generator.release()
    }
}
