//! Board settings as they are written to the SCPI server.

use std::fmt::Display;

use serde::Deserialize;

use crate::RedPitayaError;

/// Number of fast analog inputs and outputs of the board.
pub const NOF_CHANNELS: usize = 2;

/// One of the two fast analog inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputChannel {
    /// Input 1
    In1,
    /// Input 2
    In2,
}

/// One of the two fast analog outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputChannel {
    /// Output 1
    Out1,
    /// Output 2
    Out2,
}

impl InputChannel {
    /// The one-based index used in SCPI commands, e.g., `ACQ:SOUR1`.
    pub fn index(&self) -> usize {
        match self {
            InputChannel::In1 => 1,
            InputChannel::In2 => 2,
        }
    }
}

impl OutputChannel {
    /// The one-based index used in SCPI commands, e.g., `SOUR1` and `OUTPUT1`.
    pub fn index(&self) -> usize {
        match self {
            OutputChannel::Out1 => 1,
            OutputChannel::Out2 => 2,
        }
    }
}

impl TryFrom<usize> for InputChannel {
    type Error = RedPitayaError;

    fn try_from(idx: usize) -> Result<Self, Self::Error> {
        match idx {
            1 => Ok(InputChannel::In1),
            2 => Ok(InputChannel::In2),
            _ => Err(RedPitayaError::ChannelIndexOutOfRange {
                idx,
                nof_channels: NOF_CHANNELS,
            }),
        }
    }
}

impl TryFrom<usize> for OutputChannel {
    type Error = RedPitayaError;

    fn try_from(idx: usize) -> Result<Self, Self::Error> {
        match idx {
            1 => Ok(OutputChannel::Out1),
            2 => Ok(OutputChannel::Out2),
            _ => Err(RedPitayaError::ChannelIndexOutOfRange {
                idx,
                nof_channels: NOF_CHANNELS,
            }),
        }
    }
}

impl Display for InputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IN{}", self.index())
    }
}

impl Display for OutputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OUT{}", self.index())
    }
}

/// Format in which the board transfers acquired samples.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SampleFormat {
    /// Comma separated text in braces, e.g., `{0.1,0.2}`.
    #[default]
    #[serde(rename = "ASCII")]
    Ascii,
    /// IEEE 488.2 binary block of big-endian values.
    #[serde(rename = "BIN")]
    Bin,
}

/// Units of the acquired samples.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Units {
    /// Calibrated volts.
    #[default]
    #[serde(rename = "VOLTS")]
    Volts,
    /// Raw ADC counts.
    #[serde(rename = "RAW")]
    Raw,
}

/// Trigger sources of the acquisition.
///
/// `PE` and `NE` in the command strings stand for positive and negative edge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TriggerSource {
    /// Trigger disabled.
    #[serde(rename = "DISABLED")]
    Disabled,
    /// Trigger immediately.
    #[serde(rename = "NOW")]
    Now,
    /// Input 1, positive edge.
    #[default]
    #[serde(rename = "CH1_PE")]
    Ch1PositiveEdge,
    /// Input 1, negative edge.
    #[serde(rename = "CH1_NE")]
    Ch1NegativeEdge,
    /// Input 2, positive edge.
    #[serde(rename = "CH2_PE")]
    Ch2PositiveEdge,
    /// Input 2, negative edge.
    #[serde(rename = "CH2_NE")]
    Ch2NegativeEdge,
    /// External trigger, positive edge.
    #[serde(rename = "EXT_PE")]
    ExtPositiveEdge,
    /// External trigger, negative edge.
    #[serde(rename = "EXT_NE")]
    ExtNegativeEdge,
    /// Arbitrary waveform generator, positive edge.
    #[serde(rename = "AWG_PE")]
    AwgPositiveEdge,
    /// Arbitrary waveform generator, negative edge.
    #[serde(rename = "AWG_NE")]
    AwgNegativeEdge,
}

/// Waveform shapes of the generator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Shape {
    /// Sine
    #[default]
    #[serde(rename = "SINE")]
    Sine,
    /// Square
    #[serde(rename = "SQUARE")]
    Square,
    /// Triangle
    #[serde(rename = "TRIANGLE")]
    Triangle,
    /// Rising sawtooth
    #[serde(rename = "SAWU")]
    SawUp,
    /// Falling sawtooth
    #[serde(rename = "SAWD")]
    SawDown,
    /// Pulse width modulation, uses the duty cycle.
    #[serde(rename = "PWM")]
    Pwm,
    /// Arbitrary waveform previously uploaded to the board.
    #[serde(rename = "ARBITRARY")]
    Arbitrary,
    /// Positive DC level
    #[serde(rename = "DC")]
    Dc,
    /// Negative DC level
    #[serde(rename = "DC_NEG")]
    DcNeg,
}

/// How the frequency progresses during a sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SweepMode {
    /// Linear progression
    #[default]
    #[serde(rename = "LINEAR")]
    Linear,
    /// Logarithmic progression
    #[serde(rename = "LOG")]
    Log,
}

/// Direction of a sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SweepDirection {
    /// Start to stop, then restart.
    #[default]
    #[serde(rename = "NORMAL")]
    Normal,
    /// Start to stop and back.
    #[serde(rename = "UP_DOWN")]
    UpDown,
}

impl SampleFormat {
    /// Convert to the string used in commands.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            SampleFormat::Ascii => "ASCII",
            SampleFormat::Bin => "BIN",
        }
    }
}

impl Units {
    /// Convert to the string used in commands.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            Units::Volts => "VOLTS",
            Units::Raw => "RAW",
        }
    }
}

impl TriggerSource {
    /// Convert to the string used in commands.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            TriggerSource::Disabled => "DISABLED",
            TriggerSource::Now => "NOW",
            TriggerSource::Ch1PositiveEdge => "CH1_PE",
            TriggerSource::Ch1NegativeEdge => "CH1_NE",
            TriggerSource::Ch2PositiveEdge => "CH2_PE",
            TriggerSource::Ch2NegativeEdge => "CH2_NE",
            TriggerSource::ExtPositiveEdge => "EXT_PE",
            TriggerSource::ExtNegativeEdge => "EXT_NE",
            TriggerSource::AwgPositiveEdge => "AWG_PE",
            TriggerSource::AwgNegativeEdge => "AWG_NE",
        }
    }
}

impl Shape {
    /// Convert to the string used in commands.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            Shape::Sine => "SINE",
            Shape::Square => "SQUARE",
            Shape::Triangle => "TRIANGLE",
            Shape::SawUp => "SAWU",
            Shape::SawDown => "SAWD",
            Shape::Pwm => "PWM",
            Shape::Arbitrary => "ARBITRARY",
            Shape::Dc => "DC",
            Shape::DcNeg => "DC_NEG",
        }
    }
}

impl SweepMode {
    /// Convert to the string used in commands.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            SweepMode::Linear => "LINEAR",
            SweepMode::Log => "LOG",
        }
    }
}

impl SweepDirection {
    /// Convert to the string used in commands.
    pub(crate) fn as_str(&self) -> &str {
        match self {
            SweepDirection::Normal => "NORMAL",
            SweepDirection::UpDown => "UP_DOWN",
        }
    }
}

macro_rules! display_as_cmd_str {
    ($($ty:ty),*) => {
        $(
            impl Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.as_str())
                }
            }
        )*
    };
}

display_as_cmd_str!(SampleFormat, Units, TriggerSource, Shape, SweepMode, SweepDirection);
