//! Error type for the Red Pitaya sessions.

use std::{fmt::Display, time::Duration};

use scpirs::ScpiError;
use thiserror::Error;

use crate::poll::PollCondition;

/// Phase of the acquisition handshake during which a channel fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPhase {
    /// Polling the trigger status.
    TriggerPoll,
    /// Polling the buffer-filled flag.
    BufferPoll,
    /// Reading samples or the trigger delay back from the board.
    ReadBack,
}

impl Display for AcquisitionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionPhase::TriggerPoll => write!(f, "waiting for the trigger"),
            AcquisitionPhase::BufferPoll => write!(f, "waiting for the buffer to fill"),
            AcquisitionPhase::ReadBack => write!(f, "reading back the samples"),
        }
    }
}

impl From<PollCondition> for AcquisitionPhase {
    fn from(value: PollCondition) -> Self {
        match value {
            PollCondition::Triggered => AcquisitionPhase::TriggerPoll,
            PollCondition::BufferFilled => AcquisitionPhase::BufferPoll,
        }
    }
}

/// The error enum for all Red Pitaya sessions.
///
/// Configuration errors are caller faults and are always returned before any command is sent to
/// the board. Channel errors are propagated immediately without retry, such that a session can
/// be left partially configured after a fault.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RedPitayaError {
    /// The requested number of samples does not fit into the acquisition buffer.
    #[error(
        "Requested {nsamples} samples, but the acquisition buffer holds between 1 and {buffer_length} samples."
    )]
    SampleCountOutOfRange {
        /// Number of samples that was requested.
        nsamples: usize,
        /// Length of the hardware buffer.
        buffer_length: usize,
    },
    /// The decimation is not a power of two between 1 and 65536.
    #[error("Decimation {0} is invalid. It must be a power of two between 1 and 65536.")]
    InvalidDecimation(u32),
    /// A float parameter is out of the range the hardware accepts.
    #[error("{name} value {value} is out of range. Allowed range is [{min}, {max}]")]
    FloatValueOutOfRange {
        /// Name of the parameter.
        name: &'static str,
        /// The value that is out of range.
        value: f64,
        /// The minimum value that is allowed.
        min: f64,
        /// The maximum value that is allowed.
        max: f64,
    },
    /// The channel index requested is out of range.
    #[error(
        "Channel with index {idx} is out of range. Channels are numbered 1 to {nof_channels}."
    )]
    ChannelIndexOutOfRange {
        /// Index of the channel that is out of range.
        idx: usize,
        /// Total number of channels.
        nof_channels: usize,
    },
    /// An argument is invalid, the message is intended for the user.
    #[error("{0}")]
    InvalidArgument(String),
    /// Transport failure reported by the command channel.
    #[error(transparent)]
    Channel(#[from] ScpiError),
    /// A channel fault occurred while polling or reading back an acquisition.
    #[error("Acquisition failed while {phase}: {source}")]
    Acquisition {
        /// Phase of the handshake in which the fault occurred.
        phase: AcquisitionPhase,
        /// The underlying channel error.
        source: ScpiError,
    },
    /// A poll did not observe its condition within the configured bound.
    #[error("Timed out after {timeout:?} while waiting for {condition}.")]
    Timeout {
        /// The condition that was polled.
        condition: PollCondition,
        /// The configured bound.
        timeout: Duration,
    },
    /// A poll was cancelled through its cancel token.
    #[error("Waiting for {condition} was cancelled.")]
    Cancelled {
        /// The condition that was polled.
        condition: PollCondition,
    },
    /// A slave link tried to close the connection it only borrows.
    #[error("Only the master link owns the connection and may close it.")]
    NotOwner,
    /// The master link already closed the connection.
    #[error("The connection to the board was closed by its master link.")]
    LinkClosed,
    /// Loading the configuration failed.
    #[error(transparent)]
    ConfigFile(#[from] confique::Error),
}

impl RedPitayaError {
    /// Returns `true` if the error is a caller fault in the configuration, which is always
    /// detected before anything is sent to the board.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RedPitayaError::SampleCountOutOfRange { .. }
                | RedPitayaError::InvalidDecimation(_)
                | RedPitayaError::FloatValueOutOfRange { .. }
                | RedPitayaError::ChannelIndexOutOfRange { .. }
                | RedPitayaError::InvalidArgument(_)
        )
    }
}

/// Check that a float value lies within `[min, max]`.
pub(crate) fn check_range(
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), RedPitayaError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(RedPitayaError::FloatValueOutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}
