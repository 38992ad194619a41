//! A rust driver for the fast analog inputs and outputs of Red Pitaya boards.
//!
//! The board runs a SCPI server that listens on TCP port 5000. This crate drives it through the
//! [`CommandChannel`] trait, which is implemented for SCPI by [`ScpiChannel`]. On top of the
//! channel, two sessions are provided:
//!
//! - [`AcquisitionSession`]: Configures the acquisition and runs the trigger handshake, i.e.,
//!   arms the board, polls for the trigger and for the buffer to be filled, and reads the
//!   samples back onto a time axis.
//! - [`GeneratorSession`]: Configures the waveform of one output, including frequency sweeps.
//!
//! Several sessions can talk to the same board. The first one holds the master [`BoardLink`]
//! that owns the connection, all others get slave links that borrow it.
//!
//! The [`ScopeViewer`], [`SweepViewer`], and [`GeneratorActuator`] wrap the sessions for use in
//! a host application. A [`RedPitayaConfig`] can be loaded from a TOML file to set all of them
//! up.
//!
//! # Example
//!
//! This example grabs 1024 samples of input 1 with the trigger centered in the window.
//!
//! ```no_run
//! use redpitaya_daq::{AcquisitionSession, BoardLink, InputChannel, PollOptions, ScpiChannel};
//!
//! let channel = ScpiChannel::connect("192.168.1.100", 5000).unwrap();
//! let link = BoardLink::master(channel);
//! let mut session =
//!     AcquisitionSession::try_new(link, InputChannel::In1, PollOptions::default()).unwrap();
//!
//! let series = session.start_grab(1024, true).unwrap();
//! println!("First sample at {} s", series.axis().offset());
//! session.stop_grab().unwrap();
//! ```

#![deny(missing_docs)]

pub use acquisition::{
    AcquisitionConfig, AcquisitionSession, DECIMATION_MAX, MIN_ARM_WAIT, SessionState,
    TRIGGER_LEVEL_MAX, expected_fill_time, trigger_delay_samples,
};
pub use actuator::{ActuatorAxis, GeneratorActuator};
pub use axis::{SampleSeries, TimeAxis, TriggerDelay};
pub use channel::{CLOCK_RATE_125, CommandChannel};
pub use config::{AcquisitionSettings, GeneratorSettings, RedPitayaConfig};
pub use error::{AcquisitionPhase, RedPitayaError};
pub use generator::{
    AMPLITUDE_MAX, FREQUENCY_MAX, FREQUENCY_MIN, GeneratorConfig, GeneratorSession, OFFSET_MAX,
    PHASE_MAX, SWEEP_TIME_MIN, SweepConfig,
};
pub use link::{BoardLink, Role};
pub use poll::{CancelToken, DEFAULT_POLL_INTERVAL, PollCondition, PollOptions};
pub use scpi_channel::ScpiChannel;
pub use settings::{
    InputChannel, NOF_CHANNELS, OutputChannel, SampleFormat, Shape, SweepDirection, SweepMode,
    TriggerSource, Units,
};
pub use viewer::{
    DataExport, DataSink, EXPORT_NAME, LabeledSeries, ScopeViewer, SweepViewer, ViewerSettings,
};

mod acquisition;
mod actuator;
pub mod axis;
mod channel;
mod config;
mod error;
mod generator;
mod link;
pub mod poll;
mod scpi_channel;
mod settings;
mod viewer;
