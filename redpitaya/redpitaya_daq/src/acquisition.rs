//! The acquisition session drives the fast analog inputs through the trigger handshake.
//!
//! A grab runs through the states of [`SessionState`]:
//!
//! 1. The trigger delay is written such that the requested window sits centered in the buffer
//!    or starts at the trigger.
//! 2. The acquisition is started (`Armed`). The session sleeps for the time the requested window
//!    needs to fill, then sets the trigger source. Setting the source earlier would let the
//!    pre-arm interval count as a trigger.
//! 3. The trigger status is polled (`WaitingTrigger`), then the buffer-filled flag
//!    (`WaitingBuffer`).
//! 4. The samples are read back and mapped onto a time axis (`Complete`).
//!
//! [`AcquisitionSession::stop_grab`] is allowed in every state and returns the session to
//! `Idle`.

use std::{thread, time::Duration};

use log::{debug, info, warn};

use crate::{
    BoardLink, CommandChannel, RedPitayaError,
    axis::{self, SampleSeries, TriggerDelay},
    error::{AcquisitionPhase, check_range},
    poll::{PollCondition, PollOptions, poll_until},
    settings::{InputChannel, SampleFormat, TriggerSource, Units},
};

/// Largest decimation factor the FPGA supports.
pub const DECIMATION_MAX: u32 = 65536;

/// Shortest sleep between starting the acquisition and setting the trigger source.
pub const MIN_ARM_WAIT: Duration = Duration::from_millis(1);

/// Trigger levels beyond this magnitude in volts are rejected (high voltage jumper setting).
pub const TRIGGER_LEVEL_MAX: f64 = 20.0;

/// States of an acquisition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No acquisition running.
    Idle,
    /// The acquisition was started, the trigger source is set in this state.
    Armed,
    /// Polling for the trigger.
    WaitingTrigger,
    /// Polling for the buffer to be filled.
    WaitingBuffer,
    /// The samples were read back.
    Complete,
}

/// Configuration of the acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Decimation factor, a power of two between 1 and [`DECIMATION_MAX`].
    pub decimation: u32,
    /// Transfer format of the samples.
    pub sample_format: SampleFormat,
    /// Units of the samples.
    pub units: Units,
    /// Trigger source, applied during the grab.
    pub trigger_source: TriggerSource,
    /// Trigger level in volts.
    pub trigger_level: f64,
    /// Number of samples per grab.
    pub nsamples: usize,
    /// Center the window around the trigger instead of starting at it.
    pub center_trigger: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        AcquisitionConfig {
            decimation: 1,
            sample_format: SampleFormat::Ascii,
            units: Units::Volts,
            trigger_source: TriggerSource::Ch1PositiveEdge,
            trigger_level: 0.0,
            nsamples: 16384,
            center_trigger: false,
        }
    }
}

/// Trigger delay in samples that positions a window of `nsamples` within the buffer.
///
/// With `center_trigger` the window is centered around the trigger, i.e.,
/// `-(buffer_length / 2 - nsamples / 2)`, otherwise the delay is `-(buffer_length / 2)`. The
/// halves are computed exactly and the result is truncated toward zero.
///
/// ```
/// use redpitaya_daq::trigger_delay_samples;
///
/// assert_eq!(trigger_delay_samples(16384, 4096, true), -6144);
/// assert_eq!(trigger_delay_samples(16384, 4096, false), -8192);
/// ```
pub fn trigger_delay_samples(buffer_length: usize, nsamples: usize, center_trigger: bool) -> i64 {
    let half_buffer = buffer_length as f64 / 2.0;
    let delay = if center_trigger {
        half_buffer - nsamples as f64 / 2.0
    } else {
        half_buffer
    };
    -(delay as i64)
}

/// Time a window of `nsamples` needs to fill, but at least [`MIN_ARM_WAIT`].
pub fn expected_fill_time(nsamples: usize, decimation: u32, clock_rate: f64) -> Duration {
    let secs = nsamples as f64 / (clock_rate / decimation as f64);
    Duration::try_from_secs_f64(secs)
        .unwrap_or(MIN_ARM_WAIT)
        .max(MIN_ARM_WAIT)
}

/// Check that the decimation is a power of two the FPGA supports.
pub(crate) fn check_decimation(decimation: u32) -> Result<(), RedPitayaError> {
    if decimation.is_power_of_two() && decimation <= DECIMATION_MAX {
        Ok(())
    } else {
        Err(RedPitayaError::InvalidDecimation(decimation))
    }
}

/// An acquisition session on one input of the board.
pub struct AcquisitionSession<C: CommandChannel> {
    link: BoardLink<C>,
    input: InputChannel,
    poll: PollOptions,
    buffer_length: usize,
    decimation: u32,
    config: AcquisitionConfig,
    state: SessionState,
}

impl<C: CommandChannel> AcquisitionSession<C> {
    /// Create a new session on the given link.
    ///
    /// This resets the acquisition of the board and reads the buffer length and the current
    /// decimation, hence it can fail if the board is not reachable.
    ///
    /// # Arguments
    /// * `link` - Master or slave link to the board.
    /// * `input` - Input that [`AcquisitionSession::start_grab`] reads.
    /// * `poll` - Options of the trigger and buffer poll loops.
    pub fn try_new(
        link: BoardLink<C>,
        input: InputChannel,
        poll: PollOptions,
    ) -> Result<Self, RedPitayaError> {
        link.with(|ch| ch.acquisition_reset())?;
        let buffer_length = link.with(|ch| ch.buffer_length())?;
        let decimation = link.with(|ch| ch.decimation())?;
        info!("Acquisition session on {input}: buffer length {buffer_length}, decimation {decimation}");
        let config = AcquisitionConfig {
            decimation,
            nsamples: buffer_length,
            ..AcquisitionConfig::default()
        };
        Ok(AcquisitionSession {
            link,
            input,
            poll,
            buffer_length,
            decimation,
            config,
            state: SessionState::Idle,
        })
    }

    /// Validate and write an acquisition configuration.
    ///
    /// Nothing is sent if the configuration is invalid. Afterwards, format, units, decimation,
    /// and trigger level are written one after the other. If the board fails in between, the
    /// error is returned immediately and the board keeps the settings that were written so far.
    pub fn configure(&mut self, config: AcquisitionConfig) -> Result<(), RedPitayaError> {
        self.check_nsamples(config.nsamples)?;
        check_decimation(config.decimation)?;
        check_range(
            "Trigger level",
            config.trigger_level,
            -TRIGGER_LEVEL_MAX,
            TRIGGER_LEVEL_MAX,
        )?;

        self.link.with(|ch| {
            ch.set_acquisition_format(config.sample_format)?;
            ch.set_acquisition_units(config.units)?;
            ch.set_decimation(config.decimation)?;
            ch.set_trigger_level(config.trigger_level)
        })?;
        self.decimation = self.link.with(|ch| ch.decimation())?;
        debug!("Acquisition configured: {config:?}, decimation read back {}", self.decimation);
        self.config = AcquisitionConfig {
            decimation: self.decimation,
            ..config
        };
        Ok(())
    }

    /// Write a new decimation and return the value the board reports back.
    pub fn set_decimation(&mut self, decimation: u32) -> Result<u32, RedPitayaError> {
        check_decimation(decimation)?;
        self.link.with(|ch| ch.set_decimation(decimation))?;
        self.decimation = self.link.with(|ch| ch.decimation())?;
        self.config.decimation = self.decimation;
        Ok(self.decimation)
    }

    /// Write a new trigger level in volts.
    pub fn set_trigger_level(&mut self, level: f64) -> Result<(), RedPitayaError> {
        check_range("Trigger level", level, -TRIGGER_LEVEL_MAX, TRIGGER_LEVEL_MAX)?;
        self.link.with(|ch| ch.set_trigger_level(level))?;
        self.config.trigger_level = level;
        Ok(())
    }

    /// Set the trigger source that the next grab applies after arming.
    pub fn set_trigger_source(&mut self, source: TriggerSource) {
        self.config.trigger_source = source;
    }

    /// Replace the poll options, e.g., to add a timeout or a cancel token.
    pub fn set_poll_options(&mut self, poll: PollOptions) {
        self.poll = poll;
    }

    /// Grab `nsamples` samples of the session's input.
    ///
    /// This blocks until the trigger fired and the buffer is filled. Without a timeout in the
    /// poll options, a board that never triggers blocks forever.
    pub fn start_grab(
        &mut self,
        nsamples: usize,
        center_trigger: bool,
    ) -> Result<SampleSeries, RedPitayaError> {
        self.start_grab_with(nsamples, center_trigger, || {})
    }

    /// Same as [`AcquisitionSession::start_grab`], but calls `on_tick` in every poll iteration.
    pub fn start_grab_with<F: FnMut()>(
        &mut self,
        nsamples: usize,
        center_trigger: bool,
        on_tick: F,
    ) -> Result<SampleSeries, RedPitayaError> {
        info!("Grabbing {nsamples} samples on {}", self.input);
        self.arm(nsamples, center_trigger)?;
        self.wait_for_data(on_tick)?;
        let series = self.read_series(self.input, nsamples)?;
        info!("Grab of {} samples complete", series.len());
        Ok(series)
    }

    /// Write the trigger delay, start the acquisition, and set the trigger source.
    ///
    /// The session is `Armed` afterwards.
    pub fn arm(&mut self, nsamples: usize, center_trigger: bool) -> Result<(), RedPitayaError> {
        self.check_nsamples(nsamples)?;
        if !matches!(self.state, SessionState::Idle | SessionState::Complete) {
            return Err(RedPitayaError::InvalidArgument(format!(
                "Cannot arm the acquisition in state {:?}, stop the running grab first.",
                self.state
            )));
        }
        let clock_rate = self.link.clock_rate()?;
        let wait = expected_fill_time(nsamples, self.decimation, clock_rate);
        let delay = trigger_delay_samples(self.buffer_length, nsamples, center_trigger);

        self.link.with(|ch| ch.set_trigger_delay_samples(delay))?;
        self.link.with(|ch| ch.acquisition_start())?;
        self.transition(SessionState::Armed);

        thread::sleep(wait);
        let source = self.config.trigger_source;
        if let Err(e) = self.link.with(|ch| ch.set_trigger_source(source)) {
            return Err(self.abort(e, AcquisitionPhase::TriggerPoll));
        }
        Ok(())
    }

    /// Poll until the trigger fired and the buffer is filled.
    ///
    /// On any failure, the acquisition is stopped as best effort before the error is returned.
    pub fn wait_for_data<F: FnMut()>(&mut self, mut on_tick: F) -> Result<(), RedPitayaError> {
        if self.state != SessionState::Armed {
            return Err(RedPitayaError::InvalidArgument(format!(
                "Cannot wait for data in state {:?}, arm the acquisition first.",
                self.state
            )));
        }

        self.transition(SessionState::WaitingTrigger);
        let res = poll_until(
            PollCondition::Triggered,
            &self.poll,
            || self.link.with(|ch| ch.is_triggered()),
            &mut on_tick,
        );
        if let Err(e) = res {
            return Err(self.abort(e, AcquisitionPhase::TriggerPoll));
        }

        self.transition(SessionState::WaitingBuffer);
        let res = poll_until(
            PollCondition::BufferFilled,
            &self.poll,
            || self.link.with(|ch| ch.is_buffer_filled()),
            &mut on_tick,
        );
        if let Err(e) = res {
            return Err(self.abort(e, AcquisitionPhase::BufferPoll));
        }
        Ok(())
    }

    /// Read `nsamples` samples of an input after the buffer was filled.
    pub fn read_samples(
        &mut self,
        input: InputChannel,
        nsamples: usize,
    ) -> Result<Vec<f64>, RedPitayaError> {
        if !matches!(
            self.state,
            SessionState::WaitingBuffer | SessionState::Complete
        ) {
            return Err(RedPitayaError::InvalidArgument(format!(
                "Cannot read samples in state {:?}, wait for the data first.",
                self.state
            )));
        }
        let values = match self.link.with(|ch| ch.samples(input, nsamples)) {
            Ok(values) => values,
            Err(e) => return Err(self.abort(e, AcquisitionPhase::ReadBack)),
        };
        if values.len() != nsamples {
            let e = RedPitayaError::Channel(scpirs::ScpiError::ResponseParseError(format!(
                "expected {nsamples} samples from {input}, got {}",
                values.len()
            )));
            return Err(self.abort(e, AcquisitionPhase::ReadBack));
        }
        Ok(values)
    }

    /// Read `nsamples` samples of an input and map them onto the time axis.
    ///
    /// The axis offset is the trigger delay that the board reports in nanoseconds.
    pub fn read_series(
        &mut self,
        input: InputChannel,
        nsamples: usize,
    ) -> Result<SampleSeries, RedPitayaError> {
        let values = self.read_samples(input, nsamples)?;
        let delay_ns = match self.link.with(|ch| ch.trigger_delay_ns()) {
            Ok(ns) => ns,
            Err(e) => return Err(self.abort(e, AcquisitionPhase::ReadBack)),
        };
        let clock_rate = self.link.clock_rate()?;
        self.transition(SessionState::Complete);
        Ok(axis::map(
            values,
            self.decimation,
            clock_rate,
            TriggerDelay::Nanoseconds(delay_ns),
        ))
    }

    /// Stop the acquisition.
    ///
    /// Calling this repeatedly is fine. If the board reports an error, it is returned and the
    /// state is left unchanged.
    pub fn stop_grab(&mut self) -> Result<(), RedPitayaError> {
        self.link.with(|ch| ch.acquisition_stop())?;
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Input that [`AcquisitionSession::start_grab`] reads.
    pub fn input(&self) -> InputChannel {
        self.input
    }

    /// Length of the acquisition buffer in samples.
    pub fn buffer_length(&self) -> usize {
        self.buffer_length
    }

    /// Active decimation factor.
    pub fn decimation(&self) -> u32 {
        self.decimation
    }

    /// Sample rate in samples per second, i.e., clock rate over decimation.
    pub fn sample_rate(&self) -> Result<f64, RedPitayaError> {
        Ok(self.link.clock_rate()? / self.decimation as f64)
    }

    /// The configuration that was last applied.
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// The link this session talks through.
    pub fn link(&self) -> &BoardLink<C> {
        &self.link
    }

    fn check_nsamples(&self, nsamples: usize) -> Result<(), RedPitayaError> {
        if nsamples == 0 || nsamples > self.buffer_length {
            return Err(RedPitayaError::SampleCountOutOfRange {
                nsamples,
                buffer_length: self.buffer_length,
            });
        }
        Ok(())
    }

    fn transition(&mut self, state: SessionState) {
        debug!("Acquisition state {:?} -> {state:?}", self.state);
        self.state = state;
    }

    /// Stop the acquisition as best effort and return the error to propagate.
    ///
    /// Channel faults are wrapped into an acquisition error of the given phase.
    fn abort(&mut self, err: RedPitayaError, phase: AcquisitionPhase) -> RedPitayaError {
        let err = match err {
            RedPitayaError::Channel(source) => RedPitayaError::Acquisition { phase, source },
            e => e,
        };
        warn!("Aborting acquisition: {err}");
        match self.link.with(|ch| ch.acquisition_stop()) {
            Ok(()) => self.transition(SessionState::Idle),
            Err(e) => warn!("Could not stop the acquisition after a failure: {e}"),
        }
        err
    }
}
