//! Viewer front ends that grab data and hand it to the host.
//!
//! The [`ScopeViewer`] grabs one input. The [`SweepViewer`] composes an acquisition and a
//! generator session: it runs a frequency sweep on one output while capturing both inputs.
//! Completed grabs are delivered as a [`DataExport`] to a [`DataSink`], which can be any
//! closure taking a [`DataExport`].

use log::{info, warn};

use crate::{
    AcquisitionSession, CommandChannel, GeneratorSession, RedPitayaError, SessionState,
    axis::{self, SampleSeries, TriggerDelay},
    settings::InputChannel,
};

/// Name of the exports emitted by the viewers.
pub const EXPORT_NAME: &str = "RedPitaya";

/// A series labeled with the channel it was acquired on.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSeries {
    /// Input the series was acquired on.
    pub input: InputChannel,
    /// Label for display, e.g., `"AI0"`.
    pub label: String,
    /// The samples and their time axis.
    pub series: SampleSeries,
}

/// A bundle of series from one grab.
#[derive(Debug, Clone, PartialEq)]
pub struct DataExport {
    /// Name of the export.
    pub name: String,
    /// The series of the grab.
    pub data: Vec<LabeledSeries>,
}

/// Receiver of completed grabs.
pub trait DataSink {
    /// Deliver one export.
    fn emit(&mut self, export: DataExport);
}

impl<F: FnMut(DataExport)> DataSink for F {
    fn emit(&mut self, export: DataExport) {
        self(export)
    }
}

/// Settings that decide how many samples a viewer grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerSettings {
    /// Number of samples per grab.
    pub nsamples: usize,
    /// Grab the whole buffer instead of `nsamples`.
    pub all_samples: bool,
    /// Center the window around the trigger.
    pub center_trigger: bool,
}

impl ViewerSettings {
    fn check(&self, buffer_length: usize) -> Result<(), RedPitayaError> {
        if self.nsamples == 0 || self.nsamples > buffer_length {
            return Err(RedPitayaError::SampleCountOutOfRange {
                nsamples: self.nsamples,
                buffer_length,
            });
        }
        Ok(())
    }
}

/// Label of an input in exports. Inputs are labeled from zero.
fn input_label(input: InputChannel) -> String {
    format!("AI{}", input.index() - 1)
}

/// Viewer of one input, like the display of an oscilloscope.
pub struct ScopeViewer<C: CommandChannel> {
    acquisition: AcquisitionSession<C>,
    settings: ViewerSettings,
    board_name: String,
}

impl<C: CommandChannel> ScopeViewer<C> {
    /// Create a viewer from an acquisition session.
    ///
    /// The board name is queried once. Sample count and trigger position are taken from the
    /// configuration of the session.
    pub fn try_new(acquisition: AcquisitionSession<C>) -> Result<Self, RedPitayaError> {
        let board_name = acquisition.link().with(|ch| ch.board_name())?;
        info!("Successfully connected to the Red Pitaya board {board_name}");
        let config = acquisition.config();
        let settings = ViewerSettings {
            nsamples: config.nsamples,
            all_samples: false,
            center_trigger: config.center_trigger,
        };
        Ok(ScopeViewer {
            acquisition,
            settings,
            board_name,
        })
    }

    /// Replace the viewer settings.
    ///
    /// Fails with a configuration error if `nsamples` does not fit into the buffer.
    pub fn set_settings(&mut self, settings: ViewerSettings) -> Result<(), RedPitayaError> {
        settings.check(self.acquisition.buffer_length())?;
        self.settings = settings;
        Ok(())
    }

    /// Number of samples the next grab returns.
    pub fn nsamples(&self) -> usize {
        if self.settings.all_samples {
            self.acquisition.buffer_length()
        } else {
            self.settings.nsamples
        }
    }

    /// Write a new decimation and return the resulting sample rate in samples per second.
    pub fn set_decimation(&mut self, decimation: u32) -> Result<f64, RedPitayaError> {
        self.acquisition.set_decimation(decimation)?;
        self.acquisition.sample_rate()
    }

    /// Write a new trigger level in volts.
    pub fn set_trigger_level(&mut self, level: f64) -> Result<(), RedPitayaError> {
        self.acquisition.set_trigger_level(level)
    }

    /// Grab once and emit the series, labeled `"AI0"` for input 1 and `"AI1"` for input 2.
    pub fn grab<S: DataSink>(&mut self, sink: &mut S) -> Result<(), RedPitayaError> {
        self.grab_with(sink, || {})
    }

    /// Grab once, calling `on_tick` in every poll iteration, and emit the series.
    pub fn grab_with<S: DataSink, F: FnMut()>(
        &mut self,
        sink: &mut S,
        on_tick: F,
    ) -> Result<(), RedPitayaError> {
        let nsamples = self.nsamples();
        let series = self.acquisition.start_grab_with(
            nsamples,
            self.settings.center_trigger,
            on_tick,
        )?;
        let input = self.acquisition.input();
        sink.emit(DataExport {
            name: EXPORT_NAME.to_string(),
            data: vec![LabeledSeries {
                input,
                label: input_label(input),
                series,
            }],
        });
        Ok(())
    }

    /// Stop the current grab.
    pub fn stop(&mut self) -> Result<(), RedPitayaError> {
        self.acquisition.stop_grab()
    }

    /// Identification string of the board.
    pub fn board_name(&self) -> &str {
        &self.board_name
    }

    /// The underlying acquisition session.
    pub fn acquisition(&mut self) -> &mut AcquisitionSession<C> {
        &mut self.acquisition
    }
}

/// Viewer that sweeps one output while capturing both inputs.
pub struct SweepViewer<C: CommandChannel> {
    acquisition: AcquisitionSession<C>,
    generator: GeneratorSession<C>,
    settings: ViewerSettings,
}

impl<C: CommandChannel> SweepViewer<C> {
    /// Compose a sweep viewer from an acquisition and a generator session on the same board.
    ///
    /// The generator configuration that was last written to `generator` is written again
    /// before every grab, as the outputs are reset first. Sweep settings are only written
    /// again once all of them are known to the session, see [`GeneratorSession::config`].
    pub fn new(
        acquisition: AcquisitionSession<C>,
        generator: GeneratorSession<C>,
        settings: ViewerSettings,
    ) -> Result<Self, RedPitayaError> {
        settings.check(acquisition.buffer_length())?;
        Ok(SweepViewer {
            acquisition,
            generator,
            settings,
        })
    }

    /// Number of samples the next grab returns per input.
    pub fn nsamples(&self) -> usize {
        if self.settings.all_samples {
            self.acquisition.buffer_length()
        } else {
            self.settings.nsamples
        }
    }

    /// Time of the first sample in seconds.
    ///
    /// With a centered trigger, this is half the window before the trigger, otherwise the
    /// window starts at the trigger.
    pub fn axis_offset(&self) -> Result<f64, RedPitayaError> {
        if self.settings.center_trigger {
            let clock_rate = self.acquisition.link().clock_rate()?;
            let decimation = self.acquisition.decimation() as f64;
            Ok(-decimation / clock_rate * self.nsamples() as f64 / 2.0)
        } else {
            Ok(0.0)
        }
    }

    /// Run one sweep, capture both inputs, and emit them.
    pub fn grab<S: DataSink>(&mut self, sink: &mut S) -> Result<(), RedPitayaError> {
        self.grab_with(sink, || {})
    }

    /// Same as [`SweepViewer::grab`], calling `on_tick` in every poll iteration.
    ///
    /// On failure, the acquisition is stopped if it is still armed and the output is switched
    /// off, both as best effort, before the error is returned.
    pub fn grab_with<S: DataSink, F: FnMut()>(
        &mut self,
        sink: &mut S,
        on_tick: F,
    ) -> Result<(), RedPitayaError> {
        match self.sweep(on_tick) {
            Ok(export) => {
                sink.emit(export);
                self.stop()
            }
            Err(e) => {
                if self.acquisition.state() != SessionState::Idle {
                    if let Err(stop) = self.acquisition.stop_grab() {
                        warn!("Could not stop the acquisition after a failed sweep: {stop}");
                    }
                }
                if let Err(off) = self.generator.set_enabled(false) {
                    warn!("Could not switch the output off after a failed sweep: {off}");
                }
                Err(e)
            }
        }
    }

    fn sweep<F: FnMut()>(&mut self, on_tick: F) -> Result<DataExport, RedPitayaError> {
        let nsamples = self.nsamples();
        // The sweep is switched on only after arming.
        let mut config = self.generator.config().clone();
        if let Some(sweep) = config.sweep.as_mut() {
            sweep.enabled = false;
        }

        self.generator.reset_outputs()?;
        self.generator.configure(config)?;

        self.acquisition.arm(nsamples, self.settings.center_trigger)?;

        self.generator.set_sweep_enabled(true)?;
        self.generator.set_enabled(true)?;
        self.generator.run()?;

        self.acquisition.wait_for_data(on_tick)?;

        let clock_rate = self.acquisition.link().clock_rate()?;
        let decimation = self.acquisition.decimation();
        let offset = self.axis_offset()?;
        let mut data = Vec::new();
        for input in [InputChannel::In1, InputChannel::In2] {
            let values = self.acquisition.read_samples(input, nsamples)?;
            data.push(LabeledSeries {
                input,
                label: input_label(input),
                series: axis::map(values, decimation, clock_rate, TriggerDelay::Seconds(offset)),
            });
        }
        Ok(DataExport {
            name: EXPORT_NAME.to_string(),
            data,
        })
    }

    /// Stop the acquisition and switch the output off.
    pub fn stop(&mut self) -> Result<(), RedPitayaError> {
        self.acquisition.stop_grab()?;
        self.generator.set_enabled(false)
    }

    /// The underlying acquisition session.
    pub fn acquisition(&mut self) -> &mut AcquisitionSession<C> {
        &mut self.acquisition
    }

    /// The underlying generator session.
    pub fn generator(&mut self) -> &mut GeneratorSession<C> {
        &mut self.generator
    }

    /// Take the viewer apart into its sessions.
    pub fn into_sessions(self) -> (AcquisitionSession<C>, GeneratorSession<C>) {
        (self.acquisition, self.generator)
    }
}
