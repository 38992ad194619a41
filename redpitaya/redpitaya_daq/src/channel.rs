//! The command channel is the narrow interface the sessions drive the board through.
//!
//! The sessions never format SCPI strings themselves. They only call the methods of the
//! [`CommandChannel`] trait, which is implemented for the SCPI server of the board by
//! [`crate::ScpiChannel`]. Tests can implement the trait directly to simulate boards that
//! misbehave, e.g., never trigger.

use scpirs::ScpiError;

use crate::settings::{
    InputChannel, OutputChannel, SampleFormat, Shape, SweepDirection, SweepMode, TriggerSource,
    Units,
};

/// Sampling clock of the STEMlab 125-14 and 125-10 boards in Hz.
pub const CLOCK_RATE_125: f64 = 125e6;

/// A single ordered request/response conduit to one board.
///
/// Every setter is a fire-and-forget command, no acknowledgment is expected beyond what the
/// transport itself reports.
pub trait CommandChannel {
    /// Sampling clock of the board in Hz. Read-only.
    fn clock_rate(&self) -> f64;

    /// Identification string of the board.
    fn board_name(&mut self) -> Result<String, ScpiError>;

    /// Length of the acquisition buffer in samples. Read-only.
    fn buffer_length(&mut self) -> Result<usize, ScpiError>;

    /// Release the connection. The default implementation has nothing to release.
    fn close(&mut self) -> Result<(), ScpiError> {
        Ok(())
    }

    // Acquisition

    /// Set the decimation factor.
    fn set_decimation(&mut self, decimation: u32) -> Result<(), ScpiError>;

    /// Get the decimation factor that is currently active.
    fn decimation(&mut self) -> Result<u32, ScpiError>;

    /// Set the trigger source.
    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<(), ScpiError>;

    /// Set the trigger level in volts.
    fn set_trigger_level(&mut self, level: f64) -> Result<(), ScpiError>;

    /// Set the trigger delay in samples.
    fn set_trigger_delay_samples(&mut self, delay: i64) -> Result<(), ScpiError>;

    /// Get the trigger delay in samples.
    fn trigger_delay_samples(&mut self) -> Result<i64, ScpiError>;

    /// Get the trigger delay in nanoseconds.
    fn trigger_delay_ns(&mut self) -> Result<i64, ScpiError>;

    /// Set the format in which samples are transferred.
    fn set_acquisition_format(&mut self, format: SampleFormat) -> Result<(), ScpiError>;

    /// Set the units of the transferred samples.
    fn set_acquisition_units(&mut self, units: Units) -> Result<(), ScpiError>;

    /// Start the acquisition.
    fn acquisition_start(&mut self) -> Result<(), ScpiError>;

    /// Stop the acquisition.
    fn acquisition_stop(&mut self) -> Result<(), ScpiError>;

    /// Reset all acquisition settings to their defaults.
    fn acquisition_reset(&mut self) -> Result<(), ScpiError>;

    /// Has the trigger fired since the acquisition was started?
    fn is_triggered(&mut self) -> Result<bool, ScpiError>;

    /// Is the buffer filled after the trigger fired?
    fn is_buffer_filled(&mut self) -> Result<bool, ScpiError>;

    /// Read `count` samples of the given input, ordered by acquisition time.
    fn samples(&mut self, input: InputChannel, count: usize) -> Result<Vec<f64>, ScpiError>;

    // Generator

    /// Reset both generators to their defaults.
    fn reset_outputs(&mut self) -> Result<(), ScpiError>;

    /// Switch the output voltage of a generator on or off.
    fn set_output_enabled(&mut self, output: OutputChannel, enable: bool)
    -> Result<(), ScpiError>;

    /// Is the output voltage of a generator switched on?
    fn output_enabled(&mut self, output: OutputChannel) -> Result<bool, ScpiError>;

    /// Set the waveform shape.
    fn set_shape(&mut self, output: OutputChannel, shape: Shape) -> Result<(), ScpiError>;

    /// Set the fixed frequency in Hz.
    fn set_frequency(&mut self, output: OutputChannel, hertz: f64) -> Result<(), ScpiError>;

    /// Get the fixed frequency in Hz.
    fn frequency(&mut self, output: OutputChannel) -> Result<f64, ScpiError>;

    /// Set the amplitude in volts.
    fn set_amplitude(&mut self, output: OutputChannel, volts: f64) -> Result<(), ScpiError>;

    /// Get the amplitude in volts.
    fn amplitude(&mut self, output: OutputChannel) -> Result<f64, ScpiError>;

    /// Set the DC offset in volts.
    fn set_offset(&mut self, output: OutputChannel, volts: f64) -> Result<(), ScpiError>;

    /// Set the phase in degrees.
    fn set_phase(&mut self, output: OutputChannel, degrees: f64) -> Result<(), ScpiError>;

    /// Set the duty cycle as a fraction between 0 and 1.
    fn set_duty_cycle(&mut self, output: OutputChannel, fraction: f64) -> Result<(), ScpiError>;

    /// Set how the frequency progresses during a sweep.
    fn set_sweep_mode(&mut self, output: OutputChannel, mode: SweepMode)
    -> Result<(), ScpiError>;

    /// Set the start frequency of a sweep in Hz.
    fn set_sweep_start_frequency(
        &mut self,
        output: OutputChannel,
        hertz: f64,
    ) -> Result<(), ScpiError>;

    /// Set the stop frequency of a sweep in Hz.
    fn set_sweep_stop_frequency(
        &mut self,
        output: OutputChannel,
        hertz: f64,
    ) -> Result<(), ScpiError>;

    /// Set the duration of one sweep in microseconds.
    fn set_sweep_time_us(&mut self, output: OutputChannel, micros: u64) -> Result<(), ScpiError>;

    /// Set the direction of a sweep.
    fn set_sweep_direction(
        &mut self,
        output: OutputChannel,
        direction: SweepDirection,
    ) -> Result<(), ScpiError>;

    /// Switch the sweep on or off.
    fn set_sweep_enabled(&mut self, output: OutputChannel, enable: bool)
    -> Result<(), ScpiError>;

    /// Commit the pending configuration to the active generator.
    fn run(&mut self, output: OutputChannel) -> Result<(), ScpiError>;
}
