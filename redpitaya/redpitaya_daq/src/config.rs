//! Configuration of a board connection, loaded from a TOML file.
//!
//! Every field has a default, such that an empty file is a valid configuration. The connection
//! fields can be overridden with `RP_` environment variables, e.g., `RP_IP_ADDRESS`.
//!
//! ```toml
//! ip_address = "192.168.1.100"
//!
//! [acquisition]
//! decimation = 8
//! trigger_source = "CH1_PE"
//! poll_timeout_ms = 5000
//!
//! [generator]
//! channel = 1
//! shape = "SINE"
//! frequency = 1000.0
//! ```

use std::{net::TcpStream, path::Path, time::Duration};

use confique::Config;
use measurements::{Angle, Frequency, Voltage};
use scpirs::Instrument;

use crate::{
    AcquisitionConfig, BoardLink, GeneratorConfig, RedPitayaError, ScpiChannel,
    generator::SweepConfig,
    poll::PollOptions,
    settings::{OutputChannel, Shape, SweepDirection, SweepMode, TriggerSource},
};

/// Configuration of one board.
#[derive(Config, Debug, Clone)]
pub struct RedPitayaConfig {
    /// IP address or host name of the board.
    #[config(env = "RP_IP_ADDRESS", default = "192.168.1.100")]
    pub ip_address: String,
    /// TCP port of the SCPI server.
    #[config(env = "RP_PORT", default = 5000)]
    pub port: u16,
    /// Read/write timeout of the connection in milliseconds.
    #[config(env = "RP_TIMEOUT_MS", default = 3000)]
    pub timeout_ms: u64,
    /// Sampling clock of the board in Hz.
    #[config(env = "RP_CLOCK_RATE", default = 125000000.0)]
    pub clock_rate: f64,
    /// Acquisition settings.
    #[config(nested)]
    pub acquisition: AcquisitionSettings,
    /// Generator settings.
    #[config(nested)]
    pub generator: GeneratorSettings,
}

/// The `[acquisition]` section.
#[derive(Config, Debug, Clone)]
pub struct AcquisitionSettings {
    /// Decimation factor.
    #[config(default = 1)]
    pub decimation: u32,
    /// Trigger source, e.g., `"CH1_PE"`.
    #[config(default = "CH1_PE")]
    pub trigger_source: TriggerSource,
    /// Trigger level in volts.
    #[config(default = 0.0)]
    pub trigger_level: f64,
    /// Center the window around the trigger.
    #[config(default = false)]
    pub center_trigger: bool,
    /// Sleep between two status polls in milliseconds.
    #[config(default = 10)]
    pub poll_interval_ms: u64,
    /// Give up polling after this many milliseconds. Without it, a grab waits forever.
    pub poll_timeout_ms: Option<u64>,
}

/// The `[generator]` section.
#[derive(Config, Debug, Clone)]
pub struct GeneratorSettings {
    /// Output, 1 or 2.
    #[config(default = 1)]
    pub channel: usize,
    /// Waveform shape, e.g., `"SINE"`.
    #[config(default = "SINE")]
    pub shape: Shape,
    /// Frequency in Hz.
    #[config(default = 1000.0)]
    pub frequency: f64,
    /// Amplitude in volts.
    #[config(default = 0.5)]
    pub amplitude: f64,
    /// Offset in volts.
    #[config(default = 0.0)]
    pub offset: f64,
    /// Phase in degrees.
    #[config(default = 0.0)]
    pub phase: f64,
    /// Duty cycle as a fraction.
    #[config(default = 0.5)]
    pub duty_cycle: f64,
    /// Sweep mode, `"LINEAR"` or `"LOG"`.
    #[config(default = "LINEAR")]
    pub sweep_mode: SweepMode,
    /// Start frequency of the sweep in Hz.
    #[config(default = 1000.0)]
    pub sweep_start_frequency: f64,
    /// Stop frequency of the sweep in Hz.
    #[config(default = 10000.0)]
    pub sweep_stop_frequency: f64,
    /// Duration of one sweep in microseconds.
    #[config(default = 1000000)]
    pub sweep_time_us: u64,
    /// Sweep direction, `"NORMAL"` or `"UP_DOWN"`.
    #[config(default = "NORMAL")]
    pub sweep_direction: SweepDirection,
}

impl RedPitayaConfig {
    /// Load the configuration from a TOML file. Environment variables take precedence.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RedPitayaError> {
        Ok(Self::builder().env().file(path.as_ref()).load()?)
    }

    /// The configuration with all defaults, plus environment overrides.
    pub fn default_values() -> Result<Self, RedPitayaError> {
        Ok(Self::builder().env().load()?)
    }

    /// Timeout of the connection.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Build the acquisition configuration. `nsamples` is set to `buffer_length`.
    pub fn acquisition_config(&self, buffer_length: usize) -> AcquisitionConfig {
        AcquisitionConfig {
            decimation: self.acquisition.decimation,
            trigger_source: self.acquisition.trigger_source,
            trigger_level: self.acquisition.trigger_level,
            nsamples: buffer_length,
            center_trigger: self.acquisition.center_trigger,
            ..AcquisitionConfig::default()
        }
    }

    /// Build the poll options of the acquisition.
    pub fn poll_options(&self) -> PollOptions {
        let opts = PollOptions::default()
            .with_interval(Duration::from_millis(self.acquisition.poll_interval_ms));
        match self.acquisition.poll_timeout_ms {
            Some(ms) => opts.with_timeout(Duration::from_millis(ms)),
            None => opts,
        }
    }

    /// The output of the generator section.
    pub fn output_channel(&self) -> Result<OutputChannel, RedPitayaError> {
        OutputChannel::try_from(self.generator.channel)
    }

    /// Build the generator configuration.
    ///
    /// The sweep settings are only included with `with_sweep`. The output starts switched off.
    pub fn generator_config(&self, with_sweep: bool) -> GeneratorConfig {
        let gen_set = &self.generator;
        let sweep = with_sweep.then(|| SweepConfig {
            mode: gen_set.sweep_mode,
            start_frequency: Frequency::from_hertz(gen_set.sweep_start_frequency),
            stop_frequency: Frequency::from_hertz(gen_set.sweep_stop_frequency),
            duration: Duration::from_micros(gen_set.sweep_time_us),
            direction: gen_set.sweep_direction,
            enabled: false,
        });
        GeneratorConfig {
            shape: gen_set.shape,
            frequency: Frequency::from_hertz(gen_set.frequency),
            amplitude: Voltage::from_volts(gen_set.amplitude),
            offset: Voltage::from_volts(gen_set.offset),
            phase: Angle::from_degrees(gen_set.phase),
            duty_cycle: gen_set.duty_cycle,
            enabled: false,
            sweep,
        }
    }

    /// Open the connection to the board and return its master link.
    pub fn connect(&self) -> Result<BoardLink<ScpiChannel<Instrument<TcpStream>>>, RedPitayaError> {
        let channel = ScpiChannel::connect_with_timeout(
            (self.ip_address.as_str(), self.port),
            self.timeout(),
        )?
        .with_clock_rate(self.clock_rate);
        Ok(BoardLink::master(channel))
    }
}
