//! Tests for loading the board configuration.

use std::{fs, path::PathBuf, time::Duration};

use rstest::*;

use redpitaya_daq::*;

/// Write a configuration file into the temporary directory and return its path.
fn write_config(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "redpitaya_daq_{name}_{}.toml",
        std::process::id()
    ));
    fs::write(&path, content).unwrap();
    path
}

#[fixture]
fn def_config() -> RedPitayaConfig {
    RedPitayaConfig::default_values().unwrap()
}

#[rstest]
fn test_defaults(def_config: RedPitayaConfig) {
    assert_eq!(def_config.port, 5000);
    assert_eq!(def_config.timeout(), Duration::from_secs(3));
    assert_eq!(def_config.clock_rate, 125e6);

    let acq = &def_config.acquisition;
    assert_eq!(acq.decimation, 1);
    assert_eq!(acq.trigger_source, TriggerSource::Ch1PositiveEdge);
    assert!(!acq.center_trigger);
    assert_eq!(acq.poll_interval_ms, 10);
    assert_eq!(acq.poll_timeout_ms, None);

    let gen_set = &def_config.generator;
    assert_eq!(gen_set.channel, 1);
    assert_eq!(gen_set.shape, Shape::Sine);
    assert_eq!(gen_set.sweep_mode, SweepMode::Linear);
    assert_eq!(gen_set.sweep_direction, SweepDirection::Normal);
    assert_eq!(gen_set.sweep_time_us, 1_000_000);
}

/// The defaults build the same session configurations as the session defaults.
#[rstest]
fn test_default_helpers(def_config: RedPitayaConfig) {
    let acq = def_config.acquisition_config(16384);
    assert_eq!(acq, AcquisitionConfig::default());

    assert_eq!(def_config.generator_config(false), GeneratorConfig::default());
    let with_sweep = def_config.generator_config(true);
    let sweep = with_sweep.sweep.clone().unwrap();
    assert_eq!(sweep.duration, Duration::from_secs(1));
    assert!(!sweep.enabled);
    with_sweep.validate().unwrap();

    let poll = def_config.poll_options();
    assert_eq!(poll.interval, DEFAULT_POLL_INTERVAL);
    assert_eq!(poll.timeout, None);
    assert_eq!(def_config.output_channel().unwrap(), OutputChannel::Out1);
}

#[rstest]
fn test_from_file() {
    let path = write_config(
        "from_file",
        r#"
ip_address = "10.0.0.42"

[acquisition]
decimation = 8
trigger_source = "EXT_NE"
center_trigger = true
poll_timeout_ms = 500

[generator]
channel = 2
shape = "SQUARE"
amplitude = 0.25
sweep_mode = "LOG"
sweep_direction = "UP_DOWN"
"#,
    );
    let config = RedPitayaConfig::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(config.port, 5000);
    assert_eq!(config.acquisition.trigger_source, TriggerSource::ExtNegativeEdge);

    let acq = config.acquisition_config(1024);
    assert_eq!(acq.decimation, 8);
    assert_eq!(acq.nsamples, 1024);
    assert!(acq.center_trigger);
    assert_eq!(config.poll_options().timeout, Some(Duration::from_millis(500)));

    assert_eq!(config.output_channel().unwrap(), OutputChannel::Out2);
    let gen_config = config.generator_config(true);
    assert_eq!(gen_config.shape, Shape::Square);
    assert_eq!(gen_config.amplitude.as_volts(), 0.25);
    let sweep = gen_config.sweep.unwrap();
    assert_eq!(sweep.mode, SweepMode::Log);
    assert_eq!(sweep.direction, SweepDirection::UpDown);
}

/// A value of the wrong type is a configuration file error.
#[rstest]
fn test_from_file_invalid() {
    let path = write_config("invalid", "port = \"five thousand\"\n");
    let res = RedPitayaConfig::from_file(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(res, Err(RedPitayaError::ConfigFile(_))));
}

#[rstest]
fn test_output_channel_out_of_range() {
    let path = write_config("channel", "[generator]\nchannel = 3\n");
    let config = RedPitayaConfig::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert!(matches!(
        config.output_channel(),
        Err(RedPitayaError::ChannelIndexOutOfRange {
            idx: 3,
            nof_channels: 2
        })
    ));
}
