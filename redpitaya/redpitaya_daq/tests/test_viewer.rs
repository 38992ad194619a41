//! Tests for the scope and sweep viewers.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use measurements::{Frequency, test_utils::assert_almost_eq};
use rstest::*;

use scpirs::{LoopbackInterface, ScpiError};

use redpitaya_daq::*;

// Type alias for the command channel over a loopback interface.
type ChannelLbk = ScpiChannel<LoopbackInterface>;

/// Create a master link with the given commands. The commands of an acquisition session
/// initialization are prepended, the board reports a buffer of 8 samples and a decimation of 1.
fn crt_link(host2inst: Vec<&str>, inst2host: Vec<&str>) -> BoardLink<ChannelLbk> {
    let mut h2i: Vec<String> = vec!["ACQ:RST", "ACQ:BUF:SIZE?", "ACQ:DEC?"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    h2i.extend(host2inst.iter().map(|s| s.to_string()));
    let mut i2h: Vec<String> = vec!["8".to_string(), "1".to_string()];
    i2h.extend(inst2host.iter().map(|s| s.to_string()));
    BoardLink::master(ScpiChannel::new(LoopbackInterface::new(h2i, i2h, "\r\n")))
}

/// Function that creates a new scope viewer, which queries the board name on creation.
fn crt_inst(host2inst: Vec<&str>, inst2host: Vec<&str>) -> ScopeViewer<ChannelLbk> {
    let mut h2i = vec!["*IDN?"];
    h2i.extend(host2inst);
    let mut i2h = vec!["REDPITAYA,INSTR2020,0,01-02"];
    i2h.extend(inst2host);
    let session = AcquisitionSession::try_new(
        crt_link(h2i, i2h),
        InputChannel::In1,
        PollOptions::default(),
    )
    .unwrap();
    ScopeViewer::try_new(session).unwrap()
}

/// Function that creates a new sweep viewer on output 1 grabbing two samples per input.
fn crt_sweep(
    host2inst: Vec<&str>,
    inst2host: Vec<&str>,
    center_trigger: bool,
) -> SweepViewer<ChannelLbk> {
    let link = crt_link(host2inst, inst2host);
    let generator = GeneratorSession::new(link.slave(), OutputChannel::Out1);
    let acquisition =
        AcquisitionSession::try_new(link, InputChannel::In1, PollOptions::default()).unwrap();
    let settings = ViewerSettings {
        nsamples: 2,
        all_samples: false,
        center_trigger,
    };
    SweepViewer::new(acquisition, generator, settings).unwrap()
}

#[fixture]
fn emp_inst() -> ScopeViewer<ChannelLbk> {
    crt_inst(vec![], vec![])
}

/// By default the whole buffer is grabbed.
#[rstest]
fn test_initialization(emp_inst: ScopeViewer<ChannelLbk>) {
    assert_eq!(emp_inst.board_name(), "REDPITAYA,INSTR2020,0,01-02");
    assert_eq!(emp_inst.nsamples(), 8);
}

#[rstest]
fn test_settings(mut emp_inst: ScopeViewer<ChannelLbk>) {
    let mut settings = ViewerSettings {
        nsamples: 4,
        all_samples: false,
        center_trigger: false,
    };
    emp_inst.set_settings(settings).unwrap();
    assert_eq!(emp_inst.nsamples(), 4);

    settings.all_samples = true;
    emp_inst.set_settings(settings).unwrap();
    assert_eq!(emp_inst.nsamples(), 8);

    settings.nsamples = 9;
    assert!(emp_inst.set_settings(settings).unwrap_err().is_config_error());
}

#[rstest]
fn test_set_decimation() {
    let mut inst = crt_inst(vec!["ACQ:DEC 4", "ACQ:DEC?"], vec!["4"]);
    assert_almost_eq(inst.set_decimation(4).unwrap(), 31.25e6);
}

/// Sample count and trigger position come from the session, the label from the input.
#[rstest]
fn test_scope_from_session_config() {
    let link = crt_link(
        vec![
            "ACQ:DATA:FORMAT ASCII",
            "ACQ:DATA:UNITS VOLTS",
            "ACQ:DEC 1",
            "ACQ:TRig:LEV 0",
            "ACQ:DEC?",
            "*IDN?",
            "ACQ:TRig:DLY -2",
            "ACQ:START",
            "ACQ:TRig CH1_PE",
            "ACQ:TRig:STAT?",
            "ACQ:TRig:FILL?",
            "ACQ:SOUR2:DATA:OLD:N? 4",
            "ACQ:TRig:DLY:NS?",
        ],
        vec![
            "1",
            "REDPITAYA,INSTR2020,0,01-02",
            "TD",
            "1",
            "{0.5,0.6,0.7,0.8}",
            "-16",
        ],
    );
    let mut session =
        AcquisitionSession::try_new(link, InputChannel::In2, PollOptions::default()).unwrap();
    session
        .configure(AcquisitionConfig {
            nsamples: 4,
            center_trigger: true,
            ..AcquisitionConfig::default()
        })
        .unwrap();
    let mut inst = ScopeViewer::try_new(session).unwrap();
    assert_eq!(inst.nsamples(), 4);

    let mut exports = Vec::new();
    inst.grab(&mut |export: DataExport| exports.push(export))
        .unwrap();
    let labeled = &exports[0].data[0];
    assert_eq!(labeled.input, InputChannel::In2);
    assert_eq!(labeled.label, "AI1");
    assert_eq!(labeled.series.len(), 4);
}

#[rstest]
fn test_scope_grab() {
    let mut inst = crt_inst(
        vec![
            "ACQ:TRig:DLY -4",
            "ACQ:START",
            "ACQ:TRig CH1_PE",
            "ACQ:TRig:STAT?",
            "ACQ:TRig:FILL?",
            "ACQ:SOUR1:DATA:OLD:N? 4",
            "ACQ:TRig:DLY:NS?",
            "ACQ:STOP",
        ],
        vec!["TD", "1", "{1.0,2.0,3.0,4.0}", "-32"],
    );
    inst.set_settings(ViewerSettings {
        nsamples: 4,
        all_samples: false,
        center_trigger: false,
    })
    .unwrap();

    let mut exports = Vec::new();
    inst.grab(&mut |export: DataExport| exports.push(export))
        .unwrap();
    inst.stop().unwrap();

    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].name, EXPORT_NAME);
    assert_eq!(exports[0].data.len(), 1);
    let labeled = &exports[0].data[0];
    assert_eq!(labeled.label, "AI0");
    assert_eq!(labeled.input, InputChannel::In1);
    assert_eq!(labeled.series.values(), &[1.0, 2.0, 3.0, 4.0]);
    assert_almost_eq(labeled.series.axis().offset(), -32e-9);
}

/// A sweep grab resets and rewrites the output, arms, starts the sweep, and reads both inputs.
#[rstest]
fn test_sweep_grab() {
    let mut inst = crt_sweep(
        vec![
            "GEN:RST",
            "SOUR1:FUNC SINE",
            "SOUR1:FREQ:FIX 1000",
            "SOUR1:VOLT 0.5",
            "SOUR1:VOLT:OFFS 0",
            "SOUR1:PHAS 0",
            "SOUR1:DCYC 0.5",
            "ACQ:TRig:DLY -3",
            "ACQ:START",
            "ACQ:TRig CH1_PE",
            "SOUR1:SWeep:STATE ON",
            "OUTPUT1:STATE ON",
            "SOUR1:TRig:INT",
            "ACQ:TRig:STAT?",
            "ACQ:TRig:FILL?",
            "ACQ:SOUR1:DATA:OLD:N? 2",
            "ACQ:SOUR2:DATA:OLD:N? 2",
            "ACQ:STOP",
            "OUTPUT1:STATE OFF",
        ],
        vec!["TD", "1", "{0.1,0.2}", "{0.3,0.4}"],
        true,
    );
    assert_almost_eq(inst.axis_offset().unwrap(), -8e-9);

    let mut exports = Vec::new();
    inst.grab(&mut |export: DataExport| exports.push(export))
        .unwrap();

    assert_eq!(exports.len(), 1);
    let data = &exports[0].data;
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].label, "AI0");
    assert_eq!(data[1].label, "AI1");
    assert_eq!(data[0].series.values(), &[0.1, 0.2]);
    assert_eq!(data[1].series.values(), &[0.3, 0.4]);
    assert_almost_eq(data[1].series.axis().offset(), -8e-9);
    assert_almost_eq(data[1].series.axis().scaling(), 8e-9);
    assert!(!inst.generator().config().enabled);
}

/// Without a centered trigger, the window starts at the trigger.
#[rstest]
fn test_sweep_axis_offset_uncentered() {
    let inst = crt_sweep(vec![], vec![], false);
    assert_eq!(inst.axis_offset().unwrap(), 0.0);
}

/// A failing sweep grab stops the acquisition and switches the output off.
#[rstest]
fn test_sweep_grab_failure() {
    let mut inst = crt_sweep(
        vec![
            "GEN:RST",
            "SOUR1:FUNC SINE",
            "SOUR1:FREQ:FIX 1000",
            "SOUR1:VOLT 0.5",
            "SOUR1:VOLT:OFFS 0",
            "SOUR1:PHAS 0",
            "SOUR1:DCYC 0.5",
            "ACQ:TRig:DLY -4",
            "ACQ:START",
            "ACQ:TRig CH1_PE",
            "SOUR1:SWeep:STATE ON",
            "OUTPUT1:STATE ON",
            "SOUR1:TRig:INT",
            "ACQ:TRig:STAT?",
            "ACQ:STOP",
            "OUTPUT1:STATE OFF",
        ],
        vec!["ERR"],
        false,
    );
    let mut exports: Vec<DataExport> = Vec::new();
    let err = inst
        .grab(&mut |export: DataExport| exports.push(export))
        .unwrap_err();
    assert!(matches!(err, RedPitayaError::Acquisition { .. }));
    assert!(exports.is_empty());
    assert_eq!(inst.acquisition().state(), SessionState::Idle);
}

#[rstest]
fn test_sweep_invalid_settings() {
    let link = crt_link(vec![], vec![]);
    let generator = GeneratorSession::new(link.slave(), OutputChannel::Out2);
    let acquisition =
        AcquisitionSession::try_new(link, InputChannel::In1, PollOptions::default()).unwrap();
    let settings = ViewerSettings {
        nsamples: 0,
        all_samples: false,
        center_trigger: false,
    };
    assert!(SweepViewer::new(acquisition, generator, settings).is_err());
}

/// Two sweep grabs in a row send the same commands. Sweep fields that were only partially
/// written are not written again after the reset.
#[rstest]
fn test_sweep_grab_twice() {
    let grab = vec![
        "GEN:RST",
        "SOUR1:FUNC SINE",
        "SOUR1:FREQ:FIX 1000",
        "SOUR1:VOLT 0.5",
        "SOUR1:VOLT:OFFS 0",
        "SOUR1:PHAS 0",
        "SOUR1:DCYC 0.5",
        "ACQ:TRig:DLY -4",
        "ACQ:START",
        "ACQ:TRig CH1_PE",
        "SOUR1:SWeep:STATE ON",
        "OUTPUT1:STATE ON",
        "SOUR1:TRig:INT",
        "ACQ:TRig:STAT?",
        "ACQ:TRig:FILL?",
        "ACQ:SOUR1:DATA:OLD:N? 2",
        "ACQ:SOUR2:DATA:OLD:N? 2",
        "ACQ:STOP",
        "OUTPUT1:STATE OFF",
    ];
    let responses = vec!["TD", "1", "{0.1,0.2}", "{0.3,0.4}"];
    let mut h2i = vec!["SOUR1:SWeep:FREQ:START 500"];
    h2i.extend(grab.iter());
    h2i.extend(grab.iter());
    let mut i2h = responses.clone();
    i2h.extend(responses);
    let mut inst = crt_sweep(h2i, i2h, false);
    inst.generator()
        .set_sweep_start_frequency(Frequency::from_hertz(500.0))
        .unwrap();

    let mut exports = Vec::new();
    inst.grab(&mut |export: DataExport| exports.push(export))
        .unwrap();
    inst.grab(&mut |export: DataExport| exports.push(export))
        .unwrap();
    assert_eq!(exports.len(), 2);
    assert_eq!(exports[0], exports[1]);
    assert_eq!(inst.generator().config().sweep, None);
}

/// A board whose generator fails to start the sweep. Stop commands are counted.
struct SweepFails {
    stops: Arc<AtomicUsize>,
}

impl CommandChannel for SweepFails {
    fn clock_rate(&self) -> f64 {
        CLOCK_RATE_125
    }
    fn board_name(&mut self) -> Result<String, ScpiError> {
        Ok("mock".to_string())
    }
    fn buffer_length(&mut self) -> Result<usize, ScpiError> {
        Ok(8)
    }
    fn set_decimation(&mut self, _decimation: u32) -> Result<(), ScpiError> {
        Ok(())
    }
    fn decimation(&mut self) -> Result<u32, ScpiError> {
        Ok(1)
    }
    fn set_trigger_source(&mut self, _source: TriggerSource) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_trigger_level(&mut self, _level: f64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_trigger_delay_samples(&mut self, _delay: i64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn trigger_delay_samples(&mut self) -> Result<i64, ScpiError> {
        Ok(0)
    }
    fn trigger_delay_ns(&mut self) -> Result<i64, ScpiError> {
        Ok(0)
    }
    fn set_acquisition_format(&mut self, _format: SampleFormat) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_acquisition_units(&mut self, _units: Units) -> Result<(), ScpiError> {
        Ok(())
    }
    fn acquisition_start(&mut self) -> Result<(), ScpiError> {
        Ok(())
    }
    fn acquisition_stop(&mut self) -> Result<(), ScpiError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn acquisition_reset(&mut self) -> Result<(), ScpiError> {
        Ok(())
    }
    fn is_triggered(&mut self) -> Result<bool, ScpiError> {
        Ok(true)
    }
    fn is_buffer_filled(&mut self) -> Result<bool, ScpiError> {
        Ok(true)
    }
    fn samples(&mut self, _input: InputChannel, count: usize) -> Result<Vec<f64>, ScpiError> {
        Ok(vec![0.0; count])
    }
    fn reset_outputs(&mut self) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_output_enabled(
        &mut self,
        _output: OutputChannel,
        _enable: bool,
    ) -> Result<(), ScpiError> {
        Ok(())
    }
    fn output_enabled(&mut self, _output: OutputChannel) -> Result<bool, ScpiError> {
        Ok(false)
    }
    fn set_shape(&mut self, _output: OutputChannel, _shape: Shape) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_frequency(&mut self, _output: OutputChannel, _hertz: f64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn frequency(&mut self, _output: OutputChannel) -> Result<f64, ScpiError> {
        Ok(1000.0)
    }
    fn set_amplitude(&mut self, _output: OutputChannel, _volts: f64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn amplitude(&mut self, _output: OutputChannel) -> Result<f64, ScpiError> {
        Ok(0.5)
    }
    fn set_offset(&mut self, _output: OutputChannel, _volts: f64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_phase(&mut self, _output: OutputChannel, _degrees: f64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_duty_cycle(&mut self, _output: OutputChannel, _fraction: f64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_sweep_mode(&mut self, _output: OutputChannel, _mode: SweepMode) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_sweep_start_frequency(
        &mut self,
        _output: OutputChannel,
        _hertz: f64,
    ) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_sweep_stop_frequency(
        &mut self,
        _output: OutputChannel,
        _hertz: f64,
    ) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_sweep_time_us(&mut self, _output: OutputChannel, _micros: u64) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_sweep_direction(
        &mut self,
        _output: OutputChannel,
        _direction: SweepDirection,
    ) -> Result<(), ScpiError> {
        Ok(())
    }
    fn set_sweep_enabled(
        &mut self,
        _output: OutputChannel,
        _enable: bool,
    ) -> Result<(), ScpiError> {
        Err(ScpiError::Timeout(Duration::from_millis(1)))
    }
    fn run(&mut self, _output: OutputChannel) -> Result<(), ScpiError> {
        Ok(())
    }
}

/// A generator fault after arming stops the acquisition, so the next grab can arm again.
#[rstest]
fn test_sweep_generator_failure_after_arming() {
    let stops = Arc::new(AtomicUsize::new(0));
    let link = BoardLink::master(SweepFails {
        stops: Arc::clone(&stops),
    });
    let generator = GeneratorSession::new(link.slave(), OutputChannel::Out1);
    let acquisition =
        AcquisitionSession::try_new(link, InputChannel::In1, PollOptions::default()).unwrap();
    let settings = ViewerSettings {
        nsamples: 2,
        all_samples: false,
        center_trigger: false,
    };
    let mut inst = SweepViewer::new(acquisition, generator, settings).unwrap();

    for grabs in 1..=2 {
        let err = inst.grab(&mut |_: DataExport| {}).unwrap_err();
        assert!(matches!(err, RedPitayaError::Channel(ScpiError::Timeout(_))));
        assert_eq!(stops.load(Ordering::SeqCst), grabs);
        assert_eq!(inst.acquisition().state(), SessionState::Idle);
    }
}
