//! [`CommandChannel`] implementation for the SCPI server running on the board.

use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::info;
use scpirs::{Instrument, ScpiError, ScpiInterface, TcpIpInstrument};

use crate::{
    channel::{CLOCK_RATE_125, CommandChannel},
    settings::{
        InputChannel, OutputChannel, SampleFormat, Shape, SweepDirection, SweepMode,
        TriggerSource, Units,
    },
};

/// The SCPI command channel of a Red Pitaya board.
///
/// The board's SCPI server has to be started on the board first, e.g., via the development
/// application of the web interface. It listens on port 5000 by default.
///
/// ```no_run
/// use redpitaya_daq::{CommandChannel, ScpiChannel};
///
/// let mut channel = ScpiChannel::connect("192.168.1.100", 5000).unwrap();
/// println!("Connected to {}", channel.board_name().unwrap());
/// ```
#[derive(Debug)]
pub struct ScpiChannel<T: ScpiInterface> {
    interface: T,
    clock_rate: f64,
    format: SampleFormat,
    units: Units,
}

impl ScpiChannel<Instrument<TcpStream>> {
    /// Connect to the SCPI server of a board with the default timeout of three seconds.
    ///
    /// # Arguments
    /// * `address` - IP address or host name of the board.
    /// * `port` - TCP port of the SCPI server.
    pub fn connect(address: &str, port: u16) -> Result<Self, ScpiError> {
        let interface = TcpIpInstrument::try_new((address, port))?;
        Ok(Self::new(interface))
    }

    /// Connect to the SCPI server of a board with a given read/write timeout.
    pub fn connect_with_timeout<A: ToSocketAddrs>(
        sock_addr: A,
        timeout: Duration,
    ) -> Result<Self, ScpiError> {
        let interface = TcpIpInstrument::with_timeout(sock_addr, timeout)?;
        Ok(Self::new(interface))
    }
}

impl<T: ScpiInterface> ScpiChannel<T> {
    /// Create a new command channel over the given interface.
    ///
    /// The terminator of the interface is set to `"\r\n"` and the clock rate to the one of the
    /// 125 MS/s boards. Use [`ScpiChannel::with_clock_rate`] for other models.
    pub fn new(interface: T) -> Self {
        let mut intf = interface;
        intf.set_terminator("\r\n");
        ScpiChannel {
            interface: intf,
            clock_rate: CLOCK_RATE_125,
            format: SampleFormat::default(),
            units: Units::default(),
        }
    }

    /// Set the sampling clock of the board model in Hz, e.g., `122.88e6` for the SDRlab 122-16.
    pub fn with_clock_rate(mut self, clock_rate: f64) -> Self {
        self.clock_rate = clock_rate;
        self
    }

    fn sendcmd(&mut self, cmd: &str) -> Result<(), ScpiError> {
        self.interface.sendcmd(cmd)
    }

    fn query(&mut self, cmd: &str) -> Result<String, ScpiError> {
        self.interface.query(cmd)
    }

    fn query_parse<V: std::str::FromStr>(&mut self, cmd: &str) -> Result<V, ScpiError> {
        let resp = self.query(cmd)?;
        resp.parse::<V>()
            .map_err(|_| ScpiError::ResponseParseError(resp))
    }

    fn query_flag(&mut self, cmd: &str, on: &str, off: &str) -> Result<bool, ScpiError> {
        let resp = self.query(cmd)?;
        if resp == on {
            Ok(true)
        } else if resp == off {
            Ok(false)
        } else {
            Err(ScpiError::ResponseParseError(resp))
        }
    }
}

impl<T: ScpiInterface> CommandChannel for ScpiChannel<T> {
    fn clock_rate(&self) -> f64 {
        self.clock_rate
    }

    fn board_name(&mut self) -> Result<String, ScpiError> {
        self.query("*IDN?")
    }

    fn buffer_length(&mut self) -> Result<usize, ScpiError> {
        self.query_parse("ACQ:BUF:SIZE?")
    }

    fn close(&mut self) -> Result<(), ScpiError> {
        info!("Closing SCPI channel");
        Ok(())
    }

    fn set_decimation(&mut self, decimation: u32) -> Result<(), ScpiError> {
        self.sendcmd(&format!("ACQ:DEC {decimation}"))
    }

    fn decimation(&mut self) -> Result<u32, ScpiError> {
        self.query_parse("ACQ:DEC?")
    }

    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<(), ScpiError> {
        self.sendcmd(&format!("ACQ:TRig {}", source.as_str()))
    }

    fn set_trigger_level(&mut self, level: f64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("ACQ:TRig:LEV {level}"))
    }

    fn set_trigger_delay_samples(&mut self, delay: i64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("ACQ:TRig:DLY {delay}"))
    }

    fn trigger_delay_samples(&mut self) -> Result<i64, ScpiError> {
        self.query_parse("ACQ:TRig:DLY?")
    }

    fn trigger_delay_ns(&mut self) -> Result<i64, ScpiError> {
        self.query_parse("ACQ:TRig:DLY:NS?")
    }

    fn set_acquisition_format(&mut self, format: SampleFormat) -> Result<(), ScpiError> {
        self.sendcmd(&format!("ACQ:DATA:FORMAT {}", format.as_str()))?;
        self.format = format;
        Ok(())
    }

    fn set_acquisition_units(&mut self, units: Units) -> Result<(), ScpiError> {
        self.sendcmd(&format!("ACQ:DATA:UNITS {}", units.as_str()))?;
        self.units = units;
        Ok(())
    }

    fn acquisition_start(&mut self) -> Result<(), ScpiError> {
        self.sendcmd("ACQ:START")
    }

    fn acquisition_stop(&mut self) -> Result<(), ScpiError> {
        self.sendcmd("ACQ:STOP")
    }

    fn acquisition_reset(&mut self) -> Result<(), ScpiError> {
        self.sendcmd("ACQ:RST")
    }

    fn is_triggered(&mut self) -> Result<bool, ScpiError> {
        self.query_flag("ACQ:TRig:STAT?", "TD", "WAIT")
    }

    fn is_buffer_filled(&mut self) -> Result<bool, ScpiError> {
        self.query_flag("ACQ:TRig:FILL?", "1", "0")
    }

    fn samples(&mut self, input: InputChannel, count: usize) -> Result<Vec<f64>, ScpiError> {
        let cmd = format!("ACQ:SOUR{}:DATA:OLD:N? {count}", input.index());
        match self.format {
            SampleFormat::Ascii => {
                let resp = self.query(&cmd)?;
                parse_ascii_samples(&resp)
            }
            SampleFormat::Bin => {
                let block = self.interface.query_block(&cmd)?;
                parse_binary_samples(&block, self.units)
            }
        }
    }

    fn reset_outputs(&mut self) -> Result<(), ScpiError> {
        self.sendcmd("GEN:RST")
    }

    fn set_output_enabled(
        &mut self,
        output: OutputChannel,
        enable: bool,
    ) -> Result<(), ScpiError> {
        self.sendcmd(&format!(
            "OUTPUT{}:STATE {}",
            output.index(),
            on_off(enable)
        ))
    }

    fn output_enabled(&mut self, output: OutputChannel) -> Result<bool, ScpiError> {
        let resp = self.query(&format!("OUTPUT{}:STATE?", output.index()))?;
        match resp.as_str() {
            "ON" | "1" => Ok(true),
            "OFF" | "0" => Ok(false),
            _ => Err(ScpiError::ResponseParseError(resp)),
        }
    }

    fn set_shape(&mut self, output: OutputChannel, shape: Shape) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:FUNC {}", output.index(), shape.as_str()))
    }

    fn set_frequency(&mut self, output: OutputChannel, hertz: f64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:FREQ:FIX {hertz}", output.index()))
    }

    fn frequency(&mut self, output: OutputChannel) -> Result<f64, ScpiError> {
        self.query_parse(&format!("SOUR{}:FREQ:FIX?", output.index()))
    }

    fn set_amplitude(&mut self, output: OutputChannel, volts: f64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:VOLT {volts}", output.index()))
    }

    fn amplitude(&mut self, output: OutputChannel) -> Result<f64, ScpiError> {
        self.query_parse(&format!("SOUR{}:VOLT?", output.index()))
    }

    fn set_offset(&mut self, output: OutputChannel, volts: f64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:VOLT:OFFS {volts}", output.index()))
    }

    fn set_phase(&mut self, output: OutputChannel, degrees: f64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:PHAS {degrees}", output.index()))
    }

    fn set_duty_cycle(&mut self, output: OutputChannel, fraction: f64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:DCYC {fraction}", output.index()))
    }

    fn set_sweep_mode(
        &mut self,
        output: OutputChannel,
        mode: SweepMode,
    ) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:SWeep:MODE {}", output.index(), mode.as_str()))
    }

    fn set_sweep_start_frequency(
        &mut self,
        output: OutputChannel,
        hertz: f64,
    ) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:SWeep:FREQ:START {hertz}", output.index()))
    }

    fn set_sweep_stop_frequency(
        &mut self,
        output: OutputChannel,
        hertz: f64,
    ) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:SWeep:FREQ:STOP {hertz}", output.index()))
    }

    fn set_sweep_time_us(&mut self, output: OutputChannel, micros: u64) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:SWeep:TIME {micros}", output.index()))
    }

    fn set_sweep_direction(
        &mut self,
        output: OutputChannel,
        direction: SweepDirection,
    ) -> Result<(), ScpiError> {
        self.sendcmd(&format!(
            "SOUR{}:SWeep:DIR {}",
            output.index(),
            direction.as_str()
        ))
    }

    fn set_sweep_enabled(
        &mut self,
        output: OutputChannel,
        enable: bool,
    ) -> Result<(), ScpiError> {
        self.sendcmd(&format!(
            "SOUR{}:SWeep:STATE {}",
            output.index(),
            on_off(enable)
        ))
    }

    fn run(&mut self, output: OutputChannel) -> Result<(), ScpiError> {
        self.sendcmd(&format!("SOUR{}:TRig:INT", output.index()))
    }
}

fn on_off(enable: bool) -> &'static str {
    if enable { "ON" } else { "OFF" }
}

/// Parse an ASCII sample response of the form `{v1,v2,...}`.
fn parse_ascii_samples(resp: &str) -> Result<Vec<f64>, ScpiError> {
    let inner = resp
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| ScpiError::ResponseParseError(resp.to_string()))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|val| {
            val.trim()
                .parse::<f64>()
                .map_err(|_| ScpiError::ResponseParseError(resp.to_string()))
        })
        .collect()
}

/// Parse the payload of a binary block: big-endian `f32` in volts, big-endian `i16` raw counts.
fn parse_binary_samples(block: &[u8], units: Units) -> Result<Vec<f64>, ScpiError> {
    let width = match units {
        Units::Volts => 4,
        Units::Raw => 2,
    };
    if block.len() % width != 0 {
        return Err(ScpiError::ResponseParseError(format!(
            "binary block of {} bytes is not a multiple of {width}",
            block.len()
        )));
    }
    let values = block
        .chunks_exact(width)
        .map(|chunk| match units {
            Units::Volts => f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64,
            Units::Raw => i16::from_be_bytes([chunk[0], chunk[1]]) as f64,
        })
        .collect();
    Ok(values)
}
