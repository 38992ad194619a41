//! This module provides the main implementation of the [`ScpiInterface`] trait.
//!
//! It can be used with any type that implements [`std::io::Read`] and [`std::io::Write`], such
//! as [`std::net::TcpStream`].

use std::time::Duration;

use crate::{ScpiError, ScpiInterface};

/// A general SCPI interface that can be built with any port that implements [`std::io::Read`]
/// and [`std::io::Write`].
///
/// # Example
///
/// The following shows how to create an [`Instrument`] from your own port. To just use a
/// [`std::net::TcpStream`] as shown here, you can also use the [`crate::TcpIpInstrument`].
///
/// ```no_run
/// use std::{net::TcpStream, time::Duration};
///
/// use scpirs::Instrument;
///
/// let my_port = TcpStream::connect("192.168.1.100:5000").unwrap();
/// let inst_interface = Instrument::new(my_port, Duration::from_secs(3));
/// ```
#[derive(Debug)]
pub struct Instrument<P: std::io::Read + std::io::Write> {
    port: P,
    terminator: String,
    timeout: Duration,
}

impl<P: std::io::Read + std::io::Write> Instrument<P> {
    /// Create a new instance of [`Instrument`] with a given port and read timeout.
    ///
    /// The terminator defaults to `"\r\n"`, the line ending of SCPI servers on embedded boards.
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            terminator: "\r\n".to_string(),
            timeout,
        }
    }

    /// Consume the instrument and hand back the underlying port.
    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: std::io::Read + std::io::Write> ScpiInterface for Instrument<P> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ScpiError> {
        self.port.read_exact(buf)?;
        Ok(())
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), ScpiError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    fn get_timeout(&self) -> Duration {
        self.timeout
    }
}
