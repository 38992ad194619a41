//! ScpiRs: talk SCPI to your instrument from Rust
//!
//! This crate provides the transport layer for SCPI (Standard Commands for Programmable
//! Instruments) based instruments. It defines an [`ScpiInterface`] trait that instrument drivers
//! are written against, a generic [`Instrument`] implementation for anything that implements
//! [`std::io::Read`] and [`std::io::Write`], and a [`LoopbackInterface`] that lets you test a
//! driver by scripting the exact traffic between host and instrument.
//!
//! # Currently implemented interfaces are:
//! - TCP/IP (blocking) using [`std::net::TcpStream`], see [`TcpIpInstrument`].
//! - Any other `Read + Write` port via [`Instrument::new`].
//!
//! # Text and binary responses
//!
//! Most SCPI responses are lines of text that end with a terminator. Bulk data, e.g., sample
//! buffers of an oscilloscope, is often transferred as an IEEE 488.2 definite-length block of
//! the form `#<n><length><data>`. Both are supported by the provided methods of the
//! [`ScpiInterface`] trait, such that a driver only has to implement the two raw methods
//! [`ScpiInterface::read_exact`] and [`ScpiInterface::write_raw`] for a new port type.
//!
//! # License
//!
//! Licensed under either of
//!
//! - Apache License, Version 2.0 ([LICENSE-APACHE](http://www.apache.org/licenses/LICENSE-2.0))
//! - MIT license ([LICENSE-MIT](http://opensource.org/licenses/MIT))
//!
//! at your option.

#![warn(missing_docs)]

mod instrument;
mod loopback;
mod tcp_ip;

pub use instrument::Instrument;
pub use loopback::LoopbackInterface;
pub use tcp_ip::{DEFAULT_SCPI_PORT, TcpIpInstrument};

use std::time::{Duration, Instant};

use log::{debug, trace};
use thiserror::Error;

/// The default timeout for all interfaces that do not specify their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// The error enum for all SCPI interfaces.
///
/// Any command sending or querying returns either an empty result, the response, or this error.
/// It propagates nicely with the `?` operator into driver specific errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScpiError {
    /// The called command is not supported by this interface.
    #[error("This command is not supported by this interface.")]
    InterfaceCommandNotSupported,
    /// Error when reading from/writing to an interface. See [`std::io::Error`] for more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A binary block response did not follow the `#<n><length><data>` format. The error
    /// contains a description of what was wrong with the header.
    #[error("Malformed binary block: {0}")]
    MalformedBlock(String),
    /// Instrument response could not be parsed because it was unexpected by the driver. This
    /// error contains the response that was received from the instrument.
    #[error("Response from instrument could not be parsed. Response was: {0}")]
    ResponseParseError(String),
    /// Timeout occurred while waiting for a response from the instrument. The error contains the
    /// timeout that was exceeded.
    #[error(
        "Timeout occured while waiting for a response from the instrument. Timeout was set to {0:?}."
    )]
    Timeout(Duration),
    /// Timeout occurred while waiting for a response to a query. The error contains the query
    /// that was sent and the timeout that was exceeded.
    #[error(
        "Timeout occured while waiting for a response to query: {query}. Timeout was set to {timeout:?}."
    )]
    TimeoutQuery {
        /// The query that timed out.
        query: String,
        /// The timeout that was set.
        timeout: Duration,
    },
}

/// The `ScpiInterface` trait defines how drivers talk to an SCPI instrument.
///
/// Implementors only need to provide [`ScpiInterface::read_exact`] and
/// [`ScpiInterface::write_raw`]. Everything else, i.e., sending terminated commands, querying,
/// and reading binary blocks, is provided on top of these two.
pub trait ScpiInterface {
    /// Read exactly as many bytes from the instrument as fit into `buf`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ScpiError>;

    /// Write the given bytes to the instrument and flush the port.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), ScpiError>;

    /// Get the terminator of the interface. Defaults to `"\r\n"`.
    fn get_terminator(&self) -> &str {
        "\r\n"
    }

    /// Set the terminator of an interface from a `&str`.
    ///
    /// The default implementation ignores the call, interfaces that support changing the
    /// terminator must override it together with [`ScpiInterface::get_terminator`].
    fn set_terminator(&mut self, _terminator: &str) {}

    /// Get the timeout that applies to reading a response.
    fn get_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Write a string slice to the instrument without appending the terminator.
    fn write(&mut self, data: &str) -> Result<(), ScpiError> {
        self.write_raw(data.as_bytes())
    }

    /// Send a command to the instrument.
    ///
    /// The terminator is appended to the command before it is written.
    ///
    /// # Arguments:
    /// - `cmd` - A string slice that will be sent to the instrument.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), ScpiError> {
        debug!("SCPI >> {cmd}");
        let cmd = format!("{cmd}{}", self.get_terminator());
        self.write_raw(cmd.as_bytes())
    }

    /// Read from the instrument until the terminator is found and return the trimmed response.
    ///
    /// Reading happens byte by byte. If the terminator is not found before the timeout expires,
    /// a [`ScpiError::Timeout`] is returned. Invalid UTF-8 bytes are replaced with `U+FFFD`.
    fn read_until_terminator(&mut self) -> Result<String, ScpiError> {
        let terminator = self.get_terminator().to_string();
        let timeout = self.get_timeout();
        let mut response: Vec<u8> = Vec::new();
        let mut single_buf = [0u8];

        let tic = Instant::now();
        while tic.elapsed() < timeout {
            self.read_exact(&mut single_buf)?;
            response.push(single_buf[0]);
            if response.ends_with(terminator.as_bytes()) {
                let response = String::from_utf8_lossy(&response);
                let retval = response.trim().to_string();
                debug!("SCPI << {retval}");
                return Ok(retval);
            }
        }
        Err(ScpiError::Timeout(timeout))
    }

    /// Query the instrument with a command and return the response as a String.
    ///
    /// # Arguments
    /// * `cmd` - The command to send to the instrument for which we expect a response.
    fn query(&mut self, cmd: &str) -> Result<String, ScpiError> {
        self.sendcmd(cmd)?;
        self.read_until_terminator().map_err(|e| match e {
            ScpiError::Timeout(timeout) => ScpiError::TimeoutQuery {
                query: cmd.to_string(),
                timeout,
            },
            e => e,
        })
    }

    /// Read an IEEE 488.2 definite-length binary block and return its payload.
    ///
    /// The block has the form `#<n><length><data>`, where `<n>` is a single digit stating how
    /// many digits `<length>` has. The terminator that follows the block is consumed as well.
    fn read_block(&mut self) -> Result<Vec<u8>, ScpiError> {
        let mut head = [0u8; 2];
        self.read_exact(&mut head)?;
        if head[0] != b'#' {
            return Err(ScpiError::MalformedBlock(format!(
                "expected '#' as first byte, got {:#04x}",
                head[0]
            )));
        }
        let nof_digits = (head[1] as char)
            .to_digit(10)
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                ScpiError::MalformedBlock(format!("invalid length digit {:#04x}", head[1]))
            })?;

        let mut len_buf = vec![0u8; nof_digits as usize];
        self.read_exact(&mut len_buf)?;
        let len_str = String::from_utf8_lossy(&len_buf).to_string();
        let len = len_str
            .parse::<usize>()
            .map_err(|_| ScpiError::MalformedBlock(format!("invalid block length {len_str}")))?;

        let mut data = vec![0u8; len];
        self.read_exact(&mut data)?;
        trace!("SCPI << block of {len} bytes");

        let mut term = vec![0u8; self.get_terminator().len()];
        self.read_exact(&mut term)?;
        if term != self.get_terminator().as_bytes() {
            return Err(ScpiError::MalformedBlock(format!(
                "block not followed by terminator, got {term:?}"
            )));
        }
        Ok(data)
    }

    /// Send a query and read the binary block that the instrument answers with.
    fn query_block(&mut self, cmd: &str) -> Result<Vec<u8>, ScpiError> {
        self.sendcmd(cmd)?;
        self.read_block()
    }
}
