//! This module provides the implementation for an instrument controlled via TCP/IP.
//!
//! It includes a blocking implementation of the [`ScpiInterface`](crate::ScpiInterface) trait
//! using the [`std::net::TcpStream`] struct.

use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::info;

use crate::{DEFAULT_TIMEOUT, Instrument, ScpiError};

/// The TCP port SCPI servers usually listen on (raw socket mode).
pub const DEFAULT_SCPI_PORT: u16 = 5000;

/// A blocking TCP/IP implementation using the [`std::net::TcpStream`] struct.
#[derive(Debug)]
pub struct TcpIpInstrument {}

impl TcpIpInstrument {
    /// Try to connect to an instrument with the default timeout of three seconds.
    ///
    /// The terminator is by default set to `"\r\n"`. It is automatically appended to commands
    /// and reading responses will read until the terminator is found.
    ///
    /// # Arguments
    /// * `sock_addr` - Socket address.
    pub fn try_new<A: ToSocketAddrs>(
        sock_addr: A,
    ) -> Result<Instrument<TcpStream>, ScpiError> {
        Self::with_timeout(sock_addr, DEFAULT_TIMEOUT)
    }

    /// Try to connect to an instrument with a given read and write timeout.
    ///
    /// A zero timeout is rejected by the standard library, so we never block infinitely on a
    /// dead connection.
    ///
    /// # Arguments
    /// * `sock_addr` - Socket address.
    /// * `timeout` - Read and write timeout of the stream.
    pub fn with_timeout<A: ToSocketAddrs>(
        sock_addr: A,
        timeout: Duration,
    ) -> Result<Instrument<TcpStream>, ScpiError> {
        let stream = TcpStream::connect(sock_addr)?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        if let Ok(peer) = stream.peer_addr() {
            info!("Connected to SCPI server at {peer}");
        }
        Ok(Instrument::new(stream, timeout))
    }
}
