//! Shared access to one command channel with master/slave ownership.

use std::sync::{Arc, Mutex};

use log::{debug, info};
use scpirs::ScpiError;

use crate::{CommandChannel, RedPitayaError};

/// Role of a [`BoardLink`] in the lifecycle of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The link opened the connection and is the only one allowed to close it.
    Master,
    /// The link borrows a connection that was opened by a master.
    Slave,
}

/// A handle to the command channel of one board.
///
/// The link that is created from a channel with [`BoardLink::master`] owns the connection.
/// Further sessions on the same board get a borrowing handle with [`BoardLink::slave`]. All
/// handles share the same channel, such that commands from different sessions are never
/// interleaved within one request/response exchange.
///
/// ```
/// use redpitaya_daq::{BoardLink, Role, ScpiChannel};
/// use scpirs::LoopbackInterface;
///
/// let channel = ScpiChannel::new(LoopbackInterface::new(vec![], vec![], "\r\n"));
/// let master = BoardLink::master(channel);
/// let slave = master.slave();
///
/// assert_eq!(slave.role(), Role::Slave);
/// assert!(slave.close().is_err()); // only the master may close
/// master.close().unwrap();
/// assert!(!slave.is_open());
/// ```
#[derive(Debug)]
pub struct BoardLink<C: CommandChannel> {
    channel: Arc<Mutex<Option<C>>>,
    role: Role,
}

impl<C: CommandChannel> BoardLink<C> {
    /// Create the owning link for a freshly opened channel.
    pub fn master(channel: C) -> Self {
        BoardLink {
            channel: Arc::new(Mutex::new(Some(channel))),
            role: Role::Master,
        }
    }

    /// Get a borrowing link to the same channel.
    pub fn slave(&self) -> Self {
        BoardLink {
            channel: Arc::clone(&self.channel),
            role: Role::Slave,
        }
    }

    /// The role of this link.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns `true` if this link owns the connection.
    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    /// Returns `true` as long as the master has not closed the connection.
    pub fn is_open(&self) -> bool {
        self.channel
            .lock()
            .expect("Mutex should not be poisoned")
            .is_some()
    }

    /// Close the connection.
    ///
    /// Only the master may close. Closing from a slave returns [`RedPitayaError::NotOwner`] and
    /// leaves the connection untouched. Closing an already closed connection does nothing.
    pub fn close(&self) -> Result<(), RedPitayaError> {
        if self.role != Role::Master {
            return Err(RedPitayaError::NotOwner);
        }
        let channel = {
            let mut guard = self.channel.lock().expect("Mutex should not be poisoned");
            guard.take()
        };
        if let Some(mut channel) = channel {
            info!("Master link closes the board connection");
            channel.close()?;
        } else {
            debug!("Board connection already closed");
        }
        Ok(())
    }

    /// Sampling clock of the board in Hz.
    pub fn clock_rate(&self) -> Result<f64, RedPitayaError> {
        let guard = self.channel.lock().expect("Mutex should not be poisoned");
        guard
            .as_ref()
            .map(|ch| ch.clock_rate())
            .ok_or(RedPitayaError::LinkClosed)
    }

    /// Run one exchange on the channel while holding the lock.
    pub(crate) fn with<R>(
        &self,
        f: impl FnOnce(&mut C) -> Result<R, ScpiError>,
    ) -> Result<R, RedPitayaError> {
        let mut guard = self.channel.lock().expect("Mutex should not be poisoned");
        let channel = guard.as_mut().ok_or(RedPitayaError::LinkClosed)?;
        Ok(f(channel)?)
    }
}
