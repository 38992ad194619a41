//! Blocking poll loops with an optional timeout and cooperative cancellation.

use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use log::trace;

use crate::RedPitayaError;

/// Default sleep between two checks of a poll loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The conditions the acquisition waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCondition {
    /// The trigger fired.
    Triggered,
    /// The buffer is filled after the trigger.
    BufferFilled,
}

impl Display for PollCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollCondition::Triggered => write!(f, "the trigger"),
            PollCondition::BufferFilled => write!(f, "the buffer to be filled"),
        }
    }
}

/// A shared flag to cancel a running poll from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel all polls that watch this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancelToken::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag, such that the token can be used for the next grab.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Options of a poll loop.
///
/// The default polls every 10 ms without a timeout, i.e., it blocks until the condition is
/// observed. This matches the behavior of the board's reference software.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Sleep between two checks.
    pub interval: Duration,
    /// Give up after this duration. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Optional token to cancel the loop.
    pub cancel: Option<CancelToken>,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancel: None,
        }
    }
}

impl PollOptions {
    /// Set the timeout of the loop.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the sleep between two checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Watch the given token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Poll `check` until it returns `true`.
///
/// `on_tick` is called after every unsuccessful check, before sleeping, so that a host event
/// loop can process its events during long acquisitions. Errors of `check` are returned as they
/// are.
pub fn poll_until<F, T>(
    condition: PollCondition,
    options: &PollOptions,
    mut check: F,
    mut on_tick: T,
) -> Result<(), RedPitayaError>
where
    F: FnMut() -> Result<bool, RedPitayaError>,
    T: FnMut(),
{
    let tic = Instant::now();
    loop {
        if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(RedPitayaError::Cancelled { condition });
        }
        if check()? {
            trace!("Observed {condition} after {:?}", tic.elapsed());
            return Ok(());
        }
        if let Some(timeout) = options.timeout {
            if tic.elapsed() >= timeout {
                return Err(RedPitayaError::Timeout { condition, timeout });
            }
        }
        on_tick();
        thread::sleep(options.interval);
    }
}
