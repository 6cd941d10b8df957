use std::fmt;
use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
///
/// `wait` blocks the calling thread; the sequencer runs it on the blocking
/// pool.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<ShutdownReason, ShutdownError>;
}

/// Why the agent is shutting down. Reported to the controller on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal arrived.
    Signal(i32),
    /// Shutdown was requested programmatically.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(SIGTERM) => formatter.write_str("received SIGTERM"),
            Self::Signal(SIGINT) => formatter.write_str("received SIGINT"),
            Self::Signal(SIGQUIT) => formatter.write_str("received SIGQUIT"),
            Self::Signal(SIGHUP) => formatter.write_str("received SIGHUP"),
            Self::Signal(other) => write!(formatter, "received signal {other}"),
            Self::Requested => formatter.write_str("shutdown requested"),
        }
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The blocking wait did not complete.
    #[error("shutdown listener stopped unexpectedly: {source}")]
    Join {
        /// Underlying join error.
        #[source]
        source: JoinError,
    },
}

/// Shutdown listener that waits for termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a signal listener.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<ShutdownReason, ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let reason = signals
            .forever()
            .next()
            .map_or(ShutdownReason::Requested, ShutdownReason::Signal);
        info!(
            target: PROCESS_TARGET,
            reason = %reason,
            "shutdown signal received"
        );
        Ok(reason)
    }
}
