use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::collaborators::ChartError;

/// Errors raised while assembling the HTTP control surface.
#[derive(Debug, Error)]
pub enum ApiRegistrationError {
    /// Two surfaces claimed the same path.
    #[error("route '{path}' registered twice (second claim by '{surface}')")]
    DuplicateRoute {
        /// Contested path.
        path: String,
        /// Surface making the second claim.
        surface: &'static str,
    },
    /// The chart renderer could not resolve its release.
    #[error("surface '{surface}' could not resolve the chart release: {source}")]
    Chart {
        /// Surface that needed the chart.
        surface: &'static str,
        /// Underlying renderer error.
        #[source]
        source: ChartError,
    },
}

/// Errors raised before the listener starts serving.
#[derive(Debug, Error)]
pub enum ListenSetupError {
    /// The port could not be bound.
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound socket did not report its address.
    #[error("failed to read HTTP listener address: {source}")]
    LocalAddr {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Faults that end a listener which was serving.
///
/// These are reported to the supervisor and never stop the agent.
#[derive(Debug, Error)]
pub enum ListenRuntimeFault {
    /// The accept loop failed.
    #[error("HTTP listener stopped: {source}")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A request handler panicked and the listener was stopped.
    #[error("request handler panicked: {message}")]
    RequestPanicked {
        /// Panic message.
        message: String,
    },
}
