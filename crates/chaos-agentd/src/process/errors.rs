//! Defines the unified error surface for agent startup.

use std::io;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use chaos_config::RuntimePathsError;

use crate::api::{ApiRegistrationError, ListenSetupError};
use crate::telemetry::TelemetryError;
use crate::transport::TransportInitError;

use super::liveness::LivenessWriteError;
use super::shutdown::ShutdownError;

/// Errors that abort agent startup or its shutdown wait.
///
/// Faults raised by duties or the listener after startup are not launch
/// errors; the supervisor reports them and the agent keeps running.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The runtime directory could not be prepared.
    #[error("failed to prepare runtime paths: {source}")]
    RuntimePaths {
        /// Underlying filesystem error.
        #[source]
        source: RuntimePathsError,
    },
    /// The transport client could not be built.
    #[error("failed to initialise transport client: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: TransportInitError,
    },
    /// Route registration for the HTTP surface failed.
    #[error("failed to register HTTP surface: {source}")]
    ApiRegistration {
        /// Underlying registration error.
        #[source]
        source: ApiRegistrationError,
    },
    /// The HTTP listener could not be set up.
    #[error("failed to set up HTTP listener: {source}")]
    ListenSetup {
        /// Underlying listener error.
        #[source]
        source: ListenSetupError,
    },
    /// The liveness marker could not record the running pid.
    #[error("failed to record liveness: {source}")]
    Liveness {
        /// Underlying marker error.
        #[source]
        source: LivenessWriteError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// The async runtime could not be built.
    #[error("failed to build async runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<Arc<OrthoError>> for LaunchError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<RuntimePathsError> for LaunchError {
    fn from(source: RuntimePathsError) -> Self {
        Self::RuntimePaths { source }
    }
}

impl From<TransportInitError> for LaunchError {
    fn from(source: TransportInitError) -> Self {
        Self::Transport { source }
    }
}

impl From<ApiRegistrationError> for LaunchError {
    fn from(source: ApiRegistrationError) -> Self {
        Self::ApiRegistration { source }
    }
}

impl From<ListenSetupError> for LaunchError {
    fn from(source: ListenSetupError) -> Self {
        Self::ListenSetup { source }
    }
}

impl From<LivenessWriteError> for LaunchError {
    fn from(source: LivenessWriteError) -> Self {
        Self::Liveness { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
