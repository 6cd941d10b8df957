//! Bootstrap and lifecycle core of the chaos agent.
//!
//! The agent runs on a managed node and keeps a relationship with a remote
//! controller: it registers itself, sends periodic heartbeats and metric
//! reports, and serves a small local HTTP control surface. This crate owns
//! the part that must be right before any of that can happen: the ordered
//! startup sequence, the registry of protocol handlers, and the process
//! lifecycle around them.
//!
//! Startup is strictly ordered. Configuration is loaded and structured
//! telemetry installed first; then the shared [`transport`] client, the
//! collaborator handles, and the protocol handlers are built. Handlers are
//! registered with a [`ConnectionManager`] and activated in one step, after
//! which the HTTP surface is assembled and its listener bound. Any failure
//! up to that point is fatal: the liveness marker is set to
//! [`FAILURE_SENTINEL`] and the process exits with status 1. On success the
//! marker holds the agent pid and the process waits for a termination
//! signal.
//!
//! ## Supervised duties
//!
//! Every concurrent duty, including the HTTP listener, runs through the
//! [`Supervisor`]. A duty that fails or panics is reported and logged; it
//! never takes the process down with it. Shutdown cancels every duty through
//! a shared token, waits for them within a bounded budget, and then tells
//! the controller the agent is closing.

pub mod api;
mod bootstrap;
mod collaborators;
mod conn;
mod health;
mod process;
mod supervisor;
mod telemetry;
pub mod transport;

pub use bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader};
pub use collaborators::{
    ChartError, ChartRelease, ChartRenderer, ClusterClient, EnvClusterClient, HelmChartRenderer,
    MetricRegistry, shared_cluster_client,
};
pub use conn::{
    ActiveConnections, AgentIdentity, CloseHandler, ConnectionManager, DutyError,
    HeartbeatHandler, MetricHandler, ProtocolHandler, RegistrationHandler,
};
pub use health::{HealthReporter, StartupStep, StructuredHealthReporter};
pub use process::{
    FAILURE_SENTINEL, FailurePolicy, LaunchError, LivenessMarker, LivenessWriteError,
    ProcessExit, ShutdownError, ShutdownReason, ShutdownSignal, SystemExit, SystemShutdownSignal,
    run_agent,
};
pub use supervisor::{Supervisor, TaskOutcome, TaskReport};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
