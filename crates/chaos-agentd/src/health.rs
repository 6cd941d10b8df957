//! Structured health reporting for agent lifecycle events.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use chaos_config::Config;

use crate::process::LaunchError;
use crate::supervisor::{TaskOutcome, TaskReport};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Ordered steps of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StartupStep {
    /// Configuration resolved.
    ConfigLoaded,
    /// Structured logging installed.
    TelemetryReady,
    /// Runtime directories prepared from configuration.
    RuntimePrepared,
    /// Shared transport client constructed.
    TransportReady,
    /// Cluster client, metric registry, and chart renderer available.
    CollaboratorsReady,
    /// Protocol handlers registered and activated.
    DutiesStarted,
    /// HTTP control surface routes assembled.
    ApiRegistered,
    /// HTTP listener bound and serving.
    ListenerLaunched,
}

impl StartupStep {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigLoaded => "config_loaded",
            Self::TelemetryReady => "telemetry_ready",
            Self::RuntimePrepared => "runtime_prepared",
            Self::TransportReady => "transport_ready",
            Self::CollaboratorsReady => "collaborators_ready",
            Self::DutiesStarted => "duties_started",
            Self::ApiRegistered => "api_registered",
            Self::ListenerLaunched => "listener_launched",
        }
    }
}

impl fmt::Display for StartupStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn startup_starting(&self);

    /// Invoked as each startup step completes, in order.
    fn step_completed(&self, step: StartupStep);

    /// Invoked once the liveness marker holds the real pid.
    fn startup_succeeded(&self, config: &Config, listen: SocketAddr);

    /// Invoked when startup fails, before the failure policy runs.
    fn startup_failed(&self, error: &LaunchError);

    /// Invoked by the supervisor whenever a background duty ends.
    fn duty_finished(&self, report: &TaskReport);

    /// Invoked when the shutdown signal arrives.
    fn shutdown_started(&self);

    /// Invoked after duties stopped and the controller was notified.
    fn shutdown_completed(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn startup_starting(&self) {
        (**self).startup_starting();
    }

    fn step_completed(&self, step: StartupStep) {
        (**self).step_completed(step);
    }

    fn startup_succeeded(&self, config: &Config, listen: SocketAddr) {
        (**self).startup_succeeded(config, listen);
    }

    fn startup_failed(&self, error: &LaunchError) {
        (**self).startup_failed(error);
    }

    fn duty_finished(&self, report: &TaskReport) {
        (**self).duty_finished(report);
    }

    fn shutdown_started(&self) {
        (**self).shutdown_started();
    }

    fn shutdown_completed(&self) {
        (**self).shutdown_completed();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn startup_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "startup_starting",
            "starting chaos agent"
        );
    }

    fn step_completed(&self, step: StartupStep) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "step_completed",
            step = %step,
            "startup step completed"
        );
    }

    fn startup_succeeded(&self, config: &Config, listen: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "startup_succeeded",
            agent_id = %config.agent_id(),
            listen = %listen,
            liveness = %config.liveness_path,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "chaos agent running"
        );
    }

    fn startup_failed(&self, error: &LaunchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "startup_failed",
            error = %error,
            "chaos agent startup failed"
        );
    }

    fn duty_finished(&self, report: &TaskReport) {
        match &report.outcome {
            TaskOutcome::Completed => tracing::info!(
                target: HEALTH_TARGET,
                event = "duty_finished",
                duty = %report.name,
                outcome = %report.outcome,
                "duty finished"
            ),
            TaskOutcome::Failed(_) | TaskOutcome::Panicked(_) => tracing::warn!(
                target: HEALTH_TARGET,
                event = "duty_finished",
                duty = %report.name,
                outcome = %report.outcome,
                "duty ended abnormally"
            ),
        }
    }

    fn shutdown_started(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_started",
            "chaos agent shutting down"
        );
    }

    fn shutdown_completed(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_completed",
            "chaos agent stopped"
        );
    }
}
