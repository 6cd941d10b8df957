//! Test double for [`HealthReporter`] that records lifecycle events for
//! assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use chaos_config::Config;

use crate::health::{HealthReporter, StartupStep};
use crate::process::LaunchError;
use crate::supervisor::TaskReport;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Startup began.
    StartupStarting,
    /// A startup step completed.
    Step(StartupStep),
    /// Startup succeeded and the listener is bound to `port`.
    StartupSucceeded { port: u16 },
    /// Startup failed with an error description.
    StartupFailed(String),
    /// A supervised duty ended.
    DutyFinished(TaskReport),
    /// Shutdown signal observed.
    ShutdownStarted,
    /// Shutdown finished.
    ShutdownCompleted,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Completed startup steps, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<StartupStep> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::Step(step) => Some(step),
                _ => None,
            })
            .collect()
    }

    /// Reports delivered by the supervisor, in arrival order.
    #[must_use]
    pub fn duty_reports(&self) -> Vec<TaskReport> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::DutyFinished(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    /// Whether `event` was recorded.
    #[must_use]
    pub fn saw(&self, event: &HealthEvent) -> bool {
        self.events().contains(event)
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn startup_starting(&self) {
        self.record(HealthEvent::StartupStarting);
    }

    fn step_completed(&self, step: StartupStep) {
        self.record(HealthEvent::Step(step));
    }

    fn startup_succeeded(&self, _config: &Config, listen: SocketAddr) {
        self.record(HealthEvent::StartupSucceeded {
            port: listen.port(),
        });
    }

    fn startup_failed(&self, error: &LaunchError) {
        self.record(HealthEvent::StartupFailed(error.to_string()));
    }

    fn duty_finished(&self, report: &TaskReport) {
        self.record(HealthEvent::DutyFinished(report.clone()));
    }

    fn shutdown_started(&self) {
        self.record(HealthEvent::ShutdownStarted);
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}
