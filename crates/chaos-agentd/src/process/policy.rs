//! Decides how startup outcomes end the process.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use super::PROCESS_TARGET;
use super::liveness::{LivenessMarker, LivenessWriteError};

/// Exit status used for every fatal startup failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Terminates the process.
///
/// Production code never returns from either method. Test doubles record the
/// call and return so the caller's own control flow can be observed.
pub trait ProcessExit: Send + Sync {
    /// Exits with `code`.
    fn exit(&self, code: i32);

    /// Aborts without unwinding.
    fn abort(&self);
}

impl<T> ProcessExit for Arc<T>
where
    T: ProcessExit + ?Sized,
{
    fn exit(&self, code: i32) {
        (**self).exit(code);
    }

    fn abort(&self) {
        (**self).abort();
    }
}

/// Exit strategy backed by [`std::process`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExit;

impl ProcessExit for SystemExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }

    fn abort(&self) {
        std::process::abort();
    }
}

/// Startup success and failure handling around the liveness marker.
#[derive(Debug)]
pub struct FailurePolicy<X> {
    marker: LivenessMarker,
    exit: X,
}

impl<X> FailurePolicy<X>
where
    X: ProcessExit,
{
    /// Builds a policy writing to `marker`.
    pub fn new(marker: LivenessMarker, exit: X) -> Self {
        Self { marker, exit }
    }

    /// Points the policy at a different marker, typically once configuration
    /// has resolved the real location.
    pub fn retarget(&mut self, marker: LivenessMarker) {
        self.marker = marker;
    }

    /// Marker the policy writes to.
    pub fn marker(&self) -> &LivenessMarker {
        &self.marker
    }

    /// Marks the failure and exits with [`FAILURE_EXIT_CODE`].
    ///
    /// `None` does nothing. The sentinel write is best effort: its failure is
    /// logged and the exit still happens.
    pub fn on_startup_failure<E>(&self, error: Option<&E>)
    where
        E: fmt::Display + ?Sized,
    {
        let Some(error) = error else {
            return;
        };
        warn!(
            target: PROCESS_TARGET,
            error = %error,
            "start agent failed"
        );
        self.record_failure();
        error!(target: PROCESS_TARGET, "chaos agent will exit");
        self.exit.exit(FAILURE_EXIT_CODE);
    }

    /// Writes the failure sentinel, logging rather than returning a write
    /// error.
    pub fn record_failure(&self) {
        if let Err(write_error) = self.marker.write_failure() {
            warn!(
                target: PROCESS_TARGET,
                error = %write_error,
                "failed to record failure in liveness marker"
            );
        }
    }

    /// Records `pid` as running. A marker that cannot be written aborts the
    /// process, since supervisors would otherwise misread the agent state.
    pub fn on_startup_success(&self, pid: u32) -> Result<(), LivenessWriteError> {
        match self.marker.write_pid(pid) {
            Ok(()) => {
                info!(target: PROCESS_TARGET, pid, "chaos agent marked running");
                Ok(())
            }
            Err(write_error) => {
                error!(
                    target: PROCESS_TARGET,
                    error = %write_error,
                    file = %self.marker.path().display(),
                    "failed to write pid; aborting"
                );
                self.exit.abort();
                Err(write_error)
            }
        }
    }
}
