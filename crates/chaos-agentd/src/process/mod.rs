//! Process lifecycle: startup sequencing, liveness marker, and exit policy.

use std::time::Duration;

mod errors;
pub(crate) mod launch;
mod liveness;
mod policy;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_agent;
pub use liveness::{FAILURE_SENTINEL, LivenessMarker, LivenessWriteError};
pub use policy::{FailurePolicy, ProcessExit, SystemExit};
pub use shutdown::{ShutdownError, ShutdownReason, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
/// Budget for duty loops to stop once shutdown starts.
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
