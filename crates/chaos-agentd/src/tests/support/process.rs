//! Process-level doubles: exit recorder and a triggerable shutdown signal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::process::{ProcessExit, ShutdownError, ShutdownReason, ShutdownSignal};

/// Call observed by [`RecordingExit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCall {
    /// `exit(code)`, with the liveness marker content at that moment.
    Exit {
        code: i32,
        marker: Option<String>,
    },
    /// `abort()`.
    Abort,
}

/// Records exit requests instead of terminating the test process.
#[derive(Debug)]
pub struct RecordingExit {
    marker: PathBuf,
    calls: Mutex<Vec<ExitCall>>,
}

impl RecordingExit {
    /// Recorder that snapshots the marker at `marker` on every exit.
    #[must_use]
    pub fn watching(marker: &Path) -> Self {
        Self {
            marker: marker.to_path_buf(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ExitCall> {
        self.calls.lock().expect("exit mutex poisoned").clone()
    }

    fn record(&self, call: ExitCall) {
        self.calls.lock().expect("exit mutex poisoned").push(call);
    }
}

impl ProcessExit for RecordingExit {
    fn exit(&self, code: i32) {
        let marker = fs::read_to_string(&self.marker).ok();
        self.record(ExitCall::Exit { code, marker });
    }

    fn abort(&self) {
        self.record(ExitCall::Abort);
    }
}

/// Shutdown signal released by [`TestShutdownSignal::trigger`].
#[derive(Clone)]
pub struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
    failing: Arc<AtomicBool>,
}

impl TestShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the wait fail with an install error once released.
    pub fn fail_on_trigger(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        *triggered = true;
        cvar.notify_all();
    }
}

impl Default for TestShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<ShutdownReason, ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        while !*triggered {
            triggered = cvar
                .wait(triggered)
                .expect("shutdown mutex poisoned during wait");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShutdownError::Install {
                source: io::Error::other("signal handlers unavailable"),
            });
        }
        Ok(ShutdownReason::Requested)
    }
}
