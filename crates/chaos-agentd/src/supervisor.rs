//! Uniform fault-isolation boundary for concurrent agent duties.
//!
//! Every background duty runs through [`Supervisor::spawn`]. The duty future is
//! polled inside `catch_unwind`, so a panic ends only that task. Each task
//! sends exactly one [`TaskReport`] over an unbounded channel to a single
//! monitor loop, which logs the outcome and forwards it to the
//! [`HealthReporter`]. Reports never escalate to process exit.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::health::HealthReporter;

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// How a supervised task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The duty returned successfully.
    Completed,
    /// The duty returned an error, rendered as text.
    Failed(String),
    /// The duty panicked; carries the panic message.
    Panicked(String),
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => formatter.write_str("completed"),
            Self::Failed(message) => write!(formatter, "failed: {message}"),
            Self::Panicked(message) => write!(formatter, "panicked: {message}"),
        }
    }
}

/// Message a supervised task sends when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Name given to the task when it was spawned.
    pub name: String,
    /// How the task ended.
    pub outcome: TaskOutcome,
}

/// Owner of every background duty task.
pub struct Supervisor {
    root: CancellationToken,
    reports: Option<mpsc::UnboundedSender<TaskReport>>,
    tasks: Vec<(String, JoinHandle<()>)>,
    monitor: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Starts the monitor loop. Must be called from within a tokio runtime.
    pub fn new(reporter: Arc<dyn HealthReporter>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let monitor = tokio::spawn(monitor(receiver, reporter));
        Self {
            root: CancellationToken::new(),
            reports: Some(sender),
            tasks: Vec::new(),
            monitor: Some(monitor),
        }
    }

    /// Token cancelled when the supervisor shuts down.
    ///
    /// Each call hands out a child token, so a duty cancelling its own token
    /// does not affect any other duty.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Number of tasks spawned so far, finished or not.
    #[must_use]
    pub fn spawned(&self) -> usize {
        self.tasks.len()
    }

    /// Runs `duty` as an isolated task named `name`.
    pub fn spawn<F, E>(&mut self, name: impl Into<String>, duty: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display,
    {
        let name = name.into();
        let task_name = name.clone();
        let sender = self.reports.clone();
        let handle = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(duty).catch_unwind().await {
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(error)) => TaskOutcome::Failed(error.to_string()),
                Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
            };
            if let Some(sender) = sender {
                // The monitor only stops once every sender is gone.
                let _ = sender.send(TaskReport {
                    name: task_name,
                    outcome,
                });
            }
        });
        info!(target: SUPERVISOR_TARGET, task = %name, "supervised task spawned");
        self.tasks.push((name, handle));
    }

    /// Cancels every duty and waits for them to finish.
    ///
    /// Tasks still running when `timeout` elapses are aborted. Returns once
    /// the monitor loop has drained every report.
    pub async fn shutdown(mut self, timeout: Duration) {
        info!(
            target: SUPERVISOR_TARGET,
            tasks = self.tasks.len(),
            timeout_ms = timeout.as_millis(),
            "cancelling supervised tasks"
        );
        self.root.cancel();
        let deadline = Instant::now() + timeout;
        for (name, mut handle) in std::mem::take(&mut self.tasks) {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                warn!(
                    target: SUPERVISOR_TARGET,
                    task = %name,
                    "task ignored cancellation; aborting"
                );
                handle.abort();
                let _ = handle.await;
            }
        }
        drop(self.reports.take());
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.await;
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.root.cancel();
        for (_, handle) in &self.tasks {
            handle.abort();
        }
        if let Some(monitor) = &self.monitor {
            monitor.abort();
        }
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Supervisor")
            .field("tasks", &self.tasks.len())
            .field("cancelled", &self.root.is_cancelled())
            .finish()
    }
}

async fn monitor(
    mut receiver: mpsc::UnboundedReceiver<TaskReport>,
    reporter: Arc<dyn HealthReporter>,
) {
    while let Some(report) = receiver.recv().await {
        match &report.outcome {
            TaskOutcome::Completed => info!(
                target: SUPERVISOR_TARGET,
                task = %report.name,
                "supervised task completed"
            ),
            TaskOutcome::Failed(message) => warn!(
                target: SUPERVISOR_TARGET,
                task = %report.name,
                error = %message,
                "supervised task failed"
            ),
            TaskOutcome::Panicked(message) => error!(
                target: SUPERVISOR_TARGET,
                task = %report.name,
                panic = %message,
                "supervised task panicked"
            ),
        }
        reporter.duty_finished(&report);
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::tests::support::RecordingHealthReporter;

    async fn explode() -> Result<(), String> {
        panic!("exploded")
    }

    fn supervisor() -> (Supervisor, Arc<RecordingHealthReporter>) {
        let reporter = Arc::new(RecordingHealthReporter::default());
        (Supervisor::new(reporter.clone()), reporter)
    }

    #[tokio::test]
    async fn reports_each_outcome() {
        let (mut supervisor, reporter) = supervisor();
        supervisor.spawn("ok", async { Ok::<(), String>(()) });
        supervisor.spawn("err", async { Err::<(), _>("refused".to_owned()) });
        supervisor.spawn("boom", explode());
        supervisor.shutdown(Duration::from_secs(1)).await;

        let mut reports = reporter.duty_reports();
        reports.sort_by(|left, right| left.name.cmp(&right.name));
        assert_eq!(
            reports,
            vec![
                TaskReport {
                    name: "boom".into(),
                    outcome: TaskOutcome::Panicked("exploded".into()),
                },
                TaskReport {
                    name: "err".into(),
                    outcome: TaskOutcome::Failed("refused".into()),
                },
                TaskReport {
                    name: "ok".into(),
                    outcome: TaskOutcome::Completed,
                },
            ]
        );
    }

    #[tokio::test]
    async fn a_panicking_task_leaves_siblings_running() {
        let (mut supervisor, reporter) = supervisor();
        let ticks = Arc::new(AtomicUsize::new(0));
        let token = supervisor.cancellation();
        let counter = Arc::clone(&ticks);
        supervisor.spawn("ticker", async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => return Ok::<(), String>(()),
                    () = tokio::time::sleep(Duration::from_millis(5)) => {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });
        supervisor.spawn("boom", explode());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let before = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ticks.load(Ordering::SeqCst) > before);

        supervisor.shutdown(Duration::from_secs(1)).await;
        let names: Vec<_> = reporter
            .duty_reports()
            .into_iter()
            .map(|report| (report.name, report.outcome))
            .collect();
        assert!(names.contains(&("ticker".into(), TaskOutcome::Completed)));
        assert!(names.contains(&("boom".into(), TaskOutcome::Panicked("exploded".into()))));
    }

    #[tokio::test]
    async fn aborts_tasks_that_ignore_cancellation() {
        let (mut supervisor, reporter) = supervisor();
        supervisor.spawn("stubborn", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), String>(())
        });
        supervisor.shutdown(Duration::from_millis(20)).await;
        assert!(reporter.duty_reports().is_empty());
    }

    #[test]
    fn panic_message_handles_foreign_payloads() {
        assert_eq!(panic_message(&42_u8), "unknown panic");
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
    }
}
