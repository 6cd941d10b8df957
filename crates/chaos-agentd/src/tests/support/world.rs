//! Lifecycle test world: runs the full agent on a background thread against
//! a fake controller and records everything the agent does to the process.

use std::net::{Ipv4Addr, TcpListener as StdTcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use axum::routing::get;
use tokio::runtime::{Builder, Runtime};

use chaos_config::RuntimePaths;

use crate::api::{ApiDeps, ApiRegistrationError, ApiRegistry, ApiSurface, Routes};
use crate::bootstrap::ConfigLoader;
use crate::collaborators::EnvClusterClient;
use crate::health::HealthReporter;
use crate::process::LaunchError;
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_agent_with};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::controller::FakeController;
use super::process::{ExitCall, RecordingExit, TestShutdownSignal};
use super::reporter::{HealthEvent, RecordingHealthReporter};
use super::wait::wait_until;

pub type StepResult = Result<(), String>;

/// Path served by [`PanickingSurface`].
pub const PANIC_ROUTE: &str = "/v1/boom";

/// Surface whose only handler panics.
pub struct PanickingSurface;

async fn explode() -> &'static str {
    panic!("handler exploded")
}

impl ApiSurface for PanickingSurface {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn routes(&self, _deps: &ApiDeps) -> Result<Routes, ApiRegistrationError> {
        Ok(vec![(PANIC_ROUTE, get(explode))])
    }
}

/// Scenario world shared across lifecycle steps.
pub struct AgentWorld {
    runtime: Runtime,
    pub controller: FakeController,
    pub loader: TestConfigLoader,
    pub reporter: Arc<RecordingHealthReporter>,
    pub exit: Arc<RecordingExit>,
    shutdown: TestShutdownSignal,
    api: Option<ApiRegistry>,
    failing_config: bool,
    occupied: Option<StdTcpListener>,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
}

impl AgentWorld {
    #[must_use]
    pub fn new() -> Self {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("test runtime");
        let controller = runtime.block_on(FakeController::start());
        let loader = TestConfigLoader::new(&controller.url());
        let exit = Arc::new(RecordingExit::watching(&loader.liveness_path()));
        Self {
            runtime,
            controller,
            loader,
            reporter: Arc::new(RecordingHealthReporter::default()),
            exit,
            shutdown: TestShutdownSignal::new(),
            api: None,
            failing_config: false,
            occupied: None,
            handle: None,
            result: None,
        }
    }

    pub fn use_failing_config(&mut self) {
        self.failing_config = true;
    }

    pub fn occupy_listen_port(&mut self) {
        let listener =
            StdTcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).expect("bind occupying listener");
        let port = listener.local_addr().expect("occupied address").port();
        self.loader.update(|config| config.port = port);
        self.occupied = Some(listener);
    }

    pub fn fail_shutdown_listener(&self) {
        self.shutdown.fail_on_trigger();
    }

    pub fn mount_panicking_surface(&mut self) {
        self.api = Some(ApiRegistry::standard().with_surface(PanickingSurface));
    }

    /// Launches the agent and waits until startup succeeded or failed.
    pub fn start(&mut self) -> StepResult {
        if self.handle.is_some() || self.result.is_some() {
            return Err("agent already started".to_owned());
        }
        let handle = if self.failing_config {
            self.spawn_agent(FailingConfigLoader)
        } else {
            self.spawn_agent(self.loader.clone())
        };
        self.handle = Some(handle);
        let reporter = Arc::clone(&self.reporter);
        wait_until(move || {
            reporter.events().iter().any(|event| {
                matches!(
                    event,
                    HealthEvent::StartupSucceeded { .. } | HealthEvent::StartupFailed(_)
                )
            })
        })
    }

    fn spawn_agent<L>(&mut self, loader: L) -> thread::JoinHandle<Result<(), LaunchError>>
    where
        L: ConfigLoader + 'static,
    {
        let plan = LaunchPlan {
            process: ProcessControl {
                shutdown: self.shutdown.clone(),
                exit: Arc::clone(&self.exit),
            },
            services: ServiceDeps {
                loader,
                reporter: Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
                cluster: Arc::new(EnvClusterClient::new(false, None)),
                api: self.api.take().unwrap_or_else(ApiRegistry::standard),
                fallback_paths: RuntimePaths::with_liveness_path(self.loader.liveness_path()),
            },
        };
        thread::spawn(move || run_agent_with(plan))
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Waits for the agent thread and records its result.
    pub fn join(&mut self) -> StepResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| "agent not running".to_owned())?;
        let result = handle
            .join()
            .map_err(|_| "agent thread panicked".to_owned())?;
        self.result = Some(result);
        Ok(())
    }

    pub fn last_result(&self) -> Option<&Result<(), LaunchError>> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&LaunchError> {
        self.result.as_ref()?.as_ref().err()
    }

    /// Port the agent's listener is bound to, once startup succeeded.
    pub fn listen_port(&self) -> Option<u16> {
        self.reporter.events().into_iter().find_map(|event| match event {
            HealthEvent::StartupSucceeded { port } => Some(port),
            _ => None,
        })
    }

    /// Issues `GET path` against the agent's listener.
    pub fn get(&self, path: &str) -> Result<u16, String> {
        let port = self
            .listen_port()
            .ok_or_else(|| "agent is not listening".to_owned())?;
        let url = format!("http://127.0.0.1:{port}{path}");
        self.runtime.block_on(async move {
            let response = reqwest::get(url).await.map_err(|error| error.to_string())?;
            Ok(response.status().as_u16())
        })
    }

    pub fn marker_path(&self) -> PathBuf {
        self.loader.liveness_path()
    }

    pub fn exit_calls(&self) -> Vec<ExitCall> {
        self.exit.calls()
    }
}

impl Default for AgentWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AgentWorld {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.trigger_shutdown();
            let _ = self.join();
        }
    }
}
