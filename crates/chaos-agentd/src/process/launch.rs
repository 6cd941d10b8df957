//! Sequences agent startup and holds the process until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use chaos_config::{Config, RuntimePaths};
use tokio::runtime::Builder;
use tracing::{info, warn};

use crate::api::{ApiDeps, ApiRegistry, HttpListener};
use crate::bootstrap::{ConfigLoader, SystemConfigLoader};
use crate::collaborators::{
    ChartRenderer, ClusterClient, HelmChartRenderer, MetricRegistry, shared_cluster_client,
};
use crate::conn::{
    AgentIdentity, CloseHandler, ConnectionManager, HeartbeatHandler, MetricHandler,
    RegistrationHandler,
};
use crate::health::{HealthReporter, StartupStep, StructuredHealthReporter};
use crate::supervisor::Supervisor;
use crate::telemetry;
use crate::transport::{ApiId, TransportClient};

use super::errors::LaunchError;
use super::liveness::LivenessMarker;
use super::policy::{FailurePolicy, ProcessExit, SystemExit};
use super::shutdown::{ShutdownError, ShutdownReason, ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

/// Process-level collaborators needed to control the agent lifecycle.
pub(crate) struct ProcessControl<S, X> {
    pub(crate) shutdown: S,
    pub(crate) exit: X,
}

/// Service dependencies required to bring the agent up.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) cluster: Arc<dyn ClusterClient>,
    pub(crate) api: ApiRegistry,
    /// Marker location used until configuration names the real one.
    pub(crate) fallback_paths: RuntimePaths,
}

/// Collaborators required to launch the agent.
pub(crate) struct LaunchPlan<L, S, X> {
    pub(crate) process: ProcessControl<S, X>,
    pub(crate) services: ServiceDeps<L>,
}

/// Everything the hold phase needs once startup has succeeded.
struct Running {
    config: Config,
    listen: SocketAddr,
    close: CloseHandler,
}

/// Runs the agent using the production collaborators.
///
/// Returns only after a graceful shutdown. Fatal startup failures terminate
/// the process from inside the failure policy.
pub fn run_agent() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            shutdown: SystemShutdownSignal::new(),
            exit: SystemExit,
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            cluster: shared_cluster_client(),
            api: ApiRegistry::standard(),
            fallback_paths: RuntimePaths::from_config(&Config::default()),
        },
    };
    run_agent_with(plan)
}

/// Runs the agent with injected collaborators on a fresh multi-threaded
/// runtime.
pub(crate) fn run_agent_with<L, S, X>(plan: LaunchPlan<L, S, X>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
    X: ProcessExit,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl { shutdown, exit } = process;
    let mut policy = FailurePolicy::new(
        LivenessMarker::from_paths(&services.fallback_paths),
        exit,
    );

    let runtime = match Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(source) => {
            let error = LaunchError::Runtime { source };
            services.reporter.startup_failed(&error);
            policy.on_startup_failure(Some(&error));
            return Err(error);
        }
    };
    runtime.block_on(launch(services, shutdown, &mut policy))
}

async fn launch<L, S, X>(
    services: ServiceDeps<L>,
    shutdown: S,
    policy: &mut FailurePolicy<X>,
) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
    X: ProcessExit,
{
    let ServiceDeps {
        loader,
        reporter,
        cluster,
        api,
        ..
    } = services;

    info!(target: PROCESS_TARGET, "starting chaos agent");
    reporter.startup_starting();
    let mut supervisor = Supervisor::new(Arc::clone(&reporter));

    let running = match bring_up(&loader, &*reporter, cluster, &api, policy, &mut supervisor).await
    {
        Ok(running) => running,
        Err(error) => {
            reporter.startup_failed(&error);
            policy.on_startup_failure(Some(&error));
            supervisor.shutdown(SHUTDOWN_TIMEOUT).await;
            return Err(error);
        }
    };

    if let Err(source) = policy.on_startup_success(std::process::id()) {
        let error = LaunchError::from(source);
        reporter.startup_failed(&error);
        supervisor.shutdown(SHUTDOWN_TIMEOUT).await;
        return Err(error);
    }
    reporter.startup_succeeded(&running.config, running.listen);

    let reason = match hold(shutdown).await {
        Ok(reason) => reason,
        Err(source) => {
            warn!(
                target: PROCESS_TARGET,
                error = %source,
                "shutdown listener failed; stopping duties"
            );
            supervisor.shutdown(SHUTDOWN_TIMEOUT).await;
            policy.record_failure();
            notify_close(&running.close, &source.to_string()).await;
            return Err(source.into());
        }
    };

    reporter.shutdown_started();
    supervisor.shutdown(SHUTDOWN_TIMEOUT).await;
    notify_close(&running.close, &reason.to_string()).await;
    reporter.shutdown_completed();
    info!(
        target: PROCESS_TARGET,
        reason = %reason,
        "shutdown sequence completed"
    );
    Ok(())
}

/// Startup steps, in order. Every error is fatal to startup.
async fn bring_up<L, X>(
    loader: &L,
    reporter: &dyn HealthReporter,
    cluster: Arc<dyn ClusterClient>,
    api: &ApiRegistry,
    policy: &mut FailurePolicy<X>,
    supervisor: &mut Supervisor,
) -> Result<Running, LaunchError>
where
    L: ConfigLoader,
    X: ProcessExit,
{
    let config = loader.load().and_then(Config::validated)?;
    reporter.step_completed(StartupStep::ConfigLoaded);

    telemetry::initialise(&config)?;
    reporter.step_completed(StartupStep::TelemetryReady);

    let paths = config.runtime_paths();
    policy.retarget(LivenessMarker::from_paths(&paths));
    paths.prepare()?;
    reporter.step_completed(StartupStep::RuntimePrepared);

    let transport = Arc::new(TransportClient::new(&config.transport())?);
    reporter.step_completed(StartupStep::TransportReady);

    let mut metrics = MetricRegistry::new(Arc::clone(&cluster));
    metrics.init();
    let metrics = Arc::new(metrics);
    let chart: Arc<dyn ChartRenderer> = Arc::new(HelmChartRenderer::new(config.chart()));
    reporter.step_completed(StartupStep::CollaboratorsReady);

    let identity = AgentIdentity::new(&config, std::process::id());
    let mut connections = ConnectionManager::new();
    connections.register(
        ApiId::Registration,
        Arc::new(RegistrationHandler::new(
            Arc::clone(&transport),
            identity.clone(),
            config.registration(),
        )),
    );
    connections.register(
        ApiId::Heartbeat,
        Arc::new(HeartbeatHandler::new(
            Arc::clone(&transport),
            config.agent_id(),
            config.heartbeat(),
        )),
    );
    connections.register(
        ApiId::MetricReport,
        Arc::new(MetricHandler::new(
            Arc::clone(&transport),
            metrics,
            config.agent_id(),
            config.metric(),
        )),
    );
    let active = connections.start(supervisor);
    reporter.step_completed(StartupStep::DutiesStarted);

    let deps = ApiDeps {
        transport: Arc::clone(&transport),
        cluster,
        chart,
        identity,
        duties: active.ids().to_vec(),
    };
    let router = api.register(&deps)?;
    reporter.step_completed(StartupStep::ApiRegistered);

    let listener = HttpListener::bind(config.port()).await?;
    let listen = listener.local_addr();
    listener.launch(router, supervisor);
    reporter.step_completed(StartupStep::ListenerLaunched);

    let close = CloseHandler::new(transport, config.agent_id());
    Ok(Running {
        config,
        listen,
        close,
    })
}

async fn notify_close(close: &CloseHandler, reason: &str) {
    if let Err(error) = close.notify(reason).await {
        warn!(
            target: PROCESS_TARGET,
            error = %error,
            "controller was not told about shutdown"
        );
    }
}

/// Blocks a pool thread on the shutdown signal.
async fn hold<S>(shutdown: S) -> Result<ShutdownReason, ShutdownError>
where
    S: ShutdownSignal + 'static,
{
    info!(target: PROCESS_TARGET, "holding until shutdown");
    tokio::task::spawn_blocking(move || shutdown.wait())
        .await
        .map_err(|source| ShutdownError::Join { source })?
}
