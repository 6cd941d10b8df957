//! Handles to the cluster client, chart renderer, and metric registry.
//!
//! The agent core only depends on the contracts defined here. The bundled
//! implementations are intentionally small: they inspect the process
//! environment and configuration rather than talking to a cluster.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use chaos_config::ChartConfig;

const COLLABORATORS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::collaborators");

/// Read-only view of the cluster the agent runs in.
pub trait ClusterClient: Send + Sync {
    /// Whether the agent runs inside a Kubernetes pod.
    fn in_cluster(&self) -> bool;

    /// Namespace of the pod, when known.
    fn namespace(&self) -> Option<String>;
}

/// Cluster client derived from the pod environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvClusterClient {
    in_cluster: bool,
    namespace: Option<String>,
}

impl EnvClusterClient {
    /// Builds a client from explicit values.
    #[must_use]
    pub fn new(in_cluster: bool, namespace: Option<String>) -> Self {
        Self {
            in_cluster,
            namespace,
        }
    }

    /// Reads `KUBERNETES_SERVICE_HOST` and `POD_NAMESPACE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            env::var_os("KUBERNETES_SERVICE_HOST").is_some(),
            env::var("POD_NAMESPACE").ok().filter(|value| !value.is_empty()),
        )
    }
}

impl ClusterClient for EnvClusterClient {
    fn in_cluster(&self) -> bool {
        self.in_cluster
    }

    fn namespace(&self) -> Option<String> {
        self.namespace.clone()
    }
}

static CLUSTER_CLIENT: OnceCell<Arc<EnvClusterClient>> = OnceCell::new();

/// Process-wide cluster client, created on first use.
pub fn shared_cluster_client() -> Arc<dyn ClusterClient> {
    let client = CLUSTER_CLIENT.get_or_init(|| {
        let client = EnvClusterClient::from_env();
        debug!(
            target: COLLABORATORS_TARGET,
            in_cluster = client.in_cluster,
            namespace = ?client.namespace,
            "cluster client initialised"
        );
        Arc::new(client)
    });
    Arc::clone(client) as Arc<dyn ClusterClient>
}

/// Chart release resolved by a [`ChartRenderer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRelease {
    /// Release name.
    pub release: String,
    /// Namespace the release targets.
    pub namespace: String,
}

/// Errors raised by chart renderers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    /// A required chart setting was empty.
    #[error("chart {field} must not be empty")]
    Empty {
        /// Name of the empty setting.
        field: &'static str,
    },
}

/// Renders the chart the HTTP surface installs on request.
pub trait ChartRenderer: Send + Sync {
    /// Resolves the release this renderer targets.
    fn release(&self) -> Result<ChartRelease, ChartError>;
}

/// Helm-style renderer that resolves the release from configuration.
#[derive(Debug, Clone)]
pub struct HelmChartRenderer {
    chart: ChartConfig,
}

impl HelmChartRenderer {
    /// Builds a renderer for the configured release.
    #[must_use]
    pub fn new(chart: ChartConfig) -> Self {
        Self { chart }
    }
}

impl ChartRenderer for HelmChartRenderer {
    fn release(&self) -> Result<ChartRelease, ChartError> {
        if self.chart.release.trim().is_empty() {
            return Err(ChartError::Empty { field: "release" });
        }
        if self.chart.namespace.trim().is_empty() {
            return Err(ChartError::Empty { field: "namespace" });
        }
        Ok(ChartRelease {
            release: self.chart.release.clone(),
            namespace: self.chart.namespace.clone(),
        })
    }
}

type Sampler = Box<dyn Fn() -> f64 + Send + Sync>;

/// Named metric sources sampled by the metric-report duty.
pub struct MetricRegistry {
    cluster: Arc<dyn ClusterClient>,
    sources: BTreeMap<String, Sampler>,
}

impl MetricRegistry {
    /// Creates an empty registry bound to the cluster handle.
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            cluster,
            sources: BTreeMap::new(),
        }
    }

    /// Installs the built-in sources.
    pub fn init(&mut self) {
        let started = Instant::now();
        self.register("agent_uptime_seconds", move || {
            started.elapsed().as_secs_f64()
        });
        let in_cluster = if self.cluster.in_cluster() { 1.0 } else { 0.0 };
        self.register("agent_in_cluster", move || in_cluster);
        debug!(
            target: COLLABORATORS_TARGET,
            sources = self.sources.len(),
            "metric registry initialised"
        );
    }

    /// Adds or replaces the source called `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, sampler: F)
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.sources.insert(name.into(), Box::new(sampler));
    }

    /// Samples every source.
    #[must_use]
    pub fn collect(&self) -> BTreeMap<String, f64> {
        self.sources
            .iter()
            .map(|(name, sampler)| (name.clone(), sampler()))
            .collect()
    }

    /// Whether no source is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MetricRegistry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
