//! Local HTTP control surface.
//!
//! Route handlers are contributed by [`ApiSurface`] implementations and
//! assembled by an [`ApiRegistry`] into a single `axum` router. The registry
//! rejects two surfaces claiming the same path instead of letting the router
//! panic on the overlap.

mod errors;
mod listener;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use axum::routing::{MethodRouter, get};
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::collaborators::{ChartRelease, ChartRenderer, ClusterClient};
use crate::conn::AgentIdentity;
use crate::transport::{ApiId, TransportClient};

pub use self::errors::{ApiRegistrationError, ListenRuntimeFault, ListenSetupError};
pub use self::listener::{HttpListener, LISTENER_TASK};

const API_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::api");

/// Routes contributed by one surface.
pub type Routes = Vec<(&'static str, MethodRouter)>;

/// Collaborators available to route handlers.
#[derive(Clone)]
pub struct ApiDeps {
    /// Shared controller transport.
    pub transport: Arc<TransportClient>,
    /// Cluster client handle.
    pub cluster: Arc<dyn ClusterClient>,
    /// Chart renderer handle.
    pub chart: Arc<dyn ChartRenderer>,
    /// Identity of the running agent.
    pub identity: AgentIdentity,
    /// Duties activated by the connection manager.
    pub duties: Vec<ApiId>,
}

impl fmt::Debug for ApiDeps {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiDeps")
            .field("controller", &self.transport.base_url().as_str())
            .field("identity", &self.identity)
            .field("duties", &self.duties)
            .finish_non_exhaustive()
    }
}

/// A group of routes served by the control surface.
pub trait ApiSurface: Send + Sync {
    /// Name used in logs and registration errors.
    fn name(&self) -> &'static str;

    /// Builds the surface's routes from the collaborators.
    fn routes(&self, deps: &ApiDeps) -> Result<Routes, ApiRegistrationError>;
}

/// Ordered set of surfaces mounted on the control surface.
#[derive(Default)]
pub struct ApiRegistry {
    surfaces: Vec<Box<dyn ApiSurface>>,
}

impl ApiRegistry {
    /// Creates a registry with no surfaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry mounting only [`AgentSurface`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new().with_surface(AgentSurface)
    }

    /// Appends a surface.
    #[must_use]
    pub fn with_surface(mut self, surface: impl ApiSurface + 'static) -> Self {
        self.surfaces.push(Box::new(surface));
        self
    }

    /// Builds the router from every surface, in insertion order.
    pub fn register(&self, deps: &ApiDeps) -> Result<Router, ApiRegistrationError> {
        let mut claimed = BTreeSet::new();
        let mut router = Router::new();
        for surface in &self.surfaces {
            for (path, method) in surface.routes(deps)? {
                if !claimed.insert(path) {
                    return Err(ApiRegistrationError::DuplicateRoute {
                        path: path.to_owned(),
                        surface: surface.name(),
                    });
                }
                debug!(target: API_TARGET, surface = surface.name(), path, "route registered");
                router = router.route(path, method);
            }
        }
        Ok(router)
    }
}

impl fmt::Debug for ApiRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.surfaces.iter().map(|surface| surface.name()).collect();
        formatter
            .debug_struct("ApiRegistry")
            .field("surfaces", &names)
            .finish()
    }
}

/// Built-in surface: `GET /healthz` and `GET /v1/agent`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgentSurface;

/// Body of `GET /v1/agent`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    /// Agent identity.
    #[serde(flatten)]
    pub identity: AgentIdentity,
    /// Controller base URL.
    pub controller: String,
    /// Whether the agent runs inside a cluster.
    pub in_cluster: bool,
    /// Pod namespace, when known.
    pub namespace: Option<String>,
    /// Chart release managed by the agent.
    pub chart: ChartRelease,
    /// Active duties.
    pub duties: Vec<String>,
}

impl ApiSurface for AgentSurface {
    fn name(&self) -> &'static str {
        "agent"
    }

    fn routes(&self, deps: &ApiDeps) -> Result<Routes, ApiRegistrationError> {
        let chart = deps
            .chart
            .release()
            .map_err(|source| ApiRegistrationError::Chart {
                surface: self.name(),
                source,
            })?;
        let cluster = Arc::clone(&deps.cluster);
        let identity = deps.identity.clone();
        let controller = deps.transport.base_url().to_string();
        let duties: Vec<String> = deps.duties.iter().map(ToString::to_string).collect();

        let status = get(move || {
            let status = AgentStatus {
                identity: identity.clone(),
                controller: controller.clone(),
                in_cluster: cluster.in_cluster(),
                namespace: cluster.namespace(),
                chart: chart.clone(),
                duties: duties.clone(),
            };
            async move { Json(status) }
        });
        Ok(vec![("/healthz", get(|| async { "ok" })), ("/v1/agent", status)])
    }
}
