//! Protocol handlers and the connection manager that activates them.
//!
//! Each controller-facing duty implements [`ProtocolHandler`]. Handlers are
//! registered into a [`ConnectionManager`] during startup and activated with
//! [`ConnectionManager::start`], which consumes the manager. Once started the
//! registry no longer exists as a mutable value, so a late registration or a
//! second activation cannot be expressed.
//!
//! Registering an identifier twice keeps the last handler (last-write-wins);
//! [`ConnectionManager::register`] hands back the displaced handler.

mod close;
mod envelope;
mod heartbeat;
mod metric;
mod registration;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::supervisor::Supervisor;
use crate::transport::{ApiId, TransportError};

pub use self::close::CloseHandler;
pub use self::envelope::AgentIdentity;
pub use self::heartbeat::HeartbeatHandler;
pub use self::metric::MetricHandler;
pub use self::registration::RegistrationHandler;

const CONN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::conn");

/// Lower bound applied to periodic duty intervals.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Errors ending a duty loop.
#[derive(Debug, Error)]
pub enum DutyError {
    /// Every attempt of a one-shot duty failed.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error of the last attempt.
        #[source]
        source: TransportError,
    },
}

/// A controller-facing duty.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    /// Short name used in logs and supervisor reports.
    fn duty(&self) -> &'static str;

    /// Runs the duty until it completes or `cancel` fires.
    async fn activate(&self, cancel: CancellationToken) -> Result<(), DutyError>;
}

/// Registry of protocol handlers keyed by [`ApiId`].
#[derive(Default)]
pub struct ConnectionManager {
    handlers: HashMap<ApiId, Arc<dyn ProtocolHandler>>,
}

impl ConnectionManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `id`, returning the handler it replaced.
    pub fn register(
        &mut self,
        id: ApiId,
        handler: Arc<dyn ProtocolHandler>,
    ) -> Option<Arc<dyn ProtocolHandler>> {
        let displaced = self.handlers.insert(id, handler);
        if displaced.is_some() {
            debug!(target: CONN_TARGET, api = %id, "handler replaced");
        }
        displaced
    }

    /// Number of registered identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Launches every registered handler as a supervised task.
    ///
    /// Returns once every task is spawned; it never waits for a duty to
    /// finish. An empty registry spawns nothing.
    pub fn start(self, supervisor: &mut Supervisor) -> ActiveConnections {
        let mut handlers: Vec<_> = self.handlers.into_iter().collect();
        handlers.sort_by_key(|(id, _)| *id);

        let mut ids = Vec::with_capacity(handlers.len());
        for (id, handler) in handlers {
            let cancel = supervisor.cancellation();
            info!(
                target: CONN_TARGET,
                api = %id,
                duty = handler.duty(),
                "activating protocol handler"
            );
            supervisor.spawn(id.to_string(), async move { handler.activate(cancel).await });
            ids.push(id);
        }
        ActiveConnections { ids }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().collect();
        ids.sort();
        formatter
            .debug_struct("ConnectionManager")
            .field("handlers", &ids)
            .finish()
    }
}

/// Identifiers whose duties were launched by [`ConnectionManager::start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveConnections {
    ids: Vec<ApiId>,
}

impl ActiveConnections {
    /// Activated identifiers, in activation order.
    #[must_use]
    pub fn ids(&self) -> &[ApiId] {
        &self.ids
    }

    /// Whether nothing was activated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
