use std::sync::Arc;

use tracing::info;

use super::CONN_TARGET;
use super::envelope::{CloseBody, Envelope};
use crate::transport::{CLOSE_ROUTE, TransportClient, TransportError};

/// Tells the controller the agent is going away.
///
/// Used once, after the duty loops have stopped. It is not registered with
/// the connection manager.
#[derive(Debug, Clone)]
pub struct CloseHandler {
    transport: Arc<TransportClient>,
    agent_id: String,
}

impl CloseHandler {
    /// Builds the handler around the shared transport.
    #[must_use]
    pub fn new(transport: Arc<TransportClient>, agent_id: impl Into<String>) -> Self {
        Self {
            transport,
            agent_id: agent_id.into(),
        }
    }

    /// Sends the close notification carrying `reason`.
    pub async fn notify(&self, reason: &str) -> Result<(), TransportError> {
        let body = Envelope::new(&self.agent_id, CloseBody { reason });
        self.transport.post_json(CLOSE_ROUTE, &body).await?;
        info!(target: CONN_TARGET, reason, "controller notified of shutdown");
        Ok(())
    }
}
