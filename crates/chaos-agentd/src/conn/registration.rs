use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chaos_config::RegistrationConfig;

use super::envelope::{AgentIdentity, Envelope, RegistrationBody};
use super::{CONN_TARGET, DutyError, ProtocolHandler};
use crate::transport::{ApiId, TransportClient};

/// One-shot registration of the agent with the controller.
///
/// Failed attempts are retried after a fixed backoff until the configured
/// attempt budget runs out. Cancellation ends the duty quietly.
#[derive(Debug)]
pub struct RegistrationHandler {
    transport: Arc<TransportClient>,
    identity: AgentIdentity,
    config: RegistrationConfig,
}

impl RegistrationHandler {
    /// Builds the handler around the shared transport.
    #[must_use]
    pub fn new(
        transport: Arc<TransportClient>,
        identity: AgentIdentity,
        config: RegistrationConfig,
    ) -> Self {
        Self {
            transport,
            identity,
            config,
        }
    }
}

#[async_trait]
impl ProtocolHandler for RegistrationHandler {
    fn duty(&self) -> &'static str {
        "registration"
    }

    async fn activate(&self, cancel: CancellationToken) -> Result<(), DutyError> {
        let attempts = self.config.attempts.max(1);
        let body = Envelope::new(
            &self.identity.agent_id,
            RegistrationBody {
                version: &self.identity.version,
                pid: self.identity.pid,
                port: self.identity.port,
            },
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                result = self.transport.invoke(ApiId::Registration, &body) => result,
            };
            let error = match result {
                Ok(()) => {
                    info!(target: CONN_TARGET, attempt, "agent registered with controller");
                    return Ok(());
                }
                Err(error) => error,
            };
            if attempt >= attempts {
                return Err(DutyError::Exhausted {
                    attempts,
                    source: error,
                });
            }
            warn!(
                target: CONN_TARGET,
                attempt,
                attempts,
                error = %error,
                "registration attempt failed; retrying"
            );
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(self.config.backoff) => {}
            }
        }
    }
}
