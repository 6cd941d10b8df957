use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chaos_config::HeartbeatConfig;

use super::envelope::{Envelope, HeartbeatBody};
use super::{CONN_TARGET, DutyError, MIN_INTERVAL, ProtocolHandler};
use crate::transport::{ApiId, TransportClient};

/// Periodic liveness signal sent to the controller.
///
/// Failed beats are logged with a running count of consecutive failures and
/// the loop carries on. The duty ends only when cancelled.
#[derive(Debug)]
pub struct HeartbeatHandler {
    transport: Arc<TransportClient>,
    agent_id: String,
    config: HeartbeatConfig,
}

impl HeartbeatHandler {
    /// Builds the handler around the shared transport.
    #[must_use]
    pub fn new(
        transport: Arc<TransportClient>,
        agent_id: impl Into<String>,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            transport,
            agent_id: agent_id.into(),
            config,
        }
    }
}

#[async_trait]
impl ProtocolHandler for HeartbeatHandler {
    fn duty(&self) -> &'static str {
        "heartbeat"
    }

    async fn activate(&self, cancel: CancellationToken) -> Result<(), DutyError> {
        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sequence: u64 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            sequence += 1;
            let body = Envelope::new(&self.agent_id, HeartbeatBody { sequence });
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = self.transport.invoke(ApiId::Heartbeat, &body) => result,
            };
            match result {
                Ok(()) => {
                    if consecutive_failures > 0 {
                        debug!(
                            target: CONN_TARGET,
                            sequence,
                            recovered_after = consecutive_failures,
                            "heartbeat recovered"
                        );
                    }
                    consecutive_failures = 0;
                }
                Err(error) => {
                    consecutive_failures += 1;
                    warn!(
                        target: CONN_TARGET,
                        sequence,
                        consecutive_failures,
                        error = %error,
                        "heartbeat failed"
                    );
                }
            }
        }
        debug!(target: CONN_TARGET, beats = sequence, "heartbeat stopped");
        Ok(())
    }
}
