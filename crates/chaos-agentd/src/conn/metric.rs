use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chaos_config::MetricConfig;

use super::envelope::{Envelope, MetricBody};
use super::{CONN_TARGET, DutyError, MIN_INTERVAL, ProtocolHandler};
use crate::collaborators::MetricRegistry;
use crate::transport::{ApiId, TransportClient};

/// Periodic push of registry samples to the controller.
#[derive(Debug)]
pub struct MetricHandler {
    transport: Arc<TransportClient>,
    registry: Arc<MetricRegistry>,
    agent_id: String,
    config: MetricConfig,
}

impl MetricHandler {
    /// Builds the handler around the shared transport and metric registry.
    #[must_use]
    pub fn new(
        transport: Arc<TransportClient>,
        registry: Arc<MetricRegistry>,
        agent_id: impl Into<String>,
        config: MetricConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            agent_id: agent_id.into(),
            config,
        }
    }
}

#[async_trait]
impl ProtocolHandler for MetricHandler {
    fn duty(&self) -> &'static str {
        "metric-report"
    }

    async fn activate(&self, cancel: CancellationToken) -> Result<(), DutyError> {
        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reports: u64 = 0;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let samples = self.registry.collect();
            if samples.is_empty() {
                debug!(target: CONN_TARGET, "no metric sources; skipping report");
                continue;
            }
            let body = Envelope::new(&self.agent_id, MetricBody { samples: &samples });
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = self.transport.invoke(ApiId::MetricReport, &body) => result,
            };
            match result {
                Ok(()) => reports += 1,
                Err(error) => warn!(
                    target: CONN_TARGET,
                    samples = samples.len(),
                    error = %error,
                    "metric report failed"
                ),
            }
        }
        debug!(target: CONN_TARGET, reports, "metric reporting stopped");
        Ok(())
    }
}
