use std::fmt;

/// Controller route used by the close notification at shutdown.
pub const CLOSE_ROUTE: &str = "api/agent/close";

/// Identifiers of the controller-facing duties registered with the
/// connection manager.
///
/// The set is closed: these are registry keys, not HTTP routes served by the
/// agent, although each one maps onto the controller route its handler calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiId {
    /// One-shot registration of the agent with the controller.
    Registration,
    /// Periodic liveness signal.
    Heartbeat,
    /// Periodic metric push.
    MetricReport,
}

impl ApiId {
    /// Every identifier, in activation order.
    pub const ALL: [Self; 3] = [Self::Registration, Self::Heartbeat, Self::MetricReport];

    /// Controller route, relative to the configured base URL.
    #[must_use]
    pub const fn route(self) -> &'static str {
        match self {
            Self::Registration => "api/agent/register",
            Self::Heartbeat => "api/agent/heartbeat",
            Self::MetricReport => "api/agent/metrics",
        }
    }
}

impl fmt::Display for ApiId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registration => "registration",
            Self::Heartbeat => "heartbeat",
            Self::MetricReport => "metric-report",
        };
        formatter.write_str(label)
    }
}
