//! JSON bodies sent to the controller.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use chaos_config::Config;

/// Identity the agent announces to the controller and on its HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentIdentity {
    /// Configured agent identifier.
    pub agent_id: String,
    /// Agent build version.
    pub version: String,
    /// Process id of the agent.
    pub pid: u32,
    /// Configured HTTP control port.
    pub port: u16,
}

impl AgentIdentity {
    /// Identity of the agent described by `config`, running as `pid`.
    #[must_use]
    pub fn new(config: &Config, pid: u32) -> Self {
        Self {
            agent_id: config.agent_id().to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            pid,
            port: config.port(),
        }
    }
}

/// Common wrapper around every controller payload.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a, T> {
    agent_id: &'a str,
    timestamp: u64,
    #[serde(flatten)]
    body: T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub(crate) fn new(agent_id: &'a str, body: T) -> Self {
        Self {
            agent_id,
            timestamp: unix_seconds(),
            body,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationBody<'a> {
    pub(crate) version: &'a str,
    pub(crate) pid: u32,
    pub(crate) port: u16,
}

#[derive(Debug, Serialize)]
pub(crate) struct HeartbeatBody {
    pub(crate) sequence: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct MetricBody<'a> {
    pub(crate) samples: &'a BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CloseBody<'a> {
    pub(crate) reason: &'a str,
}

fn unix_seconds() -> u64 {
    // A clock before the epoch is reported as zero rather than failing a call.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
