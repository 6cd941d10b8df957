//! Typed views over the flat configuration consumed by the agent's
//! controller-facing duties.
//!
//! The loader keeps every setting as a primitive so it can be overridden from
//! files, the environment, or the command line. The agent never reads those
//! raw fields directly; it asks [`crate::Config`] for one of these views and
//! hands it to the component that needs it.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

/// Settings for the shared transport client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    controller_url: String,
    request_timeout: Duration,
    ca_bundle: Option<Utf8PathBuf>,
    user_agent: String,
}

impl TransportConfig {
    /// Builds transport settings for the given controller base URL.
    #[must_use]
    pub fn new(controller_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            controller_url: controller_url.into(),
            request_timeout,
            ca_bundle: None,
            user_agent: concat!("chaos-agent/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }

    /// Adds a PEM bundle of extra root certificates to trust.
    #[must_use]
    pub fn with_ca_bundle(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Base URL every controller route is resolved against.
    #[must_use]
    pub fn controller_url(&self) -> &str {
        self.controller_url.as_str()
    }

    /// Timeout applied to each request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Optional PEM bundle with additional trusted roots.
    #[must_use]
    pub fn ca_bundle(&self) -> Option<&Utf8Path> {
        self.ca_bundle.as_deref()
    }

    /// `User-Agent` header sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_str()
    }
}

/// Settings for the one-shot registration duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationConfig {
    /// Attempts made before the duty reports failure. Zero is treated as one.
    pub attempts: u32,
    /// Pause between consecutive attempts.
    pub backoff: Duration,
}

/// Settings for the periodic heartbeat duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Delay between heartbeats.
    pub interval: Duration,
}

/// Settings for the periodic metric-report duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricConfig {
    /// Delay between metric reports.
    pub interval: Duration,
}

/// Identity of the chart rendered for the HTTP control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartConfig {
    /// Helm release name.
    pub release: String,
    /// Namespace the release is rendered into.
    pub namespace: String,
}
