//! Shared configuration for the chaos agent.
//!
//! Settings are layered by [`ortho_config`]: built-in defaults, then an
//! optional configuration file (`--config-path` or `CHAOS_AGENT_CONFIG_PATH`),
//! then `CHAOS_AGENT_*` environment variables, then command-line flags. The
//! resolved [`Config`] is an explicit value that the agent threads through
//! every constructor; nothing reads configuration from process-wide state.

mod defaults;
mod duties;
mod logging;
mod runtime;

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_AGENT_ID, DEFAULT_CHART_NAMESPACE, DEFAULT_CHART_RELEASE, DEFAULT_CONTROLLER_URL,
    DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_LIVENESS_PATH, DEFAULT_LOG_FILTER,
    DEFAULT_METRIC_INTERVAL_SECS, DEFAULT_PORT, DEFAULT_REGISTRATION_ATTEMPTS,
    DEFAULT_REQUEST_TIMEOUT_MS, default_agent_id, default_chart_namespace, default_chart_release,
    default_controller_url, default_heartbeat_interval_secs, default_liveness_path,
    default_log_filter, default_log_filter_string, default_log_format,
    default_metric_interval_secs, default_port, default_registration_attempts,
    default_request_timeout_ms,
};
pub use duties::{ChartConfig, HeartbeatConfig, MetricConfig, RegistrationConfig, TransportConfig};
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
pub use runtime::{RuntimePaths, RuntimePathsError};

/// Pause between registration attempts.
const REGISTRATION_BACKOFF: Duration = Duration::from_secs(2);

/// Resolved agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CHAOS_AGENT")]
pub struct Config {
    /// `EnvFilter` expression for structured logging.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for structured logging.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Identifier reported to the controller.
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    /// Base URL of the controller.
    #[serde(default = "default_controller_url")]
    pub controller_url: String,
    /// Per-request timeout of the transport client, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Optional PEM bundle of additional trusted root certificates.
    #[serde(default)]
    pub ca_bundle: Option<Utf8PathBuf>,
    /// Seconds between heartbeats.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Seconds between metric reports.
    #[serde(default = "default_metric_interval_secs")]
    pub metric_interval_secs: u64,
    /// Registration attempts before the registration duty gives up.
    #[serde(default = "default_registration_attempts")]
    pub registration_attempts: u32,
    /// TCP port the HTTP control surface listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Location of the liveness marker.
    #[serde(default = "default_liveness_path")]
    pub liveness_path: Utf8PathBuf,
    /// Release name of the chart served by the HTTP surface.
    #[serde(default = "default_chart_release")]
    pub chart_release: String,
    /// Namespace of the chart served by the HTTP surface.
    #[serde(default = "default_chart_namespace")]
    pub chart_namespace: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            agent_id: default_agent_id(),
            controller_url: default_controller_url(),
            request_timeout_ms: default_request_timeout_ms(),
            ca_bundle: None,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            metric_interval_secs: default_metric_interval_secs(),
            registration_attempts: default_registration_attempts(),
            port: default_port(),
            liveness_path: default_liveness_path(),
            chart_release: default_chart_release(),
            chart_namespace: default_chart_namespace(),
        }
    }
}

impl Config {
    /// Checks constraints that layered loading cannot express.
    ///
    /// Duty intervals must be at least one second.
    ///
    /// # Errors
    ///
    /// Returns [`OrthoError::Validation`] naming the offending key.
    pub fn validated(self) -> Result<Self, Arc<OrthoError>> {
        let intervals = [
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("metric_interval_secs", self.metric_interval_secs),
        ];
        for (key, secs) in intervals {
            if secs == 0 {
                return Err(Arc::new(OrthoError::Validation {
                    key: key.to_owned(),
                    message: "must be at least 1 second".to_owned(),
                }));
            }
        }
        Ok(self)
    }

    /// Logging filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Logging output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Identifier reported to the controller.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        self.agent_id.as_str()
    }

    /// Listen port for the HTTP control surface.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Logging settings view.
    #[must_use]
    pub fn log_settings(&self) -> LogSettings {
        LogSettings::new(self.log_filter.clone(), self.log_format)
    }

    /// Transport client settings view.
    #[must_use]
    pub fn transport(&self) -> TransportConfig {
        let transport = TransportConfig::new(
            self.controller_url.clone(),
            Duration::from_millis(self.request_timeout_ms),
        );
        match &self.ca_bundle {
            Some(path) => transport.with_ca_bundle(path.clone()),
            None => transport,
        }
    }

    /// Registration duty settings view.
    #[must_use]
    pub const fn registration(&self) -> RegistrationConfig {
        RegistrationConfig {
            attempts: self.registration_attempts,
            backoff: REGISTRATION_BACKOFF,
        }
    }

    /// Heartbeat duty settings view.
    #[must_use]
    pub const fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_secs(self.heartbeat_interval_secs),
        }
    }

    /// Metric-report duty settings view.
    #[must_use]
    pub const fn metric(&self) -> MetricConfig {
        MetricConfig {
            interval: Duration::from_secs(self.metric_interval_secs),
        }
    }

    /// Chart identity view.
    #[must_use]
    pub fn chart(&self) -> ChartConfig {
        ChartConfig {
            release: self.chart_release.clone(),
            namespace: self.chart_namespace.clone(),
        }
    }

    /// Runtime artefact paths view.
    #[must_use]
    pub fn runtime_paths(&self) -> RuntimePaths {
        RuntimePaths::from_config(self)
    }
}
