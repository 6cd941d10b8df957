use camino::Utf8PathBuf;

/// Default TCP port for the local HTTP control surface.
pub const DEFAULT_PORT: u16 = 9526;

/// Default log filter expression used by the agent.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Path the liveness marker is written to unless overridden.
pub const DEFAULT_LIVENESS_PATH: &str = "/var/run/chaos.pid";

/// Base URL of the controller used when no override is supplied.
pub const DEFAULT_CONTROLLER_URL: &str = "http://127.0.0.1:8080";

/// Identifier the agent reports to the controller by default.
pub const DEFAULT_AGENT_ID: &str = "chaos-agent";

/// Per-request timeout applied by the transport client, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Seconds between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// Seconds between metric reports.
pub const DEFAULT_METRIC_INTERVAL_SECS: u64 = 60;

/// Registration attempts made before the registration duty gives up.
pub const DEFAULT_REGISTRATION_ATTEMPTS: u32 = 5;

/// Release name of the chaos engine chart rendered for the HTTP surface.
pub const DEFAULT_CHART_RELEASE: &str = "litmuschaos";

/// Namespace the chaos engine chart is rendered into.
pub const DEFAULT_CHART_NAMESPACE: &str = "litmus";

/// Default log filter expression used by the agent.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the agent.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default listen port for the HTTP control surface.
#[must_use]
pub const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Default liveness marker path.
#[must_use]
pub fn default_liveness_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_LIVENESS_PATH)
}

/// Default controller base URL.
#[must_use]
pub fn default_controller_url() -> String {
    DEFAULT_CONTROLLER_URL.to_owned()
}

/// Default agent identifier.
#[must_use]
pub fn default_agent_id() -> String {
    DEFAULT_AGENT_ID.to_owned()
}

/// Default transport request timeout in milliseconds.
#[must_use]
pub const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default heartbeat interval in seconds.
#[must_use]
pub const fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}

/// Default metric report interval in seconds.
#[must_use]
pub const fn default_metric_interval_secs() -> u64 {
    DEFAULT_METRIC_INTERVAL_SECS
}

/// Default number of registration attempts.
#[must_use]
pub const fn default_registration_attempts() -> u32 {
    DEFAULT_REGISTRATION_ATTEMPTS
}

/// Default chart release name.
#[must_use]
pub fn default_chart_release() -> String {
    DEFAULT_CHART_RELEASE.to_owned()
}

/// Default chart namespace.
#[must_use]
pub fn default_chart_namespace() -> String {
    DEFAULT_CHART_NAMESPACE.to_owned()
}
