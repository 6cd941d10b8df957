//! Configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use chaos_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader pointing the agent at a temporary liveness marker, an ephemeral
/// listen port, and the given controller.
#[derive(Clone)]
pub struct TestConfigLoader {
    _runtime_dir: Arc<TempDir>,
    overrides: Arc<Mutex<Config>>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new(controller_url: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temporary runtime directory");
        let liveness = dir
            .path()
            .join("chaos.pid")
            .try_into()
            .expect("temporary liveness path was not valid UTF-8");
        let config = Config {
            controller_url: controller_url.to_owned(),
            request_timeout_ms: 2_000,
            heartbeat_interval_secs: 1,
            metric_interval_secs: 1,
            port: 0,
            liveness_path: liveness,
            ..Config::default()
        };
        Self {
            _runtime_dir: Arc::new(dir),
            overrides: Arc::new(Mutex::new(config)),
        }
    }

    /// Path of the liveness marker the agent will write.
    #[must_use]
    pub fn liveness_path(&self) -> PathBuf {
        self.current().liveness_path.into_std_path_buf()
    }

    /// Applies `change` to the configuration handed to the agent.
    pub fn update(&self, change: impl FnOnce(&mut Config)) {
        change(&mut self.overrides.lock().expect("config mutex poisoned"));
    }

    fn current(&self) -> Config {
        self.overrides
            .lock()
            .expect("config mutex poisoned")
            .clone()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.current())
    }
}

/// Loader that intentionally fails by passing an unparsable port.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("chaos-agentd"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

