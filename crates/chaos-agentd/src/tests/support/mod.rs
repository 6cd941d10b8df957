//! Test harness utilities shared by unit tests and the lifecycle suite.

mod config_loader;
mod controller;
mod logs;
mod process;
mod reporter;
mod wait;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use controller::FakeController;
pub use logs::LogCapture;
pub use process::{ExitCall, RecordingExit, TestShutdownSignal};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use wait::{eventually, wait_until};
pub use world::{AgentWorld, PANIC_ROUTE, StepResult};
