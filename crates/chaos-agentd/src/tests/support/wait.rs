use std::thread;
use std::time::{Duration, Instant};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` on the async runtime until it holds.
///
/// # Panics
///
/// Panics when the condition does not hold within [`WAIT_TIMEOUT`].
pub async fn eventually(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        assert!(
            Instant::now() < deadline,
            "condition not met within {WAIT_TIMEOUT:?}"
        );
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Blocking variant of [`eventually`] for synchronous step functions.
pub fn wait_until(condition: impl Fn() -> bool) -> Result<(), String> {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        if Instant::now() >= deadline {
            return Err(format!("condition not met within {WAIT_TIMEOUT:?}"));
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}
