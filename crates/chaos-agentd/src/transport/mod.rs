//! Controller-facing transport.
//!
//! A single [`TransportClient`] is built once during startup and shared by
//! every protocol handler. The client wraps a pooled `reqwest::Client`, so it
//! may be used concurrently by any number of callers without external
//! locking. Retries are the caller's concern; the transport never retries.

mod api;
mod client;
mod errors;

pub use self::api::{ApiId, CLOSE_ROUTE};
pub use self::client::TransportClient;
pub use self::errors::{TransportError, TransportInitError};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
