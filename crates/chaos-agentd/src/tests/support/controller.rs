//! In-process controller double served by `axum`.
//!
//! Every POST is recorded by path (without the leading slash) and answered
//! with `200 OK`, unless a rejection was queued for that path, in which case
//! it answers `503 Service Unavailable`.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use chaos_config::TransportConfig;

use crate::transport::TransportClient;

#[derive(Debug, Clone, Default)]
struct ControllerState {
    calls: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    rejections: Arc<Mutex<HashMap<String, usize>>>,
}

/// Running fake controller.
#[derive(Debug)]
pub struct FakeController {
    addr: SocketAddr,
    state: ControllerState,
    server: JoinHandle<()>,
}

impl FakeController {
    /// Binds an ephemeral loopback port and starts serving on the current
    /// runtime.
    pub async fn start() -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind fake controller");
        let addr = listener.local_addr().expect("fake controller address");
        let state = ControllerState::default();
        let app = Router::new().fallback(record).with_state(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("fake controller stopped");
        });
        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the controller.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Transport client aimed at this controller.
    #[must_use]
    pub fn transport(&self) -> Arc<TransportClient> {
        let config = TransportConfig::new(self.url(), Duration::from_secs(2));
        Arc::new(TransportClient::new(&config).expect("transport for fake controller"))
    }

    /// Answers the next `count` calls to `route` with 503.
    pub fn reject_next(&self, route: &str, count: usize) {
        self.state
            .rejections
            .lock()
            .expect("rejections mutex poisoned")
            .insert(route.to_owned(), count);
    }

    /// Bodies received on `route`, in arrival order.
    #[must_use]
    pub fn calls(&self, route: &str) -> Vec<Value> {
        self.state
            .calls
            .lock()
            .expect("calls mutex poisoned")
            .get(route)
            .cloned()
            .unwrap_or_default()
    }

    /// Every route that received at least one call.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<_> = self
            .state
            .calls
            .lock()
            .expect("calls mutex poisoned")
            .keys()
            .cloned()
            .collect();
        routes.sort();
        routes
    }
}

impl Drop for FakeController {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn record(
    State(state): State<ControllerState>,
    uri: Uri,
    Json(body): Json<Value>,
) -> StatusCode {
    let route = uri.path().trim_start_matches('/').to_owned();
    state
        .calls
        .lock()
        .expect("calls mutex poisoned")
        .entry(route.clone())
        .or_default()
        .push(body);

    let mut rejections = state.rejections.lock().expect("rejections mutex poisoned");
    match rejections.get_mut(&route) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::OK,
    }
}
