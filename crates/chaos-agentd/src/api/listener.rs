//! HTTP listener for the local control surface.
//!
//! Binding happens synchronously with startup so a taken port is a startup
//! failure. Serving then runs as a supervised task. A panic in any request
//! handler is caught by a middleware layer, which stops the listener; the
//! task reports [`ListenRuntimeFault::RequestPanicked`] and the rest of the
//! agent keeps running.

use std::net::{Ipv4Addr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{API_TARGET, ListenRuntimeFault, ListenSetupError};
use crate::supervisor::{Supervisor, panic_message};

/// Supervisor task name of the listener.
pub const LISTENER_TASK: &str = "http-listener";

/// Bound, not yet serving, HTTP listener.
#[derive(Debug)]
pub struct HttpListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HttpListener {
    /// Binds `0.0.0.0:port`. Port zero picks an ephemeral port.
    pub async fn bind(port: u16) -> Result<Self, ListenSetupError> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenSetupError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenSetupError::LocalAddr { source })?;
        info!(target: API_TARGET, addr = %local_addr, "HTTP listener bound");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address actually bound.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves `router` as a supervised task until shutdown or a handler panic.
    pub fn launch(self, router: Router, supervisor: &mut Supervisor) {
        let shutdown = supervisor.cancellation();
        let latch = Arc::new(FaultLatch::default());
        let app = router.layer(middleware::from_fn_with_state(
            Arc::clone(&latch),
            catch_panics,
        ));
        info!(target: API_TARGET, addr = %self.local_addr, "HTTP listener serving");
        supervisor.spawn(LISTENER_TASK, serve(self.listener, app, shutdown, latch));
    }
}

async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    latch: Arc<FaultLatch>,
) -> Result<(), ListenRuntimeFault> {
    let tripped = latch.token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tripped.cancelled() => {}
            }
        })
        .await
        .map_err(|source| ListenRuntimeFault::Serve { source })?;
    match latch.take() {
        Some(message) => Err(ListenRuntimeFault::RequestPanicked { message }),
        None => Ok(()),
    }
}

/// First handler panic seen by the listener.
#[derive(Debug, Default)]
struct FaultLatch {
    token: CancellationToken,
    message: Mutex<Option<String>>,
}

impl FaultLatch {
    fn trip(&self, message: String) {
        let mut slot = self.message.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(message);
        }
        drop(slot);
        self.token.cancel();
    }

    fn take(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

async fn catch_panics(
    State(latch): State<Arc<FaultLatch>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                target: API_TARGET,
                path = %path,
                panic = %message,
                "request handler panicked; stopping HTTP listener"
            );
            latch.trip(message);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
