//! Shared HTTP client used by every controller-facing duty.

use std::fs;

use reqwest::{Certificate, Client};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use chaos_config::TransportConfig;

use super::{ApiId, TRANSPORT_TARGET, TransportError, TransportInitError};

/// Client for the controller API.
///
/// Configuration is fixed at construction. The type is `Send + Sync` and is
/// shared through `Arc`; concurrent calls from independent duty loops need no
/// external synchronisation because the inner `reqwest::Client` pools
/// connections internally.
#[derive(Debug, Clone)]
pub struct TransportClient {
    http: Client,
    base_url: Url,
}

impl TransportClient {
    /// Builds the client from transport settings.
    ///
    /// Fails when the controller URL is malformed or not HTTP(S), when the
    /// optional CA bundle cannot be loaded, or when the TLS backend refuses
    /// the resulting configuration.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportInitError> {
        let base_url = parse_base_url(config.controller_url())?;

        let mut builder = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent());
        if let Some(path) = config.ca_bundle() {
            let pem = fs::read(path.as_std_path()).map_err(|source| {
                TransportInitError::CaBundleRead {
                    path: path.to_string(),
                    source,
                }
            })?;
            let certificate =
                Certificate::from_pem(&pem).map_err(|source| TransportInitError::CaBundleParse {
                    path: path.to_string(),
                    source,
                })?;
            builder = builder.add_root_certificate(certificate);
        }
        let http = builder
            .build()
            .map_err(|source| TransportInitError::Client { source })?;

        info!(
            target: TRANSPORT_TARGET,
            controller = %base_url,
            timeout_ms = config.request_timeout().as_millis(),
            "transport client ready"
        );
        Ok(Self { http, base_url })
    }

    /// Base URL every route is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends `body` to the controller route registered for `api`.
    pub async fn invoke<T>(&self, api: ApiId, body: &T) -> Result<(), TransportError>
    where
        T: Serialize + ?Sized,
    {
        self.post_json(api.route(), body).await
    }

    /// POSTs `body` as JSON to `route`, relative to the base URL.
    pub async fn post_json<T>(&self, route: &str, body: &T) -> Result<(), TransportError>
    where
        T: Serialize + ?Sized,
    {
        let url = self
            .base_url
            .join(route)
            .map_err(|source| TransportError::Route {
                route: route.to_owned(),
                source,
            })?;
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                route: route.to_owned(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                route: route.to_owned(),
                status: status.as_u16(),
            });
        }
        debug!(
            target: TRANSPORT_TARGET,
            route,
            status = status.as_u16(),
            "controller call succeeded"
        );
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, TransportInitError> {
    let mut url = Url::parse(raw).map_err(|source| TransportInitError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(TransportInitError::UnsupportedScheme {
                scheme: other.to_owned(),
            });
        }
    }
    // Routes are joined relative to the base, so a path prefix must end in a
    // slash to be preserved.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
