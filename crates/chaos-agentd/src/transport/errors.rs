//! Error types for the controller transport.

use std::io;

use thiserror::Error;

/// Errors raised while constructing the transport client.
#[derive(Debug, Error)]
pub enum TransportInitError {
    /// The controller URL could not be parsed.
    #[error("invalid controller url '{url}': {source}")]
    InvalidUrl {
        /// Configured controller URL.
        url: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The controller URL used a scheme other than `http` or `https`.
    #[error("unsupported controller url scheme '{scheme}'")]
    UnsupportedScheme {
        /// Scheme found in the configured URL.
        scheme: String,
    },
    /// The CA bundle could not be read.
    #[error("failed to read CA bundle '{path}': {source}")]
    CaBundleRead {
        /// Configured bundle path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The CA bundle did not contain a usable certificate.
    #[error("failed to parse CA bundle '{path}': {source}")]
    CaBundleParse {
        /// Configured bundle path.
        path: String,
        /// Underlying TLS error.
        #[source]
        source: reqwest::Error,
    },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors raised by individual controller calls.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The route could not be resolved against the controller base URL.
    #[error("invalid controller route '{route}': {source}")]
    Route {
        /// Route that failed to resolve.
        route: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The request could not be sent or its response could not be read.
    #[error("request to '{route}' failed: {source}")]
    Request {
        /// Route that was called.
        route: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The controller answered with a non-success status.
    #[error("controller rejected '{route}' with status {status}")]
    Status {
        /// Route that was called.
        route: String,
        /// HTTP status code returned.
        status: u16,
    },
}
