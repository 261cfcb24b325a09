//! Error types for the webserver.
//!
//! Configuration errors live in [`crate::config::loader`].

use thiserror::Error;

use crate::pipeline::path::InvalidPattern;

/// Errors raised while mounting descriptors on an application.
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("middleware '{name}' has an invalid path filter: {source}")]
    InvalidPath {
        name: String,
        #[source]
        source: InvalidPattern,
    },
}

/// Errors building the TLS server configuration from resolved material.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to parse PEM {what}: {source}")]
    Pem {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("no {0} found in PEM material")]
    Missing(&'static str),

    #[error("invalid CA bundle: {0}")]
    Verifier(String),

    #[error("rustls rejected the certificate/key pair: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Errors surfaced by `start`/`stop`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Weave(#[from] WeaveError),

    #[error("server terminated with an error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("server task failed: {0}")]
    Task(String),

    #[error("server has been closed and cannot be restarted")]
    Closed,
}
