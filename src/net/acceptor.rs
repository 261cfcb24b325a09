//! TLS acceptor that records the client certificate outcome.
//!
//! Wraps `axum-server`'s rustls acceptor and tags every request served on
//! the connection with a [`ClientIdentity`] extension.

use std::io;
use std::sync::Arc;

use axum::{middleware::AddExtension, Extension};
use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tower::Layer;

use crate::net::tls::LenientClientVerifier;

/// Whether the peer presented a certificate the CA signed.
///
/// Plaintext connections carry no extension at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientIdentity {
    pub authorized: bool,
}

/// Rustls acceptor adding [`ClientIdentity`] to each connection's requests.
#[derive(Debug, Clone)]
pub struct ClientCertAcceptor {
    inner: RustlsAcceptor,
    verifier: Option<Arc<LenientClientVerifier>>,
}

impl ClientCertAcceptor {
    /// Without a verifier every connection is unauthorized.
    pub fn new(config: RustlsConfig, verifier: Option<Arc<LenientClientVerifier>>) -> Self {
        Self {
            inner: RustlsAcceptor::new(config),
            verifier,
        }
    }
}

impl<I, S> Accept<I, S> for ClientCertAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, ClientIdentity>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let acceptor = self.inner.clone();
        let verifier = self.verifier.clone();

        Box::pin(async move {
            let (stream, service) = acceptor.accept(stream, service).await?;
            let peer = stream.get_ref().1.peer_certificates();
            let authorized = match (&verifier, peer) {
                (Some(verifier), Some(chain)) => verifier.is_trusted(chain),
                _ => false,
            };
            tracing::trace!(authorized, "TLS handshake completed");
            let service = Extension(ClientIdentity { authorized }).layer(service);
            Ok((stream, service))
        })
    }
}
