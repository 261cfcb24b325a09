//! Type-erased middleware handlers.
//!
//! A [`Middleware`] receives the request and the rest of the pipeline as
//! [`Next`]. It either answers directly or calls `next.run(request)` and
//! optionally post-processes the response.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::Request,
    http,
    middleware::Next,
    response::Response,
    BoxError,
};
use futures_util::future::BoxFuture;
use tower::{Layer, Service, ServiceExt};

/// Shared middleware handler.
pub type Middleware = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async function into a [`Middleware`].
pub fn middleware_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |request: Request, next: Next| -> BoxFuture<'static, Response> {
        Box::pin(f(request, next))
    })
}

/// Adapt a tower layer (e.g. from `tower-http`) into a [`Middleware`].
///
/// The layer wraps the remainder of the pipeline on every request.
pub fn from_layer<L, B>(layer: L) -> Middleware
where
    L: Layer<Next> + Send + Sync + 'static,
    L::Service: Service<Request, Response = http::Response<B>, Error = Infallible> + Send + 'static,
    <L::Service as Service<Request>>::Future: Send + 'static,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    Arc::new(move |request: Request, next: Next| -> BoxFuture<'static, Response> {
        let service = layer.layer(next);
        Box::pin(async move {
            match service.oneshot(request).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            }
        })
    })
}
