//! `X-Powered-By` handling.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
};

use crate::pipeline::{middleware_fn, Middleware};

pub const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Stamp every response with `X-Powered-By: value`.
pub fn set_powered_by(value: HeaderValue) -> Middleware {
    middleware_fn(move |request: Request, next: Next| {
        let value = value.clone();
        async move {
            let mut response = next.run(request).await;
            response.headers_mut().insert(X_POWERED_BY, value);
            response
        }
    })
}

/// Strip `X-Powered-By` from every response.
pub fn hide_powered_by() -> Middleware {
    middleware_fn(|request: Request, next: Next| async move {
        let mut response = next.run(request).await;
        response.headers_mut().remove(X_POWERED_BY);
        response
    })
}
