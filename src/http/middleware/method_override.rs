//! HTTP method override for clients limited to GET/POST.

use axum::{
    extract::Request,
    http::{HeaderName, Method},
    middleware::Next,
};

use crate::pipeline::{middleware_fn, Middleware};

pub const X_HTTP_METHOD_OVERRIDE: HeaderName = HeaderName::from_static("x-http-method-override");

/// Method requested by the override header, if the request may be overridden.
fn override_for(request: &Request) -> Option<Method> {
    if request.method() != Method::POST {
        return None;
    }
    let value = request.headers().get(&X_HTTP_METHOD_OVERRIDE)?.to_str().ok()?;
    Method::from_bytes(value.trim().to_ascii_uppercase().as_bytes()).ok()
}

/// Rewrite POST requests carrying `X-HTTP-Method-Override`.
pub fn method_override() -> Middleware {
    middleware_fn(|mut request: Request, next: Next| async move {
        if let Some(method) = override_for(&request) {
            tracing::trace!(from = %request.method(), to = %method, "Method overridden");
            *request.method_mut() = method;
        }
        next.run(request).await
    })
}
