//! Client certificate gate for protected paths.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::net::ClientIdentity;
use crate::pipeline::{middleware_fn, Middleware};

/// Reject requests whose connection did not present a verified client
/// certificate. Mount it scoped to the protected paths.
pub fn client_cert_gate() -> Middleware {
    middleware_fn(|request: Request, next: Next| async move {
        let authorized = request
            .extensions()
            .get::<ClientIdentity>()
            .is_some_and(|identity| identity.authorized);
        if authorized {
            return next.run(request).await;
        }
        tracing::debug!(path = %request.uri().path(), "Client certificate required");
        (StatusCode::UNAUTHORIZED, Json(json!({ "status": "Access denied" }))).into_response()
    })
}
