//! Redirect for requests nothing else answered.

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::pipeline::{middleware_fn, Middleware};

/// Answer with `302 Found` pointing at `location`.
pub fn default_redirect(location: HeaderValue) -> Middleware {
    middleware_fn(move |_request: Request, _next: Next| {
        let response: Response =
            (StatusCode::FOUND, [(header::LOCATION, location.clone())]).into_response();
        async move { response }
    })
}
