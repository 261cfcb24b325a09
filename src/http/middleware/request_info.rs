//! Request detail logging at the front of the pipeline.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
};

use crate::pipeline::{middleware_fn, Middleware};

fn header_str<'a>(request: &'a Request, name: header::HeaderName) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
}

pub fn print_request_info() -> Middleware {
    middleware_fn(|request: Request, next: Next| async move {
        tracing::debug!(
            method = %request.method(),
            host = header_str(&request, header::HOST),
            path = request.uri().path(),
            url = %request.uri(),
            version = ?request.version(),
            user_agent = header_str(&request, header::USER_AGENT),
            "Webserver received a request"
        );
        next.run(request).await
    })
}
