//! `Cache-Control` for matching paths.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
};

use crate::pipeline::{middleware_fn, Middleware};

fn header_value(max_age: u64) -> HeaderValue {
    HeaderValue::try_from(format!("public, max-age={}", max_age))
        .unwrap_or_else(|_| HeaderValue::from_static("public"))
}

/// Set `Cache-Control: public, max-age=<max_age>` unless the handler chose one.
pub fn cache_control(max_age: u64) -> Middleware {
    let value = header_value(max_age);
    middleware_fn(move |request: Request, next: Next| {
        let value = value.clone();
        async move {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .entry(header::CACHE_CONTROL)
                .or_insert(value);
            response
        }
    })
}
