//! Security response headers.
//!
//! Each header is only set when the handler did not choose its own value.

use axum::http::{header, HeaderName, HeaderValue};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, set_header::SetResponseHeaderLayer};

use crate::pipeline::{from_layer, Middleware};

/// Headers applied by [`security_headers`].
pub const SECURITY_HEADERS: [(HeaderName, &str); 7] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::X_DNS_PREFETCH_CONTROL, "off"),
    (header::STRICT_TRANSPORT_SECURITY, "max-age=15552000; includeSubDomains"),
    (header::X_XSS_PROTECTION, "0"),
    (header::REFERRER_POLICY, "no-referrer"),
    (HeaderName::from_static("x-download-options"), "noopen"),
];

fn if_absent(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

/// Hardened security headers as one middleware.
pub fn security_headers() -> Middleware {
    let [a, b, c, d, e, f, g] = SECURITY_HEADERS;
    from_layer(
        ServiceBuilder::new()
            .layer(if_absent(a.0, a.1))
            .layer(if_absent(b.0, b.1))
            .layer(if_absent(c.0, c.1))
            .layer(if_absent(d.0, d.1))
            .layer(if_absent(e.0, e.1))
            .layer(if_absent(f.0, f.1))
            .layer(if_absent(g.0, g.1)),
    )
}

/// Response compression negotiated from `Accept-Encoding`.
pub fn compression() -> Middleware {
    from_layer(CompressionLayer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::app::RouterApp;
    use crate::pipeline::Application;
    use axum::{body::Body, extract::Request, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn headers_are_added_without_overriding_handlers() {
        let routes = Router::new().route(
            "/",
            get(|| async { ([(header::X_FRAME_OPTIONS, "DENY")], "hi") }),
        );
        let mut app = RouterApp::with_routes(routes);
        app.mount("helmet", None, security_headers()).unwrap();

        let response = app
            .into_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()["x-download-options"], "noopen");
    }

    #[tokio::test]
    async fn compression_honours_accept_encoding() {
        let body = "x".repeat(4096);
        let routes = Router::new().route(
            "/",
            get(move || {
                let body = body.clone();
                async move { body }
            }),
        );
        let mut app = RouterApp::with_routes(routes);
        app.mount("compression", None, compression()).unwrap();

        let response = app
            .into_router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ACCEPT_ENCODING, "gzip")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    }
}
