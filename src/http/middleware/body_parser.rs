//! Request body parsing.
//!
//! Bodies of a matching content type are buffered (up to a limit), parsed
//! into a [`ParsedBody`] extension, then handed on unchanged so downstream
//! extractors can still read them.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::pipeline::{middleware_fn, Middleware};

/// A parsed request body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl ParsedBody {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            ParsedBody::Form(_) => None,
        }
    }

    /// First value for a form field.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match self {
            ParsedBody::Form(pairs) => pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            ParsedBody::Json(_) => None,
        }
    }
}

fn media_type(request: &Request) -> Option<String> {
    let value = request.headers().get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next()?.trim().to_ascii_lowercase();
    Some(essence)
}

fn is_json(media: &str) -> bool {
    media == "application/json" || (media.starts_with("application/") && media.ends_with("+json"))
}

fn is_urlencoded(media: &str) -> bool {
    media == "application/x-www-form-urlencoded"
}

fn declared_length(request: &Request) -> Option<usize> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn too_large(limit: usize) -> Response {
    tracing::debug!(limit, "Request body exceeds the configured limit");
    (StatusCode::PAYLOAD_TOO_LARGE, "request entity too large").into_response()
}

/// Buffer the body, failing with 413 beyond `limit`.
async fn buffer(request: Request, limit: usize) -> Result<(Request, Bytes), Response> {
    if declared_length(&request).is_some_and(|len| len > limit) {
        return Err(too_large(limit));
    }
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, limit).await.map_err(|_| too_large(limit))?;
    let request = Request::from_parts(parts, Body::from(bytes.clone()));
    Ok((request, bytes))
}

pub fn json_body_parser(limit: usize) -> Middleware {
    middleware_fn(move |request: Request, next: Next| async move {
        if !media_type(&request).is_some_and(|m| is_json(&m)) {
            return next.run(request).await;
        }
        let (mut request, bytes) = match buffer(request, limit).await {
            Ok(buffered) => buffered,
            Err(response) => return response,
        };
        if !bytes.is_empty() {
            match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(value) => {
                    request.extensions_mut().insert(ParsedBody::Json(value));
                }
                Err(error) => {
                    tracing::debug!(%error, "Rejected malformed JSON body");
                    return (StatusCode::BAD_REQUEST, "invalid JSON body").into_response();
                }
            }
        }
        next.run(request).await
    })
}

pub fn urlencoded_body_parser(limit: usize) -> Middleware {
    middleware_fn(move |request: Request, next: Next| async move {
        if !media_type(&request).is_some_and(|m| is_urlencoded(&m)) {
            return next.run(request).await;
        }
        let (mut request, bytes) = match buffer(request, limit).await {
            Ok(buffered) => buffered,
            Err(response) => return response,
        };
        let pairs = url::form_urlencoded::parse(&bytes).into_owned().collect();
        request.extensions_mut().insert(ParsedBody::Form(pairs));
        next.run(request).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::app::RouterApp;
    use crate::pipeline::Application;
    use axum::{extract::Extension, routing::post, Router};
    use tower::ServiceExt;

    fn app(limit: usize) -> Router {
        let routes = Router::new().route(
            "/echo",
            post(|parsed: Option<Extension<ParsedBody>>, body: String| async move {
                match parsed {
                    Some(Extension(ParsedBody::Json(value))) => format!("json:{}", value["name"]),
                    Some(Extension(parsed @ ParsedBody::Form(_))) => {
                        format!("form:{}", parsed.form_value("name").unwrap_or("-"))
                    }
                    None => format!("raw:{}", body),
                }
            }),
        );
        let mut app = RouterApp::with_routes(routes);
        app.mount("json", None, json_body_parser(limit)).unwrap();
        app.mount("form", None, urlencoded_body_parser(limit)).unwrap();
        app.into_router()
    }

    fn post_request(content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn json_is_parsed() {
        let response = app(1024)
            .oneshot(post_request("application/json; charset=utf-8", r#"{"name":"devebot"}"#))
            .await
            .unwrap();
        assert_eq!(text(response).await, "json:\"devebot\"");
    }

    #[tokio::test]
    async fn form_is_parsed() {
        let response = app(1024)
            .oneshot(post_request("application/x-www-form-urlencoded", "name=a+b&x=1"))
            .await
            .unwrap();
        assert_eq!(text(response).await, "form:a b");
    }

    #[tokio::test]
    async fn other_types_pass_through() {
        let response = app(1024)
            .oneshot(post_request("text/plain", "hello"))
            .await
            .unwrap();
        assert_eq!(text(response).await, "raw:hello");
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let response = app(8)
            .oneshot(post_request("application/json", r#"{"name":"far too long"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let response = app(1024)
            .oneshot(post_request("application/json", "{nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn vendor_json_types_count_as_json() {
        assert!(is_json("application/vnd.api+json"));
        assert!(!is_json("text/json-ish"));
    }
}
