//! CSRF protection bound to the session.
//!
//! Every request gets a [`CsrfToken`] extension; the session's token is
//! minted the first time a handler reads it. Requests with unsafe methods
//! must echo that token in a header.

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::http::middleware::session::SessionHandle;
use crate::pipeline::{middleware_fn, Middleware};

const SESSION_KEY: &str = "csrfToken";
const TOKEN_HEADERS: [&str; 3] = ["x-csrf-token", "csrf-token", "x-xsrf-token"];

/// Token a client must send back on state-changing requests.
#[derive(Debug, Clone)]
pub struct CsrfToken {
    session: SessionHandle,
}

impl CsrfToken {
    /// The session's token, created on first use.
    pub fn value(&self) -> String {
        self.session
            .get_or_insert_with(SESSION_KEY, || Uuid::new_v4().to_string())
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn presented_token(request: &Request) -> Option<&str> {
    TOKEN_HEADERS
        .iter()
        .find_map(|name| request.headers().get(*name))
        .and_then(|value| value.to_str().ok())
}

pub fn csrf() -> Middleware {
    middleware_fn(|mut request: Request, next: Next| async move {
        let Some(session) = request.extensions().get::<SessionHandle>().cloned() else {
            tracing::error!("CSRF middleware mounted without a session");
            return (StatusCode::INTERNAL_SERVER_ERROR, "misconfigured csrf").into_response();
        };
        if !is_safe(request.method()) {
            let expected = session.get(SESSION_KEY);
            let valid = matches!(
                (presented_token(&request), expected.as_deref()),
                (Some(presented), Some(expected)) if presented == expected
            );
            if !valid {
                tracing::debug!(
                    method = %request.method(),
                    path = %request.uri().path(),
                    "Rejected request with invalid CSRF token"
                );
                return (StatusCode::FORBIDDEN, "invalid csrf token").into_response();
            }
        }

        request.extensions_mut().insert(CsrfToken { session });
        next.run(request).await
    })
}
