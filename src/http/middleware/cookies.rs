//! Cookie parsing.
//!
//! Parses every `Cookie` header into a [`Cookies`] request extension so later
//! middleware and handlers read cookies without re-parsing.

use std::collections::HashMap;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
};

use crate::pipeline::{middleware_fn, Middleware};

/// Cookies sent with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    cookies: HashMap<String, String>,
}

impl Cookies {
    /// Parse all `Cookie` headers. Malformed pairs are ignored; on duplicate
    /// names the first occurrence wins.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            for pair in value.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    cookies
                        .entry(name.to_string())
                        .or_insert_with(|| value.trim().trim_matches('"').to_string());
                }
            }
        }
        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Cookies for `request`, parsed on demand when the parser did not run.
pub fn cookies_of(request: &Request) -> Cookies {
    request
        .extensions()
        .get::<Cookies>()
        .cloned()
        .unwrap_or_else(|| Cookies::from_headers(request.headers()))
}

pub fn cookie_parser() -> Middleware {
    middleware_fn(|mut request: Request, next: Next| async move {
        let cookies = Cookies::from_headers(request.headers());
        request.extensions_mut().insert(cookies);
        next.run(request).await
    })
}
