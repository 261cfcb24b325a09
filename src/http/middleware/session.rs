//! In-memory sessions keyed by a cookie.
//!
//! # Responsibilities
//! - Look up the session named by the session cookie
//! - Hand out a fresh session (UUID v4 id) when the cookie is missing or unknown
//! - Store a fresh session and send `Set-Cookie` only once something was
//!   written to it
//!
//! Clients that never write to their session leave nothing behind. Stored
//! sessions live for the lifetime of the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
};
use dashmap::DashMap;
use uuid::Uuid;

use crate::http::middleware::cookies::cookies_of;
use crate::pipeline::{middleware_fn, Middleware};

/// One client session.
#[derive(Debug)]
pub struct Session {
    id: String,
    values: Mutex<HashMap<String, String>>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True while nothing has been written to the session.
    pub fn is_empty(&self) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Value for `key`, inserting the result of `init` when absent.
    pub fn get_or_insert_with(&self, key: &str, init: impl FnOnce() -> String) -> String {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_insert_with(init)
            .clone()
    }
}

/// Session handle stored in request extensions.
pub type SessionHandle = Arc<Session>;

/// Server-wide session storage.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// A session with a new id that is not stored yet.
    pub fn fresh(&self) -> SessionHandle {
        Arc::new(Session::new(Uuid::new_v4().to_string()))
    }

    pub fn save(&self, session: SessionHandle) {
        self.sessions.insert(session.id().to_string(), session);
    }

    /// Create and store a session.
    pub fn create(&self) -> SessionHandle {
        let session = self.fresh();
        self.save(session.clone());
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

pub fn session(store: Arc<SessionStore>, cookie_name: String) -> Middleware {
    middleware_fn(move |mut request: Request, next: Next| {
        let store = store.clone();
        let cookie_name = cookie_name.clone();
        async move {
            let existing = cookies_of(&request)
                .get(&cookie_name)
                .and_then(|id| store.get(id));
            let (session, fresh) = match existing {
                Some(session) => (session, false),
                None => (store.fresh(), true),
            };
            request.extensions_mut().insert(session.clone());

            let mut response = next.run(request).await;
            if fresh && !session.is_empty() {
                tracing::trace!(session = %session.id(), "Session created");
                store.save(session.clone());
                let cookie = format!("{}={}; Path=/; HttpOnly", cookie_name, session.id());
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                    Err(error) => {
                        tracing::warn!(%error, cookie = %cookie_name, "Unable to encode session cookie");
                    }
                }
            }
            response
        }
    })
}
