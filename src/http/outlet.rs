//! Request outlets and the dispatcher in front of them.
//!
//! # Responsibilities
//! - Hold the ordered list of attached outlets
//! - Hand each request to the first outlet that accepts it
//! - Fall back to the woven application, then answer 404
//!
//! Attaching and detaching swap the list atomically, so requests in flight
//! keep the snapshot they started with.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use futures_util::future::BoxFuture;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::observability::metrics;
use crate::pipeline::PathFilter;

/// Something that can answer requests for the webserver.
pub trait Outlet: Send + Sync + 'static {
    /// Whether this outlet wants `request`. Defaults to everything.
    fn accepts(&self, _request: &Request) -> bool {
        true
    }

    fn serve(&self, request: Request) -> BoxFuture<'static, Response>;
}

/// Shared handle to an outlet; identity is the allocation.
pub type SharedOutlet = Arc<dyn Outlet>;

impl Outlet for Router {
    fn serve(&self, request: Request) -> BoxFuture<'static, Response> {
        let router = self.clone();
        Box::pin(async move {
            match router.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        })
    }
}

/// Outlet backed by an async function.
pub struct FnOutlet<F> {
    handler: F,
}

impl<F, Fut> Outlet for FnOutlet<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn serve(&self, request: Request) -> BoxFuture<'static, Response> {
        Box::pin((self.handler)(request))
    }
}

/// Wrap an async function into a [`SharedOutlet`] accepting every request.
pub fn outlet_fn<F, Fut>(handler: F) -> SharedOutlet
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(FnOutlet { handler })
}

/// An outlet that only accepts paths matching a filter.
pub struct ScopedOutlet {
    filter: PathFilter,
    inner: SharedOutlet,
}

impl ScopedOutlet {
    pub fn new(filter: PathFilter, inner: SharedOutlet) -> Self {
        Self { filter, inner }
    }
}

impl Outlet for ScopedOutlet {
    fn accepts(&self, request: &Request) -> bool {
        self.filter.matches(request.uri().path()) && self.inner.accepts(request)
    }

    fn serve(&self, request: Request) -> BoxFuture<'static, Response> {
        self.inner.serve(request)
    }
}

fn same_outlet(a: &SharedOutlet, b: &SharedOutlet) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[derive(Default)]
struct Outlets {
    attached: Vec<SharedOutlet>,
    fallback: Option<SharedOutlet>,
}

/// Ordered list of outlets plus an optional fallback.
///
/// Attached outlets are always consulted before the fallback, whenever they
/// were attached. Reads are lock-free; writers serialize on a mutex and
/// publish a new snapshot.
pub struct OutletSet {
    outlets: ArcSwap<Outlets>,
    write: Mutex<()>,
}

impl OutletSet {
    pub fn new() -> Self {
        Self {
            outlets: ArcSwap::from_pointee(Outlets::default()),
            write: Mutex::new(()),
        }
    }

    /// Append `outlet`. Returns false if it is already attached.
    pub fn attach(&self, outlet: SharedOutlet) -> bool {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.outlets.load_full();
        if current.attached.iter().any(|o| same_outlet(o, &outlet)) {
            return false;
        }
        let mut attached = Vec::with_capacity(current.attached.len() + 1);
        attached.extend(current.attached.iter().cloned());
        attached.push(outlet);
        self.outlets.store(Arc::new(Outlets {
            attached,
            fallback: current.fallback.clone(),
        }));
        true
    }

    /// Remove `outlet`. Returns false if it was not attached.
    pub fn detach(&self, outlet: &SharedOutlet) -> bool {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.outlets.load_full();
        let attached: Vec<SharedOutlet> = current
            .attached
            .iter()
            .filter(|o| !same_outlet(o, outlet))
            .cloned()
            .collect();
        if attached.len() == current.attached.len() {
            return false;
        }
        self.outlets.store(Arc::new(Outlets {
            attached,
            fallback: current.fallback.clone(),
        }));
        true
    }

    /// Replace the outlet consulted after every attached one.
    pub fn set_fallback(&self, fallback: Option<SharedOutlet>) {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.outlets.load_full();
        self.outlets.store(Arc::new(Outlets {
            attached: current.attached.clone(),
            fallback,
        }));
    }

    pub fn has_fallback(&self) -> bool {
        self.outlets.load().fallback.is_some()
    }

    /// Number of attached outlets, fallback excluded.
    pub fn len(&self) -> usize {
        self.outlets.load().attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.load().attached.is_empty()
    }

    /// First attached outlet accepting `request`, else the fallback if it
    /// accepts.
    pub fn select(&self, request: &Request) -> Option<SharedOutlet> {
        let outlets = self.outlets.load();
        outlets
            .attached
            .iter()
            .chain(outlets.fallback.iter())
            .find(|outlet| outlet.accepts(request))
            .cloned()
    }
}

impl Default for OutletSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the router every connection is served by.
pub fn dispatcher(outlets: Arc<OutletSet>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(outlets)
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(outlets): State<Arc<OutletSet>>, request: Request) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = match outlets.select(&request) {
        Some(outlet) => outlet.serve(request).await,
        None => {
            tracing::debug!(path = %request.uri().path(), "No outlet accepted the request");
            metrics::record_unhandled();
            (StatusCode::NOT_FOUND, "No handler attached").into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
