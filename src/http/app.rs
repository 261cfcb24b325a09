//! The application the middleware registry is woven into.
//!
//! Mounted handlers become `axum::middleware::from_fn` layers. The first
//! mounted handler is the outermost layer and sees the request first.
//! Requests that fall through every handler get `404 Not Found`.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::future::BoxFuture;

use crate::error::WeaveError;
use crate::http::outlet::SharedOutlet;
use crate::pipeline::{Application, Middleware, PathFilter};

struct Mounted {
    name: String,
    filter: Option<PathFilter>,
    handler: Middleware,
}

/// Collects mounted middleware and turns them into a router.
#[derive(Default)]
pub struct RouterApp {
    mounted: Vec<Mounted>,
    routes: Option<Router>,
}

impl RouterApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// End the middleware chain in `routes` instead of a bare 404.
    pub fn with_routes(routes: Router) -> Self {
        Self {
            mounted: Vec::new(),
            routes: Some(routes),
        }
    }

    /// Names in mount order.
    pub fn mounted(&self) -> Vec<&str> {
        self.mounted.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn into_router(self) -> Router {
        let mut router = self
            .routes
            .unwrap_or_default()
            .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found").into_response() });

        // Layers wrap outward, so the first mounted handler goes on last.
        for Mounted { filter, handler, .. } in self.mounted.into_iter().rev() {
            router = router.layer(from_fn(
                move |request: Request, next: Next| -> BoxFuture<'static, Response> {
                    let applies = filter
                        .as_ref()
                        .map_or(true, |f| f.matches(request.uri().path()));
                    if applies {
                        handler(request, next)
                    } else {
                        Box::pin(next.run(request))
                    }
                },
            ));
        }
        router
    }

    pub fn into_outlet(self) -> SharedOutlet {
        Arc::new(self.into_router())
    }
}

impl Application for RouterApp {
    fn mount(
        &mut self,
        name: &str,
        scope: Option<&[String]>,
        handler: Middleware,
    ) -> Result<(), WeaveError> {
        let filter = scope
            .map(PathFilter::parse)
            .transpose()
            .map_err(|source| WeaveError::InvalidPath {
                name: name.to_string(),
                source,
            })?;
        self.mounted.push(Mounted {
            name: name.to_string(),
            filter,
            handler,
        });
        Ok(())
    }
}
