//! Pluggable HTTP(S) webserver.
//!
//! Collaborators contribute middleware with a numeric priority; the server
//! weaves them into one ordered pipeline at start and hands requests to
//! attached outlets.
//!
//! ```text
//!   collaborators ──inject──▶ MiddlewareRegistry ◀── PositionAllocator
//!                                   │ weave (on start)
//!                                   ▼
//!   client ──▶ axum-server ──▶ dispatcher ──▶ outlets … ──▶ RouterApp
//!              (rustls)        (first accepting outlet)     (woven pipeline)
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod info;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod security;

pub use config::schema::{AppConfig, ServerConfig};
pub use error::{ServerError, TlsError, WeaveError};
pub use http::{Outlet, SharedOutlet, WebServer};
pub use info::{ServiceHelp, ServiceInfo};
pub use lifecycle::ServerState;
pub use pipeline::{
    middleware_fn, Band, Injection, Middleware, MiddlewareDescriptor, MiddlewareRegistry,
    PositionAllocator,
};
