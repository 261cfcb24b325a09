//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (axum-server)
//!     → outlet.rs dispatcher (TraceLayer, first accepting outlet)
//!     → attached outlets, in attach order
//!     → woven RouterApp (app.rs), attached last on start:
//!         built-in middleware (middleware/) and injected middleware,
//!         ordered by priority, then 404
//! ```

pub mod app;
pub mod middleware;
pub mod outlet;
pub mod server;

pub use app::RouterApp;
pub use outlet::{outlet_fn, Outlet, OutletSet, ScopedOutlet, SharedOutlet};
pub use server::WebServer;
