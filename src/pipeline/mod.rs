//! Middleware ordering subsystem.
//!
//! # Data Flow
//! ```text
//! Collaborators
//!     → position.rs (allocate a priority inside a band)
//!     → registry.rs (inject descriptor: name, path filter, handler, priority)
//!
//! On start:
//!     registry.weave(app)
//!     → stable sort by priority
//!     → path.rs compiles each path filter
//!     → app.mount(...) in order
//! ```

pub mod handler;
pub mod path;
pub mod position;
pub mod registry;

pub use handler::{from_layer, middleware_fn, Middleware};
pub use path::{PathFilter, PathPattern};
pub use position::{Band, PositionAllocator, PriorityBand};
pub use registry::{Application, Injection, MiddlewareDescriptor, MiddlewareRegistry};
