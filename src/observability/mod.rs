//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → whatever recorder the embedding process installs
//! ```
//!
//! Without an installed recorder the metric calls are no-ops.

pub mod logging;
pub mod metrics;
