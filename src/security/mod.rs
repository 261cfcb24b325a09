//! Response hardening: security headers and compression.

pub mod headers;

pub use headers::{compression, security_headers};
