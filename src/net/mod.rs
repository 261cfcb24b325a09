//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig
//!     → tls.rs (resolve CA/key/cert, build rustls config)
//!     → address.rs (resolve host/port to a socket address)
//!     → acceptor.rs (TLS handshake, client identity)
//!     → Hand off to the HTTP layer
//! ```
//!
//! TLS is optional; when material is missing the server speaks plain HTTP.

pub mod acceptor;
pub mod address;
pub mod tls;

pub use acceptor::{ClientCertAcceptor, ClientIdentity};
pub use tls::{is_loopback_host, TlsMaterial};
