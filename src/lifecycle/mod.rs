//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! state.rs:
//!     Created → Listening → Closed (terminal)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → WebServer::stop → stop accepting → drain → exit
//! ```

pub mod signals;
pub mod state;

pub use state::ServerState;
