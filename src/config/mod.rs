//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → ServerConfig moved into WebServer::new
//! ```
//!
//! Config is immutable once handed to the server.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, CacheControlConfig, LoggingConfig, PortSetting, ServerConfig, SessionConfig,
    TlsConfig,
};
