//! Listen address resolution.

use std::net::SocketAddr;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Resolve the configured host/port to the first matching socket address.
///
/// An omitted host binds all interfaces; an omitted port lets the OS pick.
pub async fn resolve_listen_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    let host = config.bind_host();
    let port = match &config.port {
        Some(port) => port.resolve().map_err(|reason| ServerError::InvalidAddress {
            address: host.to_string(),
            reason,
        })?,
        None => 0,
    };

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ServerError::InvalidAddress {
            address: format!("{}:{}", host, port),
            reason: e.to_string(),
        })?;

    addrs.next().ok_or_else(|| ServerError::InvalidAddress {
        address: format!("{}:{}", host, port),
        reason: "host did not resolve to any address".to_string(),
    })
}
