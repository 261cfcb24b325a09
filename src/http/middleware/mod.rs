//! Built-in middleware.
//!
//! # Data Flow
//! ```text
//! WebServer::new
//!     → install() picks the set from ServerConfig
//!     → each built-in gets a slot from the PositionAllocator
//!     → descriptors land in the MiddlewareRegistry, woven on start
//! ```
//!
//! | name | slot |
//! |---|---|
//! | `client-cert-gate` | `POSITION_CLIENT_CERT_GATE` |
//! | `compression` | `POSITION_COMPRESSION` |
//! | `request-info` | static files band |
//! | `cookie-parser` | `POSITION_COOKIE_PARSER` |
//! | `session` | `POSITION_SESSION` |
//! | `body-parser-json`, `body-parser-urlencoded` | `POSITION_BODY_PARSER` |
//! | `method-override` | `POSITION_METHOD_OVERRIDE` |
//! | `csrf` | `POSITION_CSRF` |
//! | `helmet` | `POSITION_HELMET` |
//! | `setPoweredBy` / `hidePoweredBy`, `cacheControl` | middlewares band |
//! | `defaultRedirect` | after middlewares |

pub mod body_parser;
pub mod cache_control;
pub mod client_auth;
pub mod cookies;
pub mod csrf;
pub mod method_override;
pub mod powered_by;
pub mod redirect;
pub mod request_info;
pub mod session;

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::config::{schema::parse_size, ServerConfig};
use crate::net::TlsMaterial;
use crate::pipeline::position::{
    POSITION_BODY_PARSER, POSITION_CLIENT_CERT_GATE, POSITION_COMPRESSION, POSITION_COOKIE_PARSER,
    POSITION_CSRF, POSITION_HELMET, POSITION_METHOD_OVERRIDE, POSITION_SESSION,
};
use crate::pipeline::{MiddlewareDescriptor, MiddlewareRegistry, PositionAllocator};
use crate::security;

pub use body_parser::ParsedBody;
pub use cookies::Cookies;
pub use csrf::CsrfToken;
pub use session::{Session, SessionHandle, SessionStore};

const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Shared state the built-ins need.
pub struct Builtins<'a> {
    pub config: &'a ServerConfig,
    pub tls: &'a TlsMaterial,
    pub sessions: Arc<SessionStore>,
}

/// Register the built-in middleware selected by the configuration.
///
/// Returns the names injected, in injection order.
pub fn install(
    builtins: Builtins<'_>,
    positions: &PositionAllocator,
    registry: &MiddlewareRegistry,
) -> Vec<String> {
    let Builtins {
        config,
        tls,
        sessions,
    } = builtins;
    let mut descriptors = Vec::new();

    if tls.available && tls.ca.is_some() && !config.ssl.urls.is_empty() {
        descriptors.push(
            MiddlewareDescriptor::new(
                "client-cert-gate",
                client_auth::client_cert_gate(),
                POSITION_CLIENT_CERT_GATE,
            )
            .with_path(config.ssl.urls.iter().cloned()),
        );
    }

    if config.print_request_info {
        descriptors.push(MiddlewareDescriptor::new(
            "request-info",
            request_info::print_request_info(),
            positions.in_range_of_static_files(None),
        ));
    }

    let body_limit = parse_size(&config.json_body_size_limit).unwrap_or_else(|| {
        tracing::warn!(
            limit = %config.json_body_size_limit,
            "Unparseable json_body_size_limit, using 2mb"
        );
        DEFAULT_BODY_LIMIT
    });

    descriptors.push(MiddlewareDescriptor::new(
        "cookie-parser",
        cookies::cookie_parser(),
        POSITION_COOKIE_PARSER,
    ));
    descriptors.push(MiddlewareDescriptor::new(
        "session",
        session::session(sessions, config.session.name.clone()),
        POSITION_SESSION,
    ));
    descriptors.push(MiddlewareDescriptor::new(
        "body-parser-json",
        body_parser::json_body_parser(body_limit),
        POSITION_BODY_PARSER,
    ));
    descriptors.push(MiddlewareDescriptor::new(
        "body-parser-urlencoded",
        body_parser::urlencoded_body_parser(body_limit),
        POSITION_BODY_PARSER,
    ));

    if config.hardened {
        descriptors.push(MiddlewareDescriptor::new(
            "compression",
            security::compression(),
            POSITION_COMPRESSION,
        ));
        descriptors.push(MiddlewareDescriptor::new(
            "method-override",
            method_override::method_override(),
            POSITION_METHOD_OVERRIDE,
        ));
        descriptors.push(MiddlewareDescriptor::new("csrf", csrf::csrf(), POSITION_CSRF));
        descriptors.push(MiddlewareDescriptor::new(
            "helmet",
            security::security_headers(),
            POSITION_HELMET,
        ));
    }

    let powered_by = config
        .set_powered_by
        .as_deref()
        .and_then(|value| match HeaderValue::from_str(value) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(%error, "Invalid set_powered_by value, hiding the header instead");
                None
            }
        });
    descriptors.push(match powered_by {
        Some(value) => MiddlewareDescriptor::new(
            "setPoweredBy",
            powered_by::set_powered_by(value),
            positions.in_range_of_middlewares(None),
        ),
        None => MiddlewareDescriptor::new(
            "hidePoweredBy",
            powered_by::hide_powered_by(),
            positions.in_range_of_middlewares(None),
        ),
    });

    if config.cache_control.enabled {
        descriptors.push(
            MiddlewareDescriptor::new(
                "cacheControl",
                cache_control::cache_control(config.cache_control.max_age),
                positions.in_range_of_middlewares(None),
            )
            .with_path(config.cache_control.urls.iter().cloned()),
        );
    }

    if let Some(url) = config.default_redirect_url.as_deref() {
        match HeaderValue::from_str(url) {
            Ok(location) => descriptors.push(
                MiddlewareDescriptor::new(
                    "defaultRedirect",
                    redirect::default_redirect(location),
                    positions.after_middlewares(None),
                )
                .with_path(["/$"]),
            ),
            Err(error) => {
                tracing::warn!(%error, url, "Invalid default_redirect_url, redirect disabled");
            }
        }
    }

    descriptors
        .into_iter()
        .map(|descriptor| {
            let name = descriptor.name.clone();
            registry.inject(descriptor);
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheControlConfig, TlsConfig};

    fn installed(config: &ServerConfig, tls: &TlsMaterial) -> (Vec<String>, Vec<(String, i64)>) {
        let positions = PositionAllocator::new();
        let registry = MiddlewareRegistry::new();
        let names = install(
            Builtins {
                config,
                tls,
                sessions: Arc::new(SessionStore::new()),
            },
            &positions,
            &registry,
        );
        (names, registry.plan())
    }

    #[test]
    fn default_set() {
        let (names, plan) = installed(&ServerConfig::default(), &TlsMaterial::unavailable());
        assert_eq!(
            names,
            [
                "cookie-parser",
                "session",
                "body-parser-json",
                "body-parser-urlencoded",
                "hidePoweredBy"
            ]
        );
        let order: Vec<_> = plan.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            order,
            [
                "cookie-parser",
                "session",
                "body-parser-json",
                "body-parser-urlencoded",
                "hidePoweredBy"
            ]
        );
        let powered = plan.iter().find(|(n, _)| n == "hidePoweredBy").unwrap();
        assert!((0..=10_000).contains(&powered.1));
    }

    #[test]
    fn hardened_set_orders_compression_first() {
        let config = ServerConfig {
            hardened: true,
            set_powered_by: Some("devebot".into()),
            ..ServerConfig::default()
        };
        let (_, plan) = installed(&config, &TlsMaterial::unavailable());
        let order: Vec<_> = plan.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            order,
            [
                "compression",
                "cookie-parser",
                "session",
                "body-parser-json",
                "body-parser-urlencoded",
                "method-override",
                "csrf",
                "helmet",
                "setPoweredBy"
            ]
        );
    }

    #[test]
    fn conditional_middleware() {
        let config = ServerConfig {
            print_request_info: true,
            default_redirect_url: Some("/home".into()),
            cache_control: CacheControlConfig {
                enabled: true,
                ..CacheControlConfig::default()
            },
            ssl: TlsConfig {
                enabled: true,
                ca: Some("ca".into()),
                urls: vec!["/secure".into()],
                ..TlsConfig::default()
            },
            ..ServerConfig::default()
        };
        let tls = TlsMaterial {
            ca: Some(b"ca".to_vec()),
            key: Some(b"key".to_vec()),
            cert: Some(b"cert".to_vec()),
            available: true,
            source: None,
        };
        let (_, plan) = installed(&config, &tls);

        assert_eq!(plan.first().map(|(n, _)| n.as_str()), Some("client-cert-gate"));
        assert_eq!(plan[1].0, "request-info");
        assert!((-9_999..=-151).contains(&plan[1].1));
        assert_eq!(plan.last().map(|(n, _)| n.as_str()), Some("defaultRedirect"));
        assert!(plan.last().unwrap().1 > 10_000);
        assert!(plan.iter().any(|(n, _)| n == "cacheControl"));
    }

    #[test]
    fn gate_needs_a_ca() {
        let config = ServerConfig {
            ssl: TlsConfig {
                enabled: true,
                urls: vec!["/secure".into()],
                ..TlsConfig::default()
            },
            ..ServerConfig::default()
        };
        let tls = TlsMaterial {
            available: true,
            ..TlsMaterial::unavailable()
        };
        let (names, _) = installed(&config, &tls);
        assert!(!names.iter().any(|n| n == "client-cert-gate"));
    }
}
