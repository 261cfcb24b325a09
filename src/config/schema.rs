//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so a minimal file (or none) is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the webserver binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Webserver settings.
    pub webserver: ServerConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// A port given either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortSetting {
    Number(u16),
    Text(String),
}

impl PortSetting {
    /// Numeric value, if the setting is a valid port.
    pub fn resolve(&self) -> Result<u16, String> {
        match self {
            PortSetting::Number(port) => Ok(*port),
            PortSetting::Text(text) => text
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("'{}' is not a valid port: {}", text, e)),
        }
    }
}

impl From<u16> for PortSetting {
    fn from(port: u16) -> Self {
        PortSetting::Number(port)
    }
}

/// Webserver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// When false, `start`/`stop` resolve without touching the network.
    pub enabled: bool,

    /// Bind host. Omitted means all interfaces (`0.0.0.0`).
    pub host: Option<String>,

    /// Bind port. Omitted means an OS-assigned port.
    pub port: Option<PortSetting>,

    /// Log lifecycle transitions at info level instead of debug.
    pub verbose: bool,

    /// Weave the middleware registry and attach it on `start`.
    pub weave: bool,

    /// Enable the production middleware set
    /// (compression, method override, CSRF, security headers).
    pub hardened: bool,

    /// Log request details inside the pipeline.
    pub print_request_info: bool,

    /// Value for `X-Powered-By`; the header is stripped when unset.
    pub set_powered_by: Option<String>,

    /// Redirect target for requests to `/`.
    pub default_redirect_url: Option<String>,

    /// Maximum buffered request body, e.g. `"2mb"`.
    pub json_body_size_limit: String,

    /// TLS settings.
    pub ssl: TlsConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Cache-Control header settings.
    pub cache_control: CacheControlConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: None,
            port: None,
            verbose: true,
            weave: true,
            hardened: false,
            print_request_info: false,
            set_powered_by: None,
            default_redirect_url: None,
            json_body_size_limit: "2mb".to_string(),
            ssl: TlsConfig::default(),
            session: SessionConfig::default(),
            cache_control: CacheControlConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Host to bind, falling back to all interfaces.
    pub fn bind_host(&self) -> &str {
        self.host.as_deref().unwrap_or("0.0.0.0")
    }
}

/// TLS material and options.
///
/// Inline values win over files; files win over the bundled localhost pair.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,

    /// Inline CA bundle (PEM).
    pub ca: Option<String>,
    pub ca_file: Option<String>,

    /// Inline private key (PEM).
    pub key: Option<String>,
    pub key_file: Option<String>,

    /// Inline certificate chain (PEM).
    pub cert: Option<String>,
    pub cert_file: Option<String>,

    /// Path patterns that require a verified client certificate.
    pub urls: Vec<String>,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie name carrying the session id.
    pub name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "sessionId".to_string(),
        }
    }
}

/// Cache-Control header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheControlConfig {
    pub enabled: bool,

    /// Path patterns receiving the header.
    pub urls: Vec<String>,

    /// `max-age` in seconds.
    pub max_age: u64,
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            urls: vec!["*".to_string()],
            max_age: 3600,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,

    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "app_webserver=info,tower_http=info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Parse a human size such as `512kb` or `2mb` into bytes.
pub fn parse_size(text: &str) -> Option<usize> {
    let text = text.trim().to_ascii_lowercase();
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(digits_end);
    let value: usize = digits.parse().ok()?;
    let multiplier = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_accepts_number_or_string() {
        let config: ServerConfig = toml::from_str("port = 7979").unwrap();
        assert_eq!(config.port.unwrap().resolve(), Ok(7979));

        let config: ServerConfig = toml::from_str("port = \"8080\"").unwrap();
        assert_eq!(config.port.unwrap().resolve(), Ok(8080));

        let config: ServerConfig = toml::from_str("port = \"http\"").unwrap();
        assert!(config.port.unwrap().resolve().is_err());
    }

    #[test]
    fn defaults_apply_to_empty_document() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.webserver.enabled);
        assert!(config.webserver.weave);
        assert_eq!(config.webserver.bind_host(), "0.0.0.0");
        assert_eq!(config.webserver.session.name, "sessionId");
        assert!(!config.webserver.ssl.enabled);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn nested_ssl_block_parses() {
        let config: AppConfig = toml::from_str(
            r#"
            [webserver]
            host = "127.0.0.1"
            [webserver.ssl]
            enabled = true
            key_file = "/tmp/key.pem"
            urls = ["/secure"]
            "#,
        )
        .unwrap();
        assert!(config.webserver.ssl.enabled);
        assert_eq!(config.webserver.ssl.key_file.as_deref(), Some("/tmp/key.pem"));
        assert_eq!(config.webserver.ssl.urls, vec!["/secure"]);
    }

    #[test]
    fn sizes_parse_with_units() {
        assert_eq!(parse_size("2mb"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size("512KB"), Some(512 * 1024));
        assert_eq!(parse_size("100"), Some(100));
        assert_eq!(parse_size("10 b"), Some(10));
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("5tb"), None);
    }
}
