//! TLS material resolution and rustls configuration.
//!
//! # Responsibilities
//! - Resolve CA / key / cert from inline values, then files, then (loopback
//!   hosts only) the bundled localhost pair
//! - Report whether HTTPS is usable
//! - Build the rustls server config, optionally verifying client
//!   certificates against the CA
//!
//! Read failures never abort startup: they are logged and the material is
//! treated as absent.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::HandshakeSignatureValid;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::server::WebPkiClientVerifier;
use rustls::{
    DigitallySignedStruct, DistinguishedName, RootCertStore, ServerConfig as RustlsServerConfig,
    SignatureScheme,
};

use crate::config::TlsConfig;
use crate::error::TlsError;

/// Hosts treated as local-only for the default certificate fallback.
pub const LOOPBACK_HOSTS: [&str; 3] = ["0.0.0.0", "127.0.0.1", "localhost"];

const DEFAULT_KEY_PEM: &[u8] = include_bytes!("../../data/ssl/localhost.key.pem");
const DEFAULT_CERT_PEM: &[u8] = include_bytes!("../../data/ssl/localhost.cert.pem");

/// Whether `host` may use the bundled development certificate.
pub fn is_loopback_host(host: &str) -> bool {
    LOOPBACK_HOSTS.contains(&host)
}

/// Where the key/cert pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSource {
    Configured,
    BundledDefault,
}

/// Resolved TLS material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    pub ca: Option<Vec<u8>>,
    pub key: Option<Vec<u8>>,
    pub cert: Option<Vec<u8>>,
    pub available: bool,
    pub source: Option<MaterialSource>,
}

impl TlsMaterial {
    /// Material for plaintext HTTP.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// The bundled localhost key.
    pub fn default_key() -> &'static [u8] {
        DEFAULT_KEY_PEM
    }

    /// The bundled localhost certificate.
    pub fn default_cert() -> &'static [u8] {
        DEFAULT_CERT_PEM
    }
}

fn load_part(what: &str, inline: Option<&String>, file: Option<&String>) -> Option<Vec<u8>> {
    if let Some(value) = inline.filter(|v| !v.is_empty()) {
        return Some(value.as_bytes().to_vec());
    }
    let path = file?;
    match fs::read(Path::new(path)) {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            tracing::debug!(part = what, file = %path, %error, "Failed to load TLS file");
            None
        }
    }
}

/// Resolve TLS material for a server bound to a loopback (or any-interface)
/// host when `is_loopback` is true.
pub fn resolve(config: &TlsConfig, is_loopback: bool) -> TlsMaterial {
    if !config.enabled {
        tracing::trace!("SSL is disabled");
        return TlsMaterial::unavailable();
    }

    let ca = load_part("ca", config.ca.as_ref(), config.ca_file.as_ref());
    let mut key = load_part("key", config.key.as_ref(), config.key_file.as_ref());
    let mut cert = load_part("cert", config.cert.as_ref(), config.cert_file.as_ref());
    let mut source = Some(MaterialSource::Configured);

    if key.is_none() && cert.is_none() && is_loopback {
        tracing::debug!("Using default key/cert for localhost");
        key = Some(DEFAULT_KEY_PEM.to_vec());
        cert = Some(DEFAULT_CERT_PEM.to_vec());
        source = Some(MaterialSource::BundledDefault);
    }

    let available = key.is_some() && cert.is_some();
    if available {
        tracing::debug!(has_ca = ca.is_some(), "HTTPS is available");
    } else {
        tracing::warn!("SSL is enabled but no key/cert pair could be resolved; using HTTP");
        source = None;
    }

    TlsMaterial {
        ca,
        key,
        cert,
        available,
        source,
    }
}

fn parse_certs(pem: &[u8], what: &'static str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem { what, source })?;
    if certs.is_empty() {
        return Err(TlsError::Missing(what));
    }
    Ok(certs)
}

fn parse_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut BufReader::new(pem))
        .map_err(|source| TlsError::Pem { what: "private key", source })?
        .ok_or(TlsError::Missing("private key"))
}

/// Client certificate verifier that never fails the handshake.
///
/// Certificates the CA does not sign are still accepted at the TLS layer;
/// [`is_trusted`](Self::is_trusted) tells the acceptor whether the peer is
/// authorized. Handshake signatures are always checked.
#[derive(Debug)]
pub struct LenientClientVerifier {
    inner: Arc<dyn ClientCertVerifier>,
}

impl LenientClientVerifier {
    /// Whether `chain` (end entity first) is signed by the configured CA.
    pub fn is_trusted(&self, chain: &[CertificateDer<'_>]) -> bool {
        let Some((end_entity, intermediates)) = chain.split_first() else {
            return false;
        };
        self.inner
            .verify_client_cert(end_entity, intermediates, UnixTime::now())
            .is_ok()
    }
}

impl ClientCertVerifier for LenientClientVerifier {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        false
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        if let Err(error) = self.inner.verify_client_cert(end_entity, intermediates, now) {
            tracing::debug!(%error, "Client certificate not trusted; connection stays unauthorized");
        }
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// A rustls server config plus the verifier deciding client authorization.
#[derive(Debug, Clone)]
pub struct ServerTls {
    pub config: Arc<RustlsServerConfig>,
    /// Present when a CA is configured.
    pub client_verifier: Option<Arc<LenientClientVerifier>>,
}

/// Build the rustls server configuration.
///
/// With a CA, client certificates are requested but never required, and a
/// certificate the CA does not sign still completes the handshake. Handlers
/// learn the outcome through [`ClientIdentity`].
///
/// [`ClientIdentity`]: crate::net::acceptor::ClientIdentity
pub fn build_server_config(material: &TlsMaterial) -> Result<ServerTls, TlsError> {
    let cert = material.cert.as_deref().ok_or(TlsError::Missing("certificate"))?;
    let key = material.key.as_deref().ok_or(TlsError::Missing("private key"))?;
    let chain = parse_certs(cert, "certificate")?;
    let key = parse_key(key)?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let builder = RustlsServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;
    let (mut config, client_verifier) = match material.ca.as_deref() {
        Some(ca) => {
            let mut roots = RootCertStore::empty();
            for ca_cert in parse_certs(ca, "CA certificate")? {
                roots
                    .add(ca_cert)
                    .map_err(|e| TlsError::Verifier(e.to_string()))?;
            }
            let inner = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .allow_unauthenticated()
                .build()
                .map_err(|e| TlsError::Verifier(e.to_string()))?;
            let verifier = Arc::new(LenientClientVerifier { inner });
            let config = builder
                .with_client_cert_verifier(verifier.clone())
                .with_single_cert(chain, key)?;
            (config, Some(verifier))
        }
        None => (builder.with_no_client_auth().with_single_cert(chain, key)?, None),
    };
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(ServerTls {
        config: Arc::new(config),
        client_verifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn enabled() -> TlsConfig {
        TlsConfig {
            enabled: true,
            ..TlsConfig::default()
        }
    }

    #[test]
    fn disabled_is_unavailable() {
        let material = resolve(&TlsConfig::default(), true);
        assert!(!material.available);
        assert!(material.key.is_none());
    }

    #[test]
    fn loopback_falls_back_to_bundled_pair() {
        let material = resolve(&enabled(), true);
        assert!(material.available);
        assert_eq!(material.key.as_deref(), Some(TlsMaterial::default_key()));
        assert_eq!(material.cert.as_deref(), Some(TlsMaterial::default_cert()));
        assert_eq!(material.source, Some(MaterialSource::BundledDefault));
    }

    #[test]
    fn public_host_gets_no_default() {
        let material = resolve(&enabled(), false);
        assert!(!material.available);
        assert!(material.key.is_none());
        assert!(material.cert.is_none());
    }

    #[test]
    fn inline_values_win_over_files() {
        let config = TlsConfig {
            key: Some("inline-key".into()),
            key_file: Some("/no/such/key.pem".into()),
            cert: Some("inline-cert".into()),
            ..enabled()
        };
        let material = resolve(&config, false);
        assert!(material.available);
        assert_eq!(material.key.as_deref(), Some(&b"inline-key"[..]));
        assert_eq!(material.source, Some(MaterialSource::Configured));
    }

    #[test]
    fn files_are_read_and_missing_ca_is_tolerated() {
        let mut key = tempfile::NamedTempFile::new().unwrap();
        key.write_all(TlsMaterial::default_key()).unwrap();
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        cert.write_all(TlsMaterial::default_cert()).unwrap();

        let config = TlsConfig {
            ca_file: Some("/no/such/ca.pem".into()),
            key_file: Some(key.path().display().to_string()),
            cert_file: Some(cert.path().display().to_string()),
            ..enabled()
        };
        let material = resolve(&config, false);
        assert!(material.available);
        assert!(material.ca.is_none());
        assert!(build_server_config(&material).is_ok());
    }

    #[test]
    fn half_a_pair_is_unavailable_even_on_loopback() {
        let config = TlsConfig {
            key: Some("only-key".into()),
            ..enabled()
        };
        let material = resolve(&config, true);
        assert!(!material.available);
    }

    #[test]
    fn bundled_pair_builds_a_rustls_config() {
        let material = resolve(&enabled(), true);
        let tls = build_server_config(&material).unwrap();
        assert!(tls.config.alpn_protocols.contains(&b"http/1.1".to_vec()));
        assert!(tls.client_verifier.is_none());
    }

    #[test]
    fn ca_enables_client_verification() {
        let config = TlsConfig {
            ca: Some(String::from_utf8(TlsMaterial::default_cert().to_vec()).unwrap()),
            ..enabled()
        };
        let material = resolve(&config, true);
        assert!(material.ca.is_some());
        assert!(build_server_config(&material).unwrap().client_verifier.is_some());
    }

    fn fixture(name: &str) -> Vec<u8> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/ssl")
            .join(name);
        fs::read(path).unwrap()
    }

    #[test]
    fn lenient_verifier_separates_trusted_from_strangers() {
        let material = TlsMaterial {
            ca: Some(fixture("ca.cert.pem")),
            key: Some(TlsMaterial::default_key().to_vec()),
            cert: Some(TlsMaterial::default_cert().to_vec()),
            available: true,
            source: Some(MaterialSource::Configured),
        };
        let verifier = build_server_config(&material).unwrap().client_verifier.unwrap();

        let trusted = parse_certs(&fixture("client.cert.pem"), "client").unwrap();
        let stranger = parse_certs(&fixture("stranger.cert.pem"), "stranger").unwrap();
        assert!(verifier.is_trusted(&trusted));
        assert!(!verifier.is_trusted(&stranger));
        assert!(!verifier.is_trusted(&[]));

        // The handshake itself never fails on an untrusted chain.
        assert!(verifier
            .verify_client_cert(&stranger[0], &[], UnixTime::now())
            .is_ok());
        assert!(!verifier.client_auth_mandatory());
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let material = TlsMaterial {
            key: Some(b"not a key".to_vec()),
            cert: Some(b"not a cert".to_vec()),
            available: true,
            ..TlsMaterial::default()
        };
        assert!(build_server_config(&material).is_err());
    }

    #[test]
    fn loopback_hosts() {
        assert!(is_loopback_host("0.0.0.0"));
        assert!(is_loopback_host("localhost"));
        assert!(!is_loopback_host("10.0.0.5"));
    }
}
