//! TLS configuration for the overlay HTTPS listener.
//!
//! Certificates are not loaded up front: every handshake asks the overlay
//! local client for a certificate matching the requested server name.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::CertificateDer;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::overlay::LocalClient;

/// ALPN protocols for HTTP/2 and HTTP/1.1 negotiation, h2 preferred.
pub const ALPN_PROTOCOLS: &[&[u8]] = &[b"h2", b"http/1.1"];

/// Resolves handshake certificates through the overlay local client.
pub struct OverlayCertResolver {
    client: Arc<dyn LocalClient>,
}

impl OverlayCertResolver {
    pub fn new(client: Arc<dyn LocalClient>) -> Self {
        Self { client }
    }
}

impl fmt::Debug for OverlayCertResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayCertResolver").finish_non_exhaustive()
    }
}

impl ResolvesServerCert for OverlayCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let server_name = client_hello.server_name();
        match self.client.certificate(server_name) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(
                    server_name = server_name.unwrap_or(""),
                    error = %e,
                    "Certificate lookup failed"
                );
                None
            }
        }
    }
}

/// Build the rustls server config used on overlay port 443.
pub fn overlay_tls_config(client: Arc<dyn LocalClient>) -> Result<RustlsConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(OverlayCertResolver::new(client)));
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

/// Load a PEM certificate chain and private key into a signing-ready key.
pub fn load_certified_key(cert_path: &Path, key_path: &Path) -> io::Result<CertifiedKey> {
    let certs = load_certs(cert_path)?;

    let mut reader = BufReader::new(File::open(key_path)?);
    let key = rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no private key found in {}", key_path.display()),
        )
    })?;

    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    Ok(CertifiedKey::new(certs, signing_key))
}

fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no certificates found in {}", path.display()),
        ));
    }
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    #[test]
    fn loads_fixture_pair() {
        let key = load_certified_key(&fixture("node.crt"), &fixture("node.key")).unwrap();
        assert_eq!(key.cert.len(), 1);
    }

    #[test]
    fn key_file_without_key_is_rejected() {
        let err = load_certified_key(&fixture("node.crt"), &fixture("node.crt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn missing_cert_file() {
        let err = load_certified_key(Path::new("/nonexistent.crt"), &fixture("node.key")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
