// SPDX-License-Identifier: MIT OR Apache-2.0

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::path::Path;
use std::sync::Arc;

use crate::config::{AuthStyle, ProbeConfig};
use crate::error::{ProbeError, Result};

/// Build the rustls client configuration for `config`.
///
/// Reads the client certificate and key for `CERTIFICATE` style, and the CA
/// bundle when server verification is on.
pub(super) fn client_config(config: &ProbeConfig) -> Result<rustls::ClientConfig> {
    let root_store = if config.verify_server_cert {
        if let Some(ca_path) = &config.ca_path {
            let ca_pem = read_pem_file(ca_path, "CA cert")?;
            let mut root_store = rustls::RootCertStore::empty();
            for cert in load_pem_certs(&ca_pem)? {
                root_store
                    .add(cert)
                    .map_err(|e| ProbeError::Tls(format!("Failed to add CA cert: {e}")))?;
            }
            root_store
        } else {
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            root_store
        }
    } else {
        rustls::RootCertStore::empty()
    };

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store);

    let mut tls_config = match config.style {
        AuthStyle::Certificate => {
            let (Some(crt_path), Some(key_path)) = (&config.cert_path, &config.key_path) else {
                return Err(ProbeError::Config(
                    "CERTIFICATE style requires both a client certificate and key".to_string(),
                ));
            };
            let cert_pem = read_pem_file(crt_path, "client cert")?;
            let key_pem = read_pem_file(key_path, "client key")?;

            let client_certs = load_pem_certs(&cert_pem)?;
            let client_key = load_pem_key(&key_pem)?;

            builder
                .with_client_auth_cert(client_certs, client_key)
                .map_err(|e| ProbeError::Tls(format!("Failed to configure client auth: {e}")))?
        }
        AuthStyle::Login => builder.with_no_client_auth(),
    };

    if !config.verify_server_cert {
        tracing::warn!(
            cluster = %config.cluster,
            "server certificate verification is disabled"
        );
        tls_config
            .dangerous()
            .set_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }));
    }

    tls_config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(tls_config)
}

fn read_pem_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| ProbeError::Config(format!("Failed to read {what} {}: {e}", path.display())))
}

/// Load PEM-encoded certificates
pub(crate) fn load_pem_certs(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(pem_data);
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ProbeError::Config(format!("Failed to parse PEM certificates: {e}")))?;
    if certs.is_empty() {
        return Err(ProbeError::Config(
            "No certificates found in PEM data".to_string(),
        ));
    }
    Ok(certs)
}

/// Load a PEM-encoded private key (PKCS#1, PKCS#8 or SEC1)
pub(crate) fn load_pem_key(pem_data: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut reader = std::io::BufReader::new(pem_data);

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(rustls_pemfile::Item::Pkcs1Key(key))) => return Ok(PrivateKeyDer::Pkcs1(key)),
            Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) => return Ok(PrivateKeyDer::Pkcs8(key)),
            Ok(Some(rustls_pemfile::Item::Sec1Key(key))) => return Ok(PrivateKeyDer::Sec1(key)),
            // Certificates bundled in the same file
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return Err(ProbeError::Config(format!("Failed to parse PEM key: {e}")));
            }
        }
    }

    Err(ProbeError::Config(
        "No private key found in PEM data".to_string(),
    ))
}

/// Accepts any server certificate. Handshake signatures are still checked
/// against the presented certificate.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<rustls::crypto::CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    // Only schemes the provider can verify. SHA-1 signatures are not offered
    // since verify_tls12_signature would reject them anyway.
    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
