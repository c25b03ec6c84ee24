// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::api::ResultsStatus;
use crate::resources::SystemGetVersionRequest;
use crate::testkit::{MockFiler, MockReply, MockTls};
use std::io::Write;

fn http_config(port: u16) -> ProbeConfig {
    ProbeConfig::builder("127.0.0.1")
        .transport(Transport::Http)
        .port(port)
        .login("devops", "s3cret")
        .build()
}

/// Self-signed certificate and key, PEM encoded.
struct Identity {
    cert_pem: String,
    key_pem: String,
}

impl Identity {
    fn generate(names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(names).unwrap();
        Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        }
    }

    fn write(&self) -> (tempfile::NamedTempFile, tempfile::NamedTempFile) {
        (pem_file(&self.cert_pem), pem_file(&self.key_pem))
    }
}

fn pem_file(pem: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(pem.as_bytes()).unwrap();
    file
}

/// HTTPS filer that only accepts `client` as a client identity.
async fn tls_filer(server: &Identity, client: &Identity) -> MockFiler {
    MockFiler::start_tls(
        MockReply::Version("9.10.1".to_string()),
        MockTls {
            cert_pem: server.cert_pem.clone().into_bytes(),
            key_pem: server.key_pem.clone().into_bytes(),
            client_ca_pem: client.cert_pem.clone().into_bytes(),
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_open_missing_cert_file() {
    let config = ProbeConfig::builder("127.0.0.1")
        .client_cert("/nonexistent/path_12345.pem")
        .client_key("/nonexistent/path_12345.key")
        .build();

    // Fails while loading credentials, before connecting anywhere
    let result = OntapConnector.open(&config).await;
    match result {
        Err(ProbeError::Config(msg)) => assert!(msg.contains("Failed to read client cert")),
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_open_rejects_invalid_config() {
    let config = ProbeConfig::builder("").login("devops", "pw").build();
    assert!(matches!(
        OntapConnector.open(&config).await,
        Err(ProbeError::Config(_))
    ));
}

#[tokio::test]
async fn test_invoke_version() {
    let filer = MockFiler::start(MockReply::Version("9.10.1".to_string()))
        .await
        .unwrap();

    let session = OntapConnector.open(&http_config(filer.port())).await.unwrap();
    let results = session
        .invoke(&SystemGetVersionRequest::new().into())
        .await
        .expect("invoke failed");

    assert!(results.is_passed());
    assert_eq!(results.child_get_string("version"), Some("9.10.1"));

    let requests = filer.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, ZAPI_PATH);
    assert!(request.body.contains("<system-get-version/>"));
    assert!(request.body.contains(r#"version="1.30""#));
    assert_eq!(
        request.header("content-type"),
        Some(r#"text/xml; charset="UTF-8""#)
    );
    // devops:s3cret
    assert_eq!(
        request.header("authorization"),
        Some("Basic ZGV2b3BzOnMzY3JldA==")
    );
}

#[tokio::test]
async fn test_invoke_failed_results() {
    let filer = MockFiler::start(MockReply::Failed {
        reason: "authorization failed".to_string(),
        errno: 13003,
    })
    .await
    .unwrap();

    let session = OntapConnector.open(&http_config(filer.port())).await.unwrap();
    let results = session
        .invoke(&NaElement::new("system-get-version"))
        .await
        .unwrap();

    assert_eq!(
        results.status(),
        &ResultsStatus::Failed {
            reason: "authorization failed".to_string(),
            errno: Some(13003),
        }
    );
}

#[tokio::test]
async fn test_invoke_http_error_is_failed_result() {
    let filer = MockFiler::start(MockReply::Http {
        status: 401,
        body: "Unauthorized".to_string(),
    })
    .await
    .unwrap();

    let session = OntapConnector.open(&http_config(filer.port())).await.unwrap();
    let results = session
        .invoke(&NaElement::new("system-get-version"))
        .await
        .unwrap();

    assert!(!results.is_passed());
    assert_eq!(
        results.reason(),
        Some("Server returned HTTP Error: 401 Unauthorized")
    );
}

#[tokio::test]
async fn test_invoke_garbage_body_is_protocol_error() {
    let filer = MockFiler::start(MockReply::Http {
        status: 200,
        body: "<html>not the api</html>".to_string(),
    })
    .await
    .unwrap();

    let session = OntapConnector.open(&http_config(filer.port())).await.unwrap();
    let err = session
        .invoke(&NaElement::new("system-get-version"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Protocol(_)));
}

#[tokio::test]
async fn test_invoke_connection_refused() {
    // Bind then drop to get a port with nothing listening
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let session = OntapConnector.open(&http_config(port)).await.unwrap();
    let err = session
        .invoke(&NaElement::new("system-get-version"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Connection(_)));
}

#[test]
fn test_session_debug_hides_credentials() {
    let session = OntapSession::new(http_config(8080)).unwrap();
    let debug = format!("{session:?}");
    assert!(debug.contains("127.0.0.1"));
    assert!(!debug.contains("s3cret"));
}

#[tokio::test]
async fn test_invoke_client_certificate_over_https() {
    let server = Identity::generate(&["127.0.0.1", "localhost"]);
    let client = Identity::generate(&["devops"]);
    let filer = tls_filer(&server, &client).await;
    let (cert, key) = client.write();

    // Defaults: HTTPS, CERTIFICATE style, server verification off
    let config = ProbeConfig::builder("127.0.0.1")
        .port(filer.port())
        .client_cert(cert.path())
        .client_key(key.path())
        .build();
    assert!(!config.verify_server_cert);

    let session = OntapConnector.open(&config).await.unwrap();
    let results = session
        .invoke(&SystemGetVersionRequest::new().into())
        .await
        .unwrap();

    assert_eq!(results.child_get_string("version"), Some("9.10.1"));
    let requests = filer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].client_certs, 1);
    assert_eq!(requests[0].header("authorization"), None);
}

#[tokio::test]
async fn test_invoke_verification_rejects_untrusted_server() {
    let server = Identity::generate(&["127.0.0.1", "localhost"]);
    let client = Identity::generate(&["devops"]);
    let filer = tls_filer(&server, &client).await;
    let (cert, key) = client.write();

    let config = ProbeConfig::builder("127.0.0.1")
        .port(filer.port())
        .client_cert(cert.path())
        .client_key(key.path())
        .verify_server_cert(true)
        .build();

    let session = OntapConnector.open(&config).await.unwrap();
    let err = session
        .invoke(&NaElement::new("system-get-version"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Tls(_)), "got {err:?}");
    assert!(filer.requests().is_empty());
}

#[tokio::test]
async fn test_invoke_verification_with_ca_bundle() {
    let server = Identity::generate(&["127.0.0.1", "localhost"]);
    let client = Identity::generate(&["devops"]);
    let filer = tls_filer(&server, &client).await;
    let (cert, key) = client.write();
    let ca = pem_file(&server.cert_pem);

    let config = ProbeConfig::builder("127.0.0.1")
        .port(filer.port())
        .client_cert(cert.path())
        .client_key(key.path())
        .verify_server_cert(true)
        .ca_cert(ca.path())
        .build();

    let session = OntapConnector.open(&config).await.unwrap();
    let results = session
        .invoke(&NaElement::new("system-get-version"))
        .await
        .unwrap();

    assert!(results.is_passed());
    assert_eq!(filer.requests()[0].client_certs, 1);
}

#[tokio::test]
async fn test_invoke_unknown_client_certificate_fails() {
    let server = Identity::generate(&["127.0.0.1"]);
    let trusted = Identity::generate(&["devops"]);
    let stranger = Identity::generate(&["intruder"]);
    let filer = tls_filer(&server, &trusted).await;
    let (cert, key) = stranger.write();

    let config = ProbeConfig::builder("127.0.0.1")
        .port(filer.port())
        .client_cert(cert.path())
        .client_key(key.path())
        .build();

    let session = OntapConnector.open(&config).await.unwrap();
    assert!(session
        .invoke(&NaElement::new("system-get-version"))
        .await
        .is_err());
    assert!(filer.requests().is_empty());
}
