// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process stand-in for a cluster management endpoint.
//!
//! [`MockFiler`] listens on a loopback port, answers every XML API POST with
//! a canned [`MockReply`] and records what it received. It speaks cleartext
//! HTTP by default; [`MockFiler::start_tls`] serves HTTPS and requires a
//! client certificate.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rustls::server::WebPkiClientVerifier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::client::tls::{load_pem_certs, load_pem_key};
use crate::error::{ProbeError, Result};

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// `status="passed"` with a `version` child.
    Version(String),
    /// `status="failed"` with the given reason and error number.
    Failed { reason: String, errno: i32 },
    /// Arbitrary status line and body.
    Http { status: u16, body: String },
}

impl MockReply {
    fn render(&self) -> (u16, String) {
        match self {
            MockReply::Version(version) => (200, version_response(version)),
            MockReply::Failed { reason, errno } => (200, failed_response(reason, *errno)),
            MockReply::Http { status, body } => (*status, body.clone()),
        }
    }
}

/// Server identity and client trust for [`MockFiler::start_tls`], all PEM.
#[derive(Debug, Clone)]
pub struct MockTls {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
    /// Certificates accepted as client identities.
    pub client_ca_pem: Vec<u8>,
}

/// A request as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Certificates the client presented; 0 over cleartext.
    pub client_certs: usize,
}

impl RecordedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct Shared {
    connections: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Loopback management endpoint serving one canned reply.
pub struct MockFiler {
    port: u16,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MockFiler {
    /// Bind to an ephemeral loopback port and serve cleartext HTTP.
    pub async fn start(reply: MockReply) -> Result<Self> {
        Self::bind(reply, None).await
    }

    /// Bind to an ephemeral loopback port and serve HTTPS, rejecting clients
    /// without a certificate signed by `tls.client_ca_pem`.
    pub async fn start_tls(reply: MockReply, tls: MockTls) -> Result<Self> {
        let acceptor = TlsAcceptor::from(Arc::new(server_config(&tls)?));
        Self::bind(reply, Some(acceptor)).await
    }

    async fn bind(reply: MockReply, acceptor: Option<TlsAcceptor>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let shared = Arc::new(Shared::default());

        let task = {
            let shared = shared.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    shared.connections.fetch_add(1, Ordering::SeqCst);
                    let shared = shared.clone();
                    let reply = reply.clone();
                    let acceptor = acceptor.clone();
                    tokio::spawn(async move {
                        match acceptor {
                            None => serve(stream, shared, reply, 0).await,
                            Some(acceptor) => match acceptor.accept(stream).await {
                                Ok(stream) => {
                                    let certs = stream
                                        .get_ref()
                                        .1
                                        .peer_certificates()
                                        .map_or(0, |certs| certs.len());
                                    serve(stream, shared, reply, certs).await;
                                }
                                Err(e) => {
                                    tracing::debug!(error = %e, "mock filer TLS handshake failed");
                                }
                            },
                        }
                    });
                }
            })
        };

        Ok(Self { port, shared, task })
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of TCP connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Requests fully received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockFiler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A passed `system-get-version` response document.
#[must_use]
pub fn version_response(version: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8' ?>\n\
         <!DOCTYPE netapp SYSTEM 'file:/etc/netapp_filer.dtd'>\n\
         <netapp version='1.30' xmlns='http://www.netapp.com/filer/admin'>\n\
         <results status=\"passed\"><is-clustered>true</is-clustered>\
         <version>{}</version></results></netapp>\n",
        quick_xml::escape::escape(version)
    )
}

/// A failed response document.
#[must_use]
pub fn failed_response(reason: &str, errno: i32) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8' ?>\n\
         <netapp version='1.30' xmlns='http://www.netapp.com/filer/admin'>\n\
         <results status=\"failed\" errno=\"{errno}\" reason=\"{}\"/></netapp>\n",
        quick_xml::escape::escape(reason)
    )
}

fn server_config(tls: &MockTls) -> Result<rustls::ServerConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut client_roots = rustls::RootCertStore::empty();
    for cert in load_pem_certs(&tls.client_ca_pem)? {
        client_roots.add(cert)?;
    }
    let verifier =
        WebPkiClientVerifier::builder_with_provider(Arc::new(client_roots), provider.clone())
            .build()
            .map_err(|e| ProbeError::Tls(format!("Failed to build client verifier: {e}")))?;

    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_client_cert_verifier(verifier)
        .with_single_cert(load_pem_certs(&tls.cert_pem)?, load_pem_key(&tls.key_pem)?)?;
    Ok(config)
}

async fn serve<S>(io: S, shared: Arc<Shared>, reply: MockReply, client_certs: usize)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request: Request<Incoming>| {
        let shared = shared.clone();
        let reply = reply.clone();
        async move { respond(request, &shared, &reply, client_certs).await }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(io), service)
        .await
    {
        tracing::debug!(error = %e, "mock filer connection failed");
    }
}

async fn respond(
    request: Request<Incoming>,
    shared: &Shared,
    reply: &MockReply,
    client_certs: usize,
) -> Result<Response<Full<Bytes>>> {
    let (parts, body) = request.into_parts();
    let body = body.collect().await?.to_bytes();

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        headers: parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
        client_certs,
    };
    if let Ok(mut requests) = shared.requests.lock() {
        requests.push(recorded);
    }

    let (status, body) = reply.render();
    let response = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/xml")
        .body(Full::new(Bytes::from(body)))?;
    Ok(response)
}
