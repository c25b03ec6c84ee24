// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sessions against the cluster management endpoint.
//!
//! [`Connector`] opens a [`Session`] from a [`ProbeConfig`]; a session sends
//! one request element and returns the `<results>` element. [`OntapConnector`]
//! is the real implementation, speaking XML over HTTP(S) with either a client
//! certificate or basic authentication. Tests swap in their own connector.

pub(crate) mod tls;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONNECTION, CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::api::{NaElement, NaResults, ERRNO_INTERNAL, ZAPI_PATH};
use crate::config::{AuthStyle, ProbeConfig, Transport};
use crate::error::{ProbeError, Result};

const PROBE_USER_AGENT: &str = concat!("ontap-probe/", env!("CARGO_PKG_VERSION"));

/// An open, authenticated session.
#[async_trait]
pub trait Session: Send + Sync {
    /// Send `request` and return the results element.
    ///
    /// A cluster that answers with a failed status is `Ok`; `Err` means no
    /// usable answer was received.
    async fn invoke(&self, request: &NaElement) -> Result<NaResults>;
}

/// Opens sessions from connection parameters.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    async fn open(&self, config: &ProbeConfig) -> Result<Self::Session>;
}

/// Connector for the ONTAP XML management interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct OntapConnector;

#[async_trait]
impl Connector for OntapConnector {
    type Session = OntapSession;

    async fn open(&self, config: &ProbeConfig) -> Result<OntapSession> {
        OntapSession::new(config.clone())
    }
}

/// Session over HTTP(S).
///
/// Credentials are loaded when the session is created; the TCP connection is
/// made per request.
#[derive(Clone)]
pub struct OntapSession {
    config: ProbeConfig,
    tls: Option<TlsConnector>,
    authorization: Option<String>,
}

impl std::fmt::Debug for OntapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntapSession")
            .field("cluster", &self.config.cluster)
            .field("transport", &self.config.transport)
            .field("port", &self.config.port)
            .field("style", &self.config.style)
            .finish_non_exhaustive()
    }
}

impl OntapSession {
    /// Validate `config` and load its credentials.
    ///
    /// Certificate and key files are read here, so a missing or unreadable
    /// file fails before any network traffic.
    pub fn new(config: ProbeConfig) -> Result<Self> {
        config.validate()?;

        let tls = match config.transport {
            Transport::Https => {
                let tls_config = tls::client_config(&config)?;
                Some(TlsConnector::from(Arc::new(tls_config)))
            }
            Transport::Http => {
                if config.verify_server_cert {
                    tracing::warn!("verify_server_cert has no effect over HTTP");
                }
                None
            }
        };

        let authorization = match config.style {
            AuthStyle::Certificate => None,
            AuthStyle::Login => {
                let user = config.username.as_deref().unwrap_or_default();
                let password = config.password.as_deref().unwrap_or_default();
                let token = base64::engine::general_purpose::STANDARD
                    .encode(format!("{user}:{password}"));
                Some(format!("Basic {token}"))
            }
        };

        tracing::debug!(
            cluster = %config.cluster,
            transport = %config.transport,
            port = config.port,
            style = %config.style,
            verify_server_cert = config.verify_server_cert,
            "session configured"
        );

        Ok(Self {
            config,
            tls,
            authorization,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn build_request(&self, body: String) -> Result<Request<Full<Bytes>>> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(ZAPI_PATH)
            .header(HOST, self.config.authority())
            .header(CONTENT_TYPE, r#"text/xml; charset="UTF-8""#)
            .header(USER_AGENT, PROBE_USER_AGENT)
            .header(CONNECTION, "close");
        if let Some(auth) = &self.authorization {
            builder = builder.header(AUTHORIZATION, auth);
        }
        Ok(builder.body(Full::new(Bytes::from(body)))?)
    }

    /// Cluster host without IPv6 brackets.
    fn host(&self) -> &str {
        self.config
            .cluster
            .trim_start_matches('[')
            .trim_end_matches(']')
    }

    async fn connect_tcp(&self) -> Result<TcpStream> {
        TcpStream::connect((self.host(), self.config.port))
            .await
            .map_err(|e| {
                ProbeError::Connection(format!(
                    "Failed to connect to {}: {e}",
                    self.config.authority()
                ))
            })
    }

    async fn send<S>(&self, io: S, request: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes)>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;
        // The connection future drives the socket until the response body is read.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection closed with error");
            }
        });

        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        Ok((status, body))
    }
}

#[async_trait]
impl Session for OntapSession {
    async fn invoke(&self, request: &NaElement) -> Result<NaResults> {
        let body = request.to_envelope(self.config.api_version)?;
        let http_request = self.build_request(body)?;
        let tcp = self.connect_tcp().await?;

        let (status, body) = match &self.tls {
            Some(connector) => {
                let host = self.host();
                let server_name = ServerName::try_from(host.to_string()).map_err(|e| {
                    ProbeError::Config(format!("Invalid server name '{host}': {e}"))
                })?;
                let stream = connector
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| ProbeError::Tls(format!("TLS handshake failed: {e}")))?;
                self.send(stream, http_request).await?
            }
            None => self.send(tcp, http_request).await?,
        };

        if !status.is_success() {
            tracing::debug!(status = %status, "server returned HTTP error");
            return Ok(NaResults::failed(
                ERRNO_INTERNAL,
                format!("Server returned HTTP Error: {status}"),
            ));
        }

        let text = std::str::from_utf8(&body)
            .map_err(|e| ProbeError::Protocol(format!("Response is not UTF-8: {e}")))?;
        NaResults::from_xml(text)
    }
}

#[cfg(test)]
mod tests;
