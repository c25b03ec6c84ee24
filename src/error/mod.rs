// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// Everything that stops the probe before the cluster can report a result.
///
/// A cluster that answers with `status="failed"` is not an error; it is
/// reported through [`crate::probe::ProbeOutcome::Failed`].
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<rustls::Error> for ProbeError {
    fn from(e: rustls::Error) -> Self {
        ProbeError::Tls(e.to_string())
    }
}

impl From<hyper::Error> for ProbeError {
    fn from(e: hyper::Error) -> Self {
        ProbeError::Http(e.to_string())
    }
}

impl From<http::Error> for ProbeError {
    fn from(e: http::Error) -> Self {
        ProbeError::Http(e.to_string())
    }
}

impl From<quick_xml::Error> for ProbeError {
    fn from(e: quick_xml::Error) -> Self {
        ProbeError::Protocol(e.to_string())
    }
}

impl ProbeError {
    /// Short machine-friendly label used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Config(_) => "config",
            ProbeError::Io(_) => "io",
            ProbeError::Tls(_) => "tls",
            ProbeError::Connection(_) => "connection",
            ProbeError::Http(_) => "http",
            ProbeError::Protocol(_) => "protocol",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
