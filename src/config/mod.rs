// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection parameters for the management endpoint.
//!
//! [`ProbeConfig`] is the resolved, validated set of options used to open a
//! session. It is usually assembled from [`ProbeSettings`] layers (YAML file,
//! environment, command line) with [`ProbeSettings::resolve`].
//!
//! # Environment Variables
//!
//! The binary reads the following variables, overridden by matching flags:
//!
//! - `ONTAP_PROBE_CONFIG` - Path to a YAML settings file (default: `~/.ontap/probe.yaml`)
//! - `ONTAP_CLUSTER` - Cluster management host name or address
//! - `ONTAP_TRANSPORT` - `HTTPS` (default) or `HTTP`
//! - `ONTAP_PORT` - Port number (default: 443 for HTTPS, 80 for HTTP)
//! - `ONTAP_STYLE` - `CERTIFICATE` (default) or `LOGIN`
//! - `ONTAP_CERT` / `ONTAP_KEY` - Client certificate and private key (PEM)
//! - `ONTAP_CA` - CA bundle used when server verification is enabled
//! - `ONTAP_VERIFY_SERVER_CERT` - Verify the server certificate (default: false)
//! - `ONTAP_USER` / `ONTAP_PASSWORD` - Credentials for `LOGIN` style
//!
//! # Example
//!
//! ```
//! use ontap_probe::config::{AuthStyle, ProbeConfig, Transport};
//!
//! let config = ProbeConfig::builder("cluster1.example.com")
//!     .client_cert("devops_cert.pem")
//!     .client_key("devops_cert.key")
//!     .build();
//!
//! assert_eq!(config.transport, Transport::Https);
//! assert_eq!(config.port, 443);
//! assert_eq!(config.style, AuthStyle::Certificate);
//! assert!(!config.verify_server_cert);
//! assert!(config.validate().is_ok());
//! ```

mod settings;

pub use settings::{ProbeSettings, DEFAULT_SETTINGS_FILE, ENV_PROBE_CONFIG};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ProbeError, Result};

/// Wire transport used to reach the management endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Transport {
    /// Cleartext HTTP.
    Http,
    /// HTTP over TLS.
    #[default]
    Https,
}

impl Transport {
    /// Port used when none is configured.
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Transport::Http => 80,
            Transport::Https => 443,
        }
    }

    /// URL scheme for this transport.
    #[must_use]
    pub fn scheme(self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Https => "https",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => write!(f, "HTTP"),
            Transport::Https => write!(f, "HTTPS"),
        }
    }
}

impl FromStr for Transport {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HTTP" => Ok(Transport::Http),
            "HTTPS" => Ok(Transport::Https),
            other => Err(ProbeError::Config(format!(
                "Unknown transport '{other}' (expected HTTP or HTTPS)"
            ))),
        }
    }
}

impl TryFrom<String> for Transport {
    type Error = ProbeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Transport> for String {
    fn from(t: Transport) -> Self {
        t.to_string()
    }
}

/// How the session authenticates to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthStyle {
    /// TLS client certificate and private key.
    #[default]
    Certificate,
    /// HTTP basic authentication with a user name and password.
    Login,
}

impl fmt::Display for AuthStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStyle::Certificate => write!(f, "CERTIFICATE"),
            AuthStyle::Login => write!(f, "LOGIN"),
        }
    }
}

impl FromStr for AuthStyle {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CERTIFICATE" => Ok(AuthStyle::Certificate),
            "LOGIN" => Ok(AuthStyle::Login),
            other => Err(ProbeError::Config(format!(
                "Unknown style '{other}' (expected CERTIFICATE or LOGIN)"
            ))),
        }
    }
}

impl TryFrom<String> for AuthStyle {
    type Error = ProbeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<AuthStyle> for String {
    fn from(s: AuthStyle) -> Self {
        s.to_string()
    }
}

/// Management API version announced in the request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::new(1, 30)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ProbeError::Config(format!("Invalid API version '{s}' (expected MAJOR.MINOR)"));
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// Resolved connection parameters, fixed for the lifetime of one probe.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeConfig {
    /// Cluster management host name or address.
    pub cluster: String,
    pub transport: Transport,
    pub port: u16,
    pub style: AuthStyle,
    /// Client certificate (PEM), required for [`AuthStyle::Certificate`].
    pub cert_path: Option<PathBuf>,
    /// Client private key (PEM), required for [`AuthStyle::Certificate`].
    pub key_path: Option<PathBuf>,
    /// CA bundle used when `verify_server_cert` is set. Falls back to the
    /// webpki root set.
    pub ca_path: Option<PathBuf>,
    /// When false (the default) the server certificate is accepted without
    /// any verification. This is insecure and is logged as a warning.
    pub verify_server_cert: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_version: ApiVersion,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cluster: String::new(),
            transport: Transport::Https,
            port: Transport::Https.default_port(),
            style: AuthStyle::Certificate,
            cert_path: None,
            key_path: None,
            ca_path: None,
            verify_server_cert: false,
            username: None,
            password: None,
            api_version: ApiVersion::default(),
        }
    }
}

impl ProbeConfig {
    /// Start building a configuration for `cluster`.
    pub fn builder(cluster: impl Into<String>) -> ProbeConfigBuilder {
        ProbeConfigBuilder {
            config: ProbeConfig {
                cluster: cluster.into(),
                ..Default::default()
            },
            port: None,
        }
    }

    /// Check that the options are complete and consistent.
    ///
    /// Nothing is read from disk here; missing files surface when the
    /// session is opened.
    pub fn validate(&self) -> Result<()> {
        if self.cluster.trim().is_empty() {
            return Err(ProbeError::Config("No cluster configured".to_string()));
        }
        if self.port == 0 {
            return Err(ProbeError::Config("Port must be non-zero".to_string()));
        }
        if self.api_version.major == 0 {
            return Err(ProbeError::Config(format!(
                "Invalid API version {}",
                self.api_version
            )));
        }
        match self.style {
            AuthStyle::Certificate => {
                if self.transport == Transport::Http {
                    return Err(ProbeError::Config(
                        "CERTIFICATE style requires the HTTPS transport".to_string(),
                    ));
                }
                if self.cert_path.is_none() || self.key_path.is_none() {
                    return Err(ProbeError::Config(
                        "CERTIFICATE style requires both a client certificate and key".to_string(),
                    ));
                }
            }
            AuthStyle::Login => {
                if self.username.as_deref().unwrap_or("").is_empty() {
                    return Err(ProbeError::Config(
                        "LOGIN style requires a user name".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// `host:port` string used for logging and the `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.cluster.contains(':') && !self.cluster.starts_with('[') {
            format!("[{}]:{}", self.cluster, self.port)
        } else {
            format!("{}:{}", self.cluster, self.port)
        }
    }
}

/// Builder for [`ProbeConfig`].
#[derive(Debug, Clone)]
pub struct ProbeConfigBuilder {
    config: ProbeConfig,
    port: Option<u16>,
}

impl ProbeConfigBuilder {
    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.config.transport = transport;
        self
    }

    /// Override the port. Without this the transport's default is used.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn style(mut self, style: AuthStyle) -> Self {
        self.config.style = style;
        self
    }

    #[must_use]
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cert_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.key_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn verify_server_cert(mut self, verify: bool) -> Self {
        self.config.verify_server_cert = verify;
        self
    }

    /// Switch to `LOGIN` style with the given credentials.
    #[must_use]
    pub fn login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.style = AuthStyle::Login;
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.config.api_version = version;
        self
    }

    #[must_use]
    pub fn build(mut self) -> ProbeConfig {
        self.config.port = self
            .port
            .unwrap_or_else(|| self.config.transport.default_port());
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProbeConfig::default();
        assert_eq!(config.transport, Transport::Https);
        assert_eq!(config.port, 443);
        assert_eq!(config.style, AuthStyle::Certificate);
        assert!(!config.verify_server_cert);
        assert_eq!(config.api_version, ApiVersion::new(1, 30));
    }

    #[test]
    fn test_builder_port_follows_transport() {
        let config = ProbeConfig::builder("filer")
            .transport(Transport::Http)
            .login("admin", "secret")
            .build();
        assert_eq!(config.port, 80);

        let config = ProbeConfig::builder("filer")
            .transport(Transport::Http)
            .port(8080)
            .build();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_transport_parse() {
        assert_eq!("https".parse::<Transport>().unwrap(), Transport::Https);
        assert_eq!("HTTP".parse::<Transport>().unwrap(), Transport::Http);
        assert!("ftp".parse::<Transport>().is_err());
        assert_eq!(Transport::Https.to_string(), "HTTPS");
    }

    #[test]
    fn test_style_parse() {
        assert_eq!(
            "certificate".parse::<AuthStyle>().unwrap(),
            AuthStyle::Certificate
        );
        assert_eq!("LOGIN".parse::<AuthStyle>().unwrap(), AuthStyle::Login);
        assert!("HOSTS_EQUIV".parse::<AuthStyle>().is_err());
    }

    #[test]
    fn test_api_version_parse() {
        assert_eq!("1.30".parse::<ApiVersion>().unwrap(), ApiVersion::new(1, 30));
        assert_eq!(ApiVersion::new(1, 7).to_string(), "1.7");
        assert!("1".parse::<ApiVersion>().is_err());
        assert!("one.two".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_validate_certificate_style() {
        let config = ProbeConfig::builder("filer")
            .client_cert("c.pem")
            .client_key("k.pem")
            .build();
        assert!(config.validate().is_ok());

        let missing_key = ProbeConfig::builder("filer").client_cert("c.pem").build();
        assert!(matches!(
            missing_key.validate(),
            Err(ProbeError::Config(msg)) if msg.contains("certificate and key")
        ));

        let over_http = ProbeConfig::builder("filer")
            .transport(Transport::Http)
            .client_cert("c.pem")
            .client_key("k.pem")
            .build();
        assert!(over_http.validate().is_err());
    }

    #[test]
    fn test_validate_login_style() {
        let config = ProbeConfig::builder("filer").login("admin", "pw").build();
        assert!(config.validate().is_ok());

        let config = ProbeConfig::builder("filer").login("", "pw").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_cluster_and_zero_port() {
        let config = ProbeConfig::builder("  ")
            .client_cert("c.pem")
            .client_key("k.pem")
            .build();
        assert!(config.validate().is_err());

        let config = ProbeConfig::builder("filer")
            .port(0)
            .client_cert("c.pem")
            .client_key("k.pem")
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_authority() {
        let config = ProbeConfig::builder("10.0.0.5").build();
        assert_eq!(config.authority(), "10.0.0.5:443");

        let config = ProbeConfig::builder("fd00::5").port(8443).build();
        assert_eq!(config.authority(), "[fd00::5]:8443");
    }
}
