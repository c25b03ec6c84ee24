// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered probe settings
//!
//! A [`ProbeSettings`] holds every option as optional so that a YAML file,
//! the environment and the command line can each fill in what they know.
//! Layers are combined with [`ProbeSettings::merge`] and turned into a
//! [`ProbeConfig`] with [`ProbeSettings::resolve`].
//!
//! # Example
//!
//! ```
//! use ontap_probe::config::ProbeSettings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = ProbeSettings::from_yaml("cluster: cluster1\ncert: devops_cert.pem\nkey: devops_cert.key\n")?;
//! let flags = ProbeSettings {
//!     port: Some(8443),
//!     ..Default::default()
//! };
//!
//! let config = file.merge(flags).resolve()?;
//! assert_eq!(config.cluster, "cluster1");
//! assert_eq!(config.port, 8443);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{ApiVersion, AuthStyle, ProbeConfig, Transport};
use crate::error::{ProbeError, Result};

/// Environment variable naming the settings file.
pub const ENV_PROBE_CONFIG: &str = "ONTAP_PROBE_CONFIG";

/// Settings file looked up under the home directory when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = ".ontap/probe.yaml";

/// One layer of probe settings. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProbeSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<AuthStyle>,

    /// Client certificate path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<PathBuf>,

    /// Client private key path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,

    /// CA bundle path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_server_cert: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<ApiVersion>,
}

impl ProbeSettings {
    /// Load settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed YAML.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ProbeError::Config(format!(
                "Failed to read settings file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| ProbeError::Config(format!("Failed to parse settings YAML: {}", e)))
    }

    /// Default settings file path (`~/.ontap/probe.yaml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ProbeError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(DEFAULT_SETTINGS_FILE))
    }

    /// Load the settings file layer.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// only if it exists; otherwise an empty layer is returned.
    pub fn load_layer(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "loading settings file");
            return Self::load_from_path(path);
        }

        match Self::default_path() {
            Ok(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading default settings file");
                Self::load_from_path(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Overlay `higher` on top of `self`; fields set in `higher` win.
    #[must_use]
    pub fn merge(self, higher: ProbeSettings) -> Self {
        Self {
            cluster: higher.cluster.or(self.cluster),
            transport: higher.transport.or(self.transport),
            port: higher.port.or(self.port),
            style: higher.style.or(self.style),
            cert: higher.cert.or(self.cert),
            key: higher.key.or(self.key),
            ca: higher.ca.or(self.ca),
            verify_server_cert: higher.verify_server_cert.or(self.verify_server_cert),
            user: higher.user.or(self.user),
            password: higher.password.or(self.password),
            api_version: higher.api_version.or(self.api_version),
        }
    }

    /// Apply defaults and validate.
    pub fn resolve(self) -> Result<ProbeConfig> {
        let transport = self.transport.unwrap_or_default();
        let config = ProbeConfig {
            cluster: self.cluster.unwrap_or_default(),
            transport,
            port: self.port.unwrap_or_else(|| transport.default_port()),
            style: self.style.unwrap_or_default(),
            cert_path: self.cert,
            key_path: self.key,
            ca_path: self.ca,
            verify_server_cert: self.verify_server_cert.unwrap_or(false),
            username: self.user,
            password: self.password,
            api_version: self.api_version.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_SETTINGS: &str = r#"
cluster: svl-c01
transport: https
port: 443
style: CERTIFICATE
cert: /etc/ontap/devops_cert.pem
key: /etc/ontap/devops_cert.key
verify_server_cert: false
api_version:
  major: 1
  minor: 21
"#;

    #[test]
    fn test_parse_settings() {
        let settings = ProbeSettings::from_yaml(SAMPLE_SETTINGS).unwrap();

        assert_eq!(settings.cluster.as_deref(), Some("svl-c01"));
        assert_eq!(settings.transport, Some(Transport::Https));
        assert_eq!(settings.style, Some(AuthStyle::Certificate));
        assert_eq!(
            settings.cert,
            Some(PathBuf::from("/etc/ontap/devops_cert.pem"))
        );
        assert_eq!(settings.api_version, Some(ApiVersion::new(1, 21)));
    }

    #[test]
    fn test_empty_yaml_is_empty_layer() {
        assert_eq!(
            ProbeSettings::from_yaml("\n").unwrap(),
            ProbeSettings::default()
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ProbeSettings::from_yaml("cluster: a\nvserver: b\n").unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }

    #[test]
    fn test_bad_transport_rejected() {
        assert!(ProbeSettings::from_yaml("transport: ftp\n").is_err());
    }

    #[test]
    fn test_merge_prefers_higher_layer() {
        let file = ProbeSettings::from_yaml(SAMPLE_SETTINGS).unwrap();
        let flags = ProbeSettings {
            cluster: Some("other".to_string()),
            verify_server_cert: Some(true),
            ..Default::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.cluster.as_deref(), Some("other"));
        assert_eq!(merged.verify_server_cert, Some(true));
        assert_eq!(merged.port, Some(443));
        assert!(merged.key.is_some());
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let settings = ProbeSettings {
            cluster: Some("filer".to_string()),
            cert: Some("c.pem".into()),
            key: Some("k.pem".into()),
            ..Default::default()
        };

        let config = settings.resolve().unwrap();
        assert_eq!(config.port, 443);
        assert_eq!(config.transport, Transport::Https);
        assert_eq!(config.style, AuthStyle::Certificate);
        assert!(!config.verify_server_cert);
    }

    #[test]
    fn test_resolve_http_default_port() {
        let settings = ProbeSettings {
            cluster: Some("filer".to_string()),
            transport: Some(Transport::Http),
            style: Some(AuthStyle::Login),
            user: Some("admin".to_string()),
            ..Default::default()
        };

        assert_eq!(settings.resolve().unwrap().port, 80);
    }

    #[test]
    fn test_resolve_requires_cluster() {
        let settings = ProbeSettings {
            cert: Some("c.pem".into()),
            key: Some("k.pem".into()),
            ..Default::default()
        };
        assert!(settings.resolve().is_err());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_SETTINGS.as_bytes()).unwrap();

        let settings = ProbeSettings::load_layer(Some(file.path())).unwrap();
        assert_eq!(settings.cluster.as_deref(), Some("svl-c01"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = ProbeSettings::load_layer(Some(Path::new("/nonexistent/probe_12345.yaml")))
            .unwrap_err();
        match err {
            ProbeError::Config(msg) => assert!(msg.contains("Failed to read settings file")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }
}
