// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed wrappers for the system information APIs.

use crate::api::{NaElement, NaResults};
use crate::error::{ProbeError, Result};

// =============================================================================
// SystemGetVersion
// =============================================================================

/// Request for the cluster's software version. Takes no parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemGetVersionRequest;

impl SystemGetVersionRequest {
    /// API name on the wire.
    pub const API: &'static str = "system-get-version";

    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl From<SystemGetVersionRequest> for NaElement {
    fn from(_: SystemGetVersionRequest) -> Self {
        NaElement::new(SystemGetVersionRequest::API)
    }
}

/// Passed response to [`SystemGetVersionRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemGetVersionResponse {
    /// Version string as reported by the cluster.
    pub version: String,
}

impl TryFrom<&NaResults> for SystemGetVersionResponse {
    type Error = ProbeError;

    fn try_from(results: &NaResults) -> Result<Self> {
        if !results.is_passed() {
            return Err(ProbeError::Protocol(
                "Cannot read version from a failed result".to_string(),
            ));
        }
        let version = results.child_get_string("version").ok_or_else(|| {
            ProbeError::Protocol("Response is missing the 'version' field".to_string())
        })?;
        Ok(Self {
            version: version.to_string(),
        })
    }
}
