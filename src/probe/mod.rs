// SPDX-License-Identifier: MIT OR Apache-2.0

//! The version probe.
//!
//! [`run`] opens one session, sends one `system-get-version` request and
//! returns a [`ProbeOutcome`]. Nothing is printed and the process is not
//! exited here; the binary maps the outcome to stdout and an exit code.
//!
//! # Example
//!
//! ```no_run
//! use ontap_probe::client::OntapConnector;
//! use ontap_probe::config::ProbeConfig;
//! use ontap_probe::probe;
//!
//! # async fn example() {
//! let config = ProbeConfig::builder("cluster1.example.com")
//!     .client_cert("devops_cert.pem")
//!     .client_key("devops_cert.key")
//!     .build();
//!
//! let outcome = probe::run(&OntapConnector, &config).await;
//! if let Some(line) = outcome.stdout_line() {
//!     println!("{line}");
//! }
//! std::process::exit(outcome.exit_code().into());
//! # }
//! ```

use crate::api::{NaElement, ResultsStatus};
use crate::client::{Connector, Session};
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::resources::{SystemGetVersionRequest, SystemGetVersionResponse};
use crate::runtime::RequestSpan;

/// Exit status when the version was retrieved.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status when no answer could be obtained.
pub const EXIT_FAULT: u8 = 1;
/// Exit status when the cluster answered with a failed result.
pub const EXIT_REMOTE_FAILED: u8 = 2;

/// Result of one probe run.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The cluster reported its version.
    Version(String),
    /// The cluster answered but reported failure.
    Failed { reason: String, errno: Option<i32> },
    /// Configuration, credential, transport or decoding problem.
    Fault(ProbeError),
}

impl ProbeOutcome {
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            ProbeOutcome::Version(_) => EXIT_SUCCESS,
            ProbeOutcome::Failed { .. } => EXIT_REMOTE_FAILED,
            ProbeOutcome::Fault(_) => EXIT_FAULT,
        }
    }

    /// The line to print on stdout, if any. Faults print nothing there.
    #[must_use]
    pub fn stdout_line(&self) -> Option<String> {
        match self {
            ProbeOutcome::Version(version) => Some(format!("V: {version}")),
            ProbeOutcome::Failed { reason, .. } => Some(format!("Failed: {reason}")),
            ProbeOutcome::Fault(_) => None,
        }
    }
}

/// Open a session with `connector` and ask the cluster for its version.
///
/// Exactly one request is sent when the session opens; none otherwise.
pub async fn run<C: Connector>(connector: &C, config: &ProbeConfig) -> ProbeOutcome {
    match try_run(connector, config).await {
        Ok(outcome) => outcome,
        Err(e) => ProbeOutcome::Fault(e),
    }
}

async fn try_run<C: Connector>(connector: &C, config: &ProbeConfig) -> Result<ProbeOutcome> {
    let session = connector.open(config).await?;

    let request: NaElement = SystemGetVersionRequest::new().into();
    let span = RequestSpan::start(
        request.name(),
        format!("{}://{}", config.transport.scheme(), config.authority()),
    );

    let results = match session.invoke(&request).await {
        Ok(results) => results,
        Err(e) => {
            span.finish_error(&e);
            return Err(e);
        }
    };

    match results.status() {
        ResultsStatus::Passed => match SystemGetVersionResponse::try_from(&results) {
            Ok(response) => {
                span.finish_passed();
                Ok(ProbeOutcome::Version(response.version))
            }
            Err(e) => {
                span.finish_error(&e);
                Err(e)
            }
        },
        ResultsStatus::Failed { reason, errno } => {
            span.finish_failed(reason, *errno);
            Ok(ProbeOutcome::Failed {
                reason: reason.clone(),
                errno: *errno,
            })
        }
    }
}
