// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup and per-call request logging.
//!
//! All diagnostics go to stderr so that stdout carries only the probe result.
//!
//! # Example
//!
//! ```ignore
//! use ontap_probe::runtime::{init_logging, LogLevel, RequestSpan};
//!
//! init_logging(Some(LogLevel::Debug));
//!
//! let span = RequestSpan::start("system-get-version", "cluster1:443");
//! // ... invoke ...
//! span.finish_passed();
//! ```

use std::fmt;
use std::io::IsTerminal;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

use crate::error::{ProbeError, Result};

const API_TARGET: &str = "ontap_probe::api";

/// Verbosity of stderr logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - most verbose.
    Trace,
    Debug,
    Info,
    /// Warn level - the default, quiet on success.
    #[default]
    Warn,
    /// Error level - only errors.
    Error,
    /// Disabled - no logging.
    Off,
}

impl LogLevel {
    /// Filter directive understood by `EnvFilter`.
    #[must_use]
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Level for a count of `-v` flags, starting from the default.
    #[must_use]
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" => Ok(LogLevel::Off),
            other => Err(ProbeError::Config(format!("Unknown log level '{other}'"))),
        }
    }
}

/// Install the stderr subscriber.
///
/// An explicit `level` wins; otherwise `RUST_LOG` is honoured, falling back
/// to `warn`. Calling this twice is harmless.
pub fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.directive()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::default().directive())),
    };

    let fmt_layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Timing and outcome logging for one API call.
#[derive(Debug)]
pub struct RequestSpan {
    api: String,
    target: String,
    start: Instant,
}

impl RequestSpan {
    /// Start tracking a call to `api` on `target`.
    #[must_use]
    pub fn start(api: impl Into<String>, target: impl Into<String>) -> Self {
        let span = Self {
            api: api.into(),
            target: target.into(),
            start: Instant::now(),
        };
        debug!(target: API_TARGET, api = %span.api, server = %span.target, "invoking");
        span
    }

    #[must_use]
    pub fn api(&self) -> &str {
        &self.api
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The call returned `status="passed"`.
    pub fn finish_passed(self) {
        info!(
            target: API_TARGET,
            api = %self.api,
            server = %self.target,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "passed"
        );
    }

    /// The call returned `status="failed"`.
    pub fn finish_failed(self, reason: &str, errno: Option<i32>) {
        warn!(
            target: API_TARGET,
            api = %self.api,
            server = %self.target,
            elapsed_ms = self.elapsed().as_millis() as u64,
            errno = errno.unwrap_or_default(),
            reason,
            "failed"
        );
    }

    /// No usable answer was received. The caller reports the error itself.
    pub fn finish_error(self, error: &ProbeError) {
        debug!(
            target: API_TARGET,
            api = %self.api,
            server = %self.target,
            elapsed_ms = self.elapsed().as_millis() as u64,
            kind = error.kind(),
            error = %error,
            "call did not complete"
        );
    }
}
