// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod probe;
pub mod resources;
pub mod runtime;
pub mod testkit;

pub use client::{Connector, OntapConnector, OntapSession, Session};
pub use config::{ProbeConfig, ProbeSettings};
pub use error::ProbeError;
pub use probe::ProbeOutcome;
