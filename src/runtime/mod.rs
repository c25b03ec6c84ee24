// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime utilities for observability.

mod logging;

pub use logging::{init_logging, LogLevel, RequestSpan};
