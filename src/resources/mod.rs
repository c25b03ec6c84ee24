// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strongly typed wrappers for management API calls.
//!
//! Each request converts into an [`NaElement`](crate::api::NaElement); each
//! response is read out of a passed [`NaResults`](crate::api::NaResults).

mod system;

pub use system::{SystemGetVersionRequest, SystemGetVersionResponse};
