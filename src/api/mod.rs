// SPDX-License-Identifier: MIT OR Apache-2.0

//! Management API request and results elements.
//!
//! Only what a single parameterless call needs is modelled: an [`NaElement`]
//! naming the API, wrapped in the `<netapp>` envelope, and an [`NaResults`]
//! holding the results status and the flat string children of `<results>`.

mod envelope;

pub use envelope::{NaElement, NaResults, ResultsStatus, ERRNO_INTERNAL, NETAPP_NAMESPACE};

/// Path of the XML request servlet on the cluster management interface.
pub const ZAPI_PATH: &str = "/servlets/netapp.servlets.admin.XMLrequest_filer";
