// SPDX-License-Identifier: MIT OR Apache-2.0

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;

use crate::config::ApiVersion;
use crate::error::{ProbeError, Result};

/// Namespace of the `<netapp>` envelope.
pub const NETAPP_NAMESPACE: &str = "http://www.netapp.com/filer/admin";

/// Error number reported for failures produced on the client side of the
/// call, such as an HTTP error status from the server.
pub const ERRNO_INTERNAL: i32 = 13001;

const DOCTYPE: &str = r#"netapp SYSTEM "file:/etc/netapp_filer.dtd""#;

/// A named API call with no arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaElement {
    name: String,
}

impl NaElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialize the element inside a `<netapp>` envelope for `version`.
    pub fn to_envelope(&self, version: ApiVersion) -> Result<String> {
        let version = version.to_string();
        let mut writer = Writer::new(Vec::new());

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::DocType(BytesText::from_escaped(DOCTYPE)))?;
        writer.write_event(Event::Start(BytesStart::new("netapp").with_attributes([
            ("version", version.as_str()),
            ("xmlns", NETAPP_NAMESPACE),
        ])))?;
        writer.write_event(Event::Empty(BytesStart::new(self.name.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new("netapp")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| ProbeError::Protocol(format!("Envelope is not UTF-8: {e}")))
    }
}

/// Results status attribute of a `<results>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsStatus {
    Passed,
    Failed {
        reason: String,
        errno: Option<i32>,
    },
}

/// The `<results>` element of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaResults {
    status: ResultsStatus,
    children: Vec<(String, String)>,
}

impl NaResults {
    /// A failed result produced locally rather than by the cluster.
    pub fn failed(errno: i32, reason: impl Into<String>) -> Self {
        Self {
            status: ResultsStatus::Failed {
                reason: reason.into(),
                errno: Some(errno),
            },
            children: Vec::new(),
        }
    }

    /// A passed result with the given string children.
    pub fn passed<I, K, V>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            status: ResultsStatus::Passed,
            children: children
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn status(&self) -> &ResultsStatus {
        &self.status
    }

    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == ResultsStatus::Passed
    }

    /// Failure reason, if the call failed.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            ResultsStatus::Failed { reason, .. } => Some(reason),
            ResultsStatus::Passed => None,
        }
    }

    /// Text of the first direct child named `name`.
    #[must_use]
    pub fn child_get_string(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parse the `<results>` element out of a response document.
    ///
    /// Children that themselves contain elements are skipped; only text
    /// children directly under `<results>` are kept.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut results: Option<NaResults> = None;
        // Depth below <results>: 1 is <results> itself, 2 its children.
        let mut depth = 0usize;
        let mut current: Option<(String, String)> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if depth == 0 {
                        if results.is_none() && e.local_name().as_ref() == b"results" {
                            results = Some(Self::from_start(&e)?);
                            depth = 1;
                        }
                    } else {
                        depth += 1;
                        if depth == 2 {
                            current = Some((element_name(&e), String::new()));
                        } else {
                            // Nested structure: not a flat string child.
                            current = None;
                        }
                    }
                }
                Event::Empty(e) => {
                    if depth == 0 {
                        if results.is_none() && e.local_name().as_ref() == b"results" {
                            results = Some(Self::from_start(&e)?);
                            break;
                        }
                    } else if depth == 1 {
                        if let Some(r) = results.as_mut() {
                            r.children.push((element_name(&e), String::new()));
                        }
                    }
                }
                Event::Text(t) => {
                    if depth == 2 {
                        if let Some((_, text)) = current.as_mut() {
                            text.push_str(&t.unescape()?);
                        }
                    }
                }
                Event::CData(c) => {
                    if depth == 2 {
                        if let Some((_, text)) = current.as_mut() {
                            text.push_str(&String::from_utf8_lossy(&c));
                        }
                    }
                }
                Event::End(_) => {
                    if depth > 0 {
                        if depth == 2 {
                            if let (Some(child), Some(r)) = (current.take(), results.as_mut()) {
                                r.children.push(child);
                            }
                        }
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if depth != 0 {
            return Err(ProbeError::Protocol(
                "Response ended inside <results>".to_string(),
            ));
        }
        results.ok_or_else(|| ProbeError::Protocol("No <results> element in response".to_string()))
    }

    fn from_start(e: &BytesStart<'_>) -> Result<Self> {
        let mut status = None;
        let mut reason = None;
        let mut errno = None;

        for attr in e.attributes() {
            let attr = attr.map_err(|e| ProbeError::Protocol(e.to_string()))?;
            let value: Cow<'_, str> = attr.unescape_value()?;
            match attr.key.local_name().as_ref() {
                b"status" => status = Some(value.into_owned()),
                b"reason" => reason = Some(value.into_owned()),
                b"errno" => errno = value.trim().parse::<i32>().ok(),
                _ => {}
            }
        }

        let status = match status.as_deref() {
            Some("passed") => ResultsStatus::Passed,
            Some("failed") => ResultsStatus::Failed {
                reason: reason.unwrap_or_default(),
                errno,
            },
            Some(other) => {
                return Err(ProbeError::Protocol(format!(
                    "Unknown results status '{other}'"
                )))
            }
            None => {
                return Err(ProbeError::Protocol(
                    "Results element has no status".to_string(),
                ))
            }
        };

        Ok(Self {
            status,
            children: Vec::new(),
        })
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}
