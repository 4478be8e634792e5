//! Atmos XML serialization.
//!
//! The client only sends one XML document, the access-token `<policy>`.
//! Access tokens and error documents can be written too, which is what a
//! server (or a test double of one) returns.

use std::io::{self, Write};

use atmos_model::{AccessToken, TokenPolicy};
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

use crate::error::XmlError;

/// Trait for serializing Atmos types to XML.
///
/// Implementors write their content as child elements inside the current
/// XML context; the root element is written by [`to_xml`].
pub trait AtmosSerialize {
    /// Serialize this value as XML child elements into the given writer.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if writing to the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as a complete XML document under `root_element`.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
pub fn to_xml<T: AtmosSerialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element(root_element)
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// Serialize an access-token policy as a `<policy>` document.
///
/// # Errors
///
/// Returns `XmlError` if serialization fails.
pub fn policy_to_xml(policy: &TokenPolicy) -> Result<Vec<u8>, XmlError> {
    to_xml("policy", policy)
}

/// Format an ESU error document.
///
/// ```
/// let xml = atmos_xml::error_to_xml(1003, "The requested object was not found.");
/// let xml = String::from_utf8(xml).unwrap();
/// assert!(xml.contains("<Code>1003</Code>"));
/// ```
#[must_use]
pub fn error_to_xml(code: u32, message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Err(e) = write_error_xml(&mut buf, code, message) {
        tracing::error!(error = %e, "failed to serialize Atmos error XML");
        buf.clear();
    }
    buf
}

fn write_error_xml(buf: &mut Vec<u8>, code: u32, message: &str) -> io::Result<()> {
    let mut writer = Writer::new(buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.create_element("Error").write_inner_content(|w| {
        write_text_element(w, "Code", &code.to_string())?;
        write_text_element(w, "Message", message)
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn write_optional_u32<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<u32>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, &v.to_string())?;
    }
    Ok(())
}

/// Timestamps are written as `2012-12-01T12:00:00.000Z`.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

// ---------------------------------------------------------------------------
// AtmosSerialize implementations
// ---------------------------------------------------------------------------

impl AtmosSerialize for TokenPolicy {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(expiration) = &self.expiration {
            write_text_element(writer, "expiration", &format_timestamp(expiration))?;
        }
        write_optional_u32(writer, "max-uploads", self.max_uploads)?;
        write_optional_u32(writer, "max-downloads", self.max_downloads)?;

        if !self.source_allow.is_empty() || !self.source_deny.is_empty() {
            writer.create_element("source").write_inner_content(|w| {
                for allow in &self.source_allow {
                    write_text_element(w, "allow", allow)?;
                }
                for deny in &self.source_deny {
                    write_text_element(w, "disallow", deny)?;
                }
                Ok(())
            })?;
        }

        if let Some(range) = &self.content_length_range {
            writer
                .create_element("content-length-range")
                .with_attribute(("from", range.from.to_string().as_str()))
                .with_attribute(("to", range.to.to_string().as_str()))
                .write_empty()?;
        }

        for field in &self.form_fields {
            let mut element = writer
                .create_element("form-field")
                .with_attribute(("name", field.name.as_str()));
            if field.optional {
                element = element.with_attribute(("optional", "true"));
            }
            if field.conditions.is_empty() {
                element.write_empty()?;
            } else {
                element.write_inner_content(|w| {
                    for (operator, value) in &field.conditions {
                        write_text_element(w, operator, value)?;
                    }
                    Ok(())
                })?;
            }
        }
        Ok(())
    }
}

impl AtmosSerialize for AccessToken {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "access-token-id", &self.id)?;
        self.policy.serialize_xml(writer)?;
        if let Some(path) = &self.path {
            write_text_element(writer, "path", path.as_str())?;
        }
        if let Some(id) = &self.object_id {
            write_text_element(writer, "object-id", id.as_str())?;
        }
        if let Some(uid) = &self.uid {
            write_text_element(writer, "uid", uid)?;
        }
        Ok(())
    }
}

/// Wrapper that writes a token list as `<access-tokens-list>` entries.
#[derive(Debug, Clone, Copy)]
pub struct AccessTokenListRef<'a>(pub &'a [AccessToken]);

impl AtmosSerialize for AccessTokenListRef<'_> {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer
            .create_element("access-tokens-list")
            .write_inner_content(|w| {
                for token in self.0 {
                    w.create_element("access-token")
                        .write_inner_content(|w| token.serialize_xml(w))?;
                }
                Ok(())
            })?;
        Ok(())
    }
}
