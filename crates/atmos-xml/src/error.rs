//! XML error types.

use atmos_model::AtmosError;

/// Errors that can occur while reading or writing Atmos XML documents.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error during XML writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// An error from quick-xml attribute handling.
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),

    /// An unexpected XML element was encountered.
    #[error("unexpected XML element: {0}")]
    UnexpectedElement(String),

    /// An error parsing a value from XML text content.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}

impl XmlError {
    /// Convert into an [`AtmosError::Parse`] that keeps the offending body.
    #[must_use]
    pub fn into_atmos(self, body: &[u8]) -> AtmosError {
        AtmosError::parse(self.to_string(), String::from_utf8_lossy(body))
    }
}

impl From<XmlError> for AtmosError {
    fn from(err: XmlError) -> Self {
        AtmosError::parse(err.to_string(), String::new())
    }
}
