//! Response interpretation.
//!
//! Turns an HTTP status, headers and body into either a usable response or
//! the matching [`AtmosError`], and extracts the values Atmos returns in
//! headers: created IDs in `Location`, continuation tokens, the server clock
//! and capability flags.

use std::sync::LazyLock;

use atmos_model::{AtmosError, AtmosResult, ObjectId, ObjectMetadata, Page, ServiceInformation};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use regex::Regex;
use tracing::debug;

use crate::headers::{
    EncodingMode, FEATURES, SUPPORT_UTF8, TOKEN, decode_acl, decode_metadata, header_string,
};

static OBJECT_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/[0-9a-zA-Z]+/objects/([0-9a-f-]{44,})").expect("object location regex is valid")
});

static TOKEN_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/[0-9a-zA-Z]+/accesstokens/([0-9a-zA-Z-]+)")
        .expect("token location regex is valid")
});

/// A received response, body fully read.
#[derive(Debug, Clone)]
pub struct AtmosResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl AtmosResponse {
    /// Wrap a received response.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Pass successful responses through and map failures onto [`AtmosError`].
    ///
    /// An error status with an ESU error document becomes the variant for its
    /// code; anything else becomes [`AtmosError::Http`].
    ///
    /// # Errors
    ///
    /// Returns the mapped error for any 4xx or 5xx status.
    pub fn check_status(self) -> AtmosResult<Self> {
        if !(self.status.is_client_error() || self.status.is_server_error()) {
            return Ok(self);
        }
        let status = self.status.as_u16();
        match atmos_xml::parse_error(&self.body) {
            Some(document) => {
                debug!(status, code = document.code, "Atmos returned an error document");
                Err(atmos_xml::error_from_document(status, document))
            }
            None => Err(AtmosError::Http {
                status,
                reason: self
                    .status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .to_owned(),
            }),
        }
    }

    /// A header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        header_string(&self.headers, name)
    }

    /// The encoding metadata in this response uses.
    #[must_use]
    pub fn encoding(&self, requested: EncodingMode) -> EncodingMode {
        EncodingMode::for_response(&self.headers, requested)
    }

    /// The `Content-Type` of the response.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }

    /// The ID of a newly created object, from `Location`.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Parse`] if the header is missing or holds no ID.
    pub fn created_object_id(&self) -> AtmosResult<ObjectId> {
        let location = self.location()?;
        object_id_from_location(&location)
    }

    /// The ID of a newly created access token, from `Location`.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Parse`] if the header is missing or holds no ID.
    pub fn created_token_id(&self) -> AtmosResult<String> {
        let location = self.location()?;
        token_id_from_location(&location)
    }

    fn location(&self) -> AtmosResult<String> {
        self.header(http::header::LOCATION.as_str())
            .ok_or_else(|| AtmosError::parse("response has no Location header", ""))
    }
}

/// Extract the object ID from a `Location` such as `/rest/objects/<id>`.
///
/// ```
/// use atmos_http::response::object_id_from_location;
///
/// let id = object_id_from_location("/rest/objects/4ef49feaa106904c04ef4a066e778104f71a4c6d4a69").unwrap();
/// assert_eq!(id.as_str(), "4ef49feaa106904c04ef4a066e778104f71a4c6d4a69");
/// ```
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] if the location does not contain an ID.
pub fn object_id_from_location(location: &str) -> AtmosResult<ObjectId> {
    let captured = OBJECT_LOCATION
        .captures(location)
        .and_then(|c| c.get(1))
        .ok_or_else(|| AtmosError::parse("no object ID in Location header", location))?;
    ObjectId::new(captured.as_str())
}

/// Extract the token ID from a `Location` such as `/rest/accesstokens/<id>`.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] if the location does not contain a token ID.
pub fn token_id_from_location(location: &str) -> AtmosResult<String> {
    TOKEN_LOCATION
        .captures(location)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
        .ok_or_else(|| AtmosError::parse("no access token ID in Location header", location))
}

/// The continuation token of a listing; an empty token means the last page.
#[must_use]
pub fn continuation_token(headers: &HeaderMap) -> Option<String> {
    header_string(headers, TOKEN)
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

/// Pair listing results with the continuation token of their response.
#[must_use]
pub fn listing_page<T>(items: Vec<T>, headers: &HeaderMap) -> Page<T> {
    Page {
        items,
        token: continuation_token(headers),
    }
}

/// The server clock from the `Date` header.
#[must_use]
pub fn server_date(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let date = header_string(headers, http::header::DATE.as_str())?;
    DateTime::parse_from_rfc2822(date.trim())
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

/// Fill in the capability flags a `<Service>` response carries in headers.
pub fn apply_service_flags(info: &mut ServiceInformation, headers: &HeaderMap) {
    info.utf8_supported = header_string(headers, SUPPORT_UTF8)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    info.features = header_string(headers, FEATURES)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
}

/// Assemble the result of a `HEAD` on an object.
#[must_use]
pub fn object_metadata(headers: &HeaderMap, requested: EncodingMode) -> ObjectMetadata {
    let mode = EncodingMode::for_response(headers, requested);
    ObjectMetadata {
        metadata: decode_metadata(headers, mode),
        acl: decode_acl(headers),
        content_type: header_string(headers, http::header::CONTENT_TYPE.as_str()),
    }
}
