//! `x-emc-*` header names and the codecs for metadata, tags, ACLs,
//! checksums and byte ranges.
//!
//! Metadata travels as `name=value` pairs joined by `", "`:
//!
//! ```text
//! x-emc-meta: size=12, owner=alice
//! x-emc-listable-meta: color=blue
//! ```
//!
//! In [`EncodingMode::Utf8`] names and values are percent-encoded (space is
//! `%20`, never `+`) and `x-emc-utf8: true` is sent. In
//! [`EncodingMode::Legacy`] commas and newlines are stripped instead.

use std::fmt;
use std::str::FromStr;

use atmos_auth::canonical::latin1_decode;
use atmos_model::{
    Acl, AtmosError, ChecksumValue, Extent, Grant, Grantee, GranteeType, Metadata, MetadataList,
    MetadataTag, MetadataTags, Permission,
};
use http::HeaderMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Header names
// ---------------------------------------------------------------------------

/// Non-listable user metadata.
pub const META: &str = "x-emc-meta";
/// Listable user metadata.
pub const LISTABLE_META: &str = "x-emc-listable-meta";
/// Grants to users.
pub const USER_ACL: &str = "x-emc-useracl";
/// Grants to groups.
pub const GROUP_ACL: &str = "x-emc-groupacl";
/// Metadata tag names (selection, deletion, listing).
pub const TAGS: &str = "x-emc-tags";
/// Listable tag names.
pub const LISTABLE_TAGS: &str = "x-emc-listable-tags";
/// System metadata names to return.
pub const SYSTEM_TAGS: &str = "x-emc-system-tags";
/// User metadata names to return.
pub const USER_TAGS: &str = "x-emc-user-tags";
/// Pagination token.
pub const TOKEN: &str = "x-emc-token";
/// Page size.
pub const LIMIT: &str = "x-emc-limit";
/// Return metadata with listing results.
pub const INCLUDE_META: &str = "x-emc-include-meta";
/// Pool of a key-addressed object.
pub const POOL: &str = "x-emc-pool";
/// Whether metadata is percent-encoded UTF-8.
pub const UTF8: &str = "x-emc-utf8";
/// Running content checksum.
pub const WSCHECKSUM: &str = "x-emc-wschecksum";
/// Destination path of a rename.
pub const PATH: &str = "x-emc-path";
/// Overwrite the destination of a rename.
pub const FORCE: &str = "x-emc-force";
/// Version to restore or delete.
pub const VERSION_OID: &str = "x-emc-version-oid";
/// Object ID of a new version.
pub const OBJECT_ID: &str = "x-emc-objectid";
/// Request date covered by the signature.
pub const EMC_DATE: &str = "x-emc-date";
/// Expiration period in seconds.
pub const EXPIRATION_PERIOD: &str = "x-emc-expiration-period";
/// Retention period in seconds.
pub const RETENTION_PERIOD: &str = "x-emc-retention-period";
/// Server support for UTF-8 metadata.
pub const SUPPORT_UTF8: &str = "x-emc-support-utf8";
/// Optional server features.
pub const FEATURES: &str = "x-emc-features";

/// A header to send, as `(name, value)`.
pub type HeaderPair = (&'static str, String);

// ---------------------------------------------------------------------------
// EncodingMode
// ---------------------------------------------------------------------------

/// How metadata names and values are carried in headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Percent-encoded UTF-8, announced with `x-emc-utf8: true`.
    Utf8,
    /// Raw ISO-8859-1 with commas and newlines removed.
    #[default]
    Legacy,
}

impl EncodingMode {
    /// The configuration name of this mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Legacy => "legacy",
        }
    }

    /// The mode a response was encoded in: UTF-8 when it says so, otherwise `requested`.
    #[must_use]
    pub fn for_response(headers: &HeaderMap, requested: Self) -> Self {
        match header_string(headers, UTF8) {
            Some(v) if v.trim().eq_ignore_ascii_case("true") => Self::Utf8,
            _ => requested,
        }
    }

    /// Encode one metadata name or value.
    ///
    /// ```
    /// use atmos_http::headers::EncodingMode;
    ///
    /// assert_eq!(EncodingMode::Utf8.encode("a b,c"), "a%20b%2Cc");
    /// assert_eq!(EncodingMode::Legacy.encode("a b,c\n"), "a bc");
    /// ```
    #[must_use]
    pub fn encode(&self, value: &str) -> String {
        match self {
            Self::Utf8 => utf8_percent_encode(value, METADATA_ENCODE_SET).to_string(),
            Self::Legacy => value.replace([',', '\n'], ""),
        }
    }

    /// Decode one metadata name or value.
    #[must_use]
    pub fn decode(&self, value: &str) -> String {
        match self {
            Self::Utf8 => percent_decode_str(value).decode_utf8_lossy().into_owned(),
            Self::Legacy => value.to_owned(),
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncodingMode {
    type Err = AtmosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "true" => Ok(Self::Utf8),
            "legacy" | "latin1" | "false" => Ok(Self::Legacy),
            _ => Err(AtmosError::InvalidFormat {
                kind: "encoding mode",
                value: s.to_owned(),
            }),
        }
    }
}

/// Everything but ASCII alphanumerics and `.-*_` is escaped.
const METADATA_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'*')
    .remove(b'_');

/// Read a header as a string. Values are ISO-8859-1 on the wire.
#[must_use]
pub fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(name)
        .iter()
        .map(|v| latin1_decode(v.as_bytes()))
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Encode metadata into `x-emc-meta` / `x-emc-listable-meta` headers.
///
/// Empty groups are omitted. UTF-8 mode adds `x-emc-utf8: true`; retention
/// and expiration periods are sent when set.
#[must_use]
pub fn encode_metadata(metadata: &MetadataList, mode: EncodingMode) -> Vec<HeaderPair> {
    let join = |listable: bool| {
        metadata
            .iter()
            .filter(|m| m.is_listable() == listable)
            .map(|m| format!("{}={}", mode.encode(m.name()), mode.encode(m.value())))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut headers = Vec::new();
    let regular = join(false);
    if !regular.is_empty() {
        headers.push((META, regular));
    }
    let listable = join(true);
    if !listable.is_empty() {
        headers.push((LISTABLE_META, listable));
    }
    if let Some(period) = metadata.expiration_period {
        headers.push((EXPIRATION_PERIOD, period.to_string()));
    }
    if let Some(period) = metadata.retention_period {
        headers.push((RETENTION_PERIOD, period.to_string()));
    }
    if mode == EncodingMode::Utf8 {
        headers.push((UTF8, "true".to_owned()));
    }
    headers
}

/// Parse one metadata header value into `into`.
///
/// Entries are split on `,` and then on the first `=`; names are trimmed,
/// values are kept as sent.
pub fn decode_metadata_value(
    value: &str,
    listable: bool,
    mode: EncodingMode,
    into: &mut MetadataList,
) {
    for entry in value.split(',') {
        let (name, value) = entry.split_once('=').unwrap_or((entry, ""));
        let name = mode.decode(name.trim());
        if name.is_empty() {
            if !entry.trim().is_empty() {
                warn!(entry = %entry, "Ignoring metadata entry without a name");
            }
            continue;
        }
        into.insert(Metadata::new(name, mode.decode(value), listable));
    }
}

/// Decode user metadata from response headers.
#[must_use]
pub fn decode_metadata(headers: &HeaderMap, mode: EncodingMode) -> MetadataList {
    let mut metadata = MetadataList::new();
    if let Some(value) = header_string(headers, META) {
        decode_metadata_value(&value, false, mode, &mut metadata);
    }
    if let Some(value) = header_string(headers, LISTABLE_META) {
        decode_metadata_value(&value, true, mode, &mut metadata);
    }
    metadata
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Encode tag names as a comma-separated header value.
#[must_use]
pub fn encode_tags<'a>(names: impl IntoIterator<Item = &'a str>, mode: EncodingMode) -> String {
    names
        .into_iter()
        .map(|name| mode.encode(name))
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a comma-separated tag header, trimming entries and skipping empties.
pub fn decode_tags_value(value: &str, listable: bool, mode: EncodingMode, into: &mut MetadataTags) {
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        into.add(MetadataTag::new(mode.decode(name), listable));
    }
}

/// Decode `x-emc-tags` and `x-emc-listable-tags` from response headers.
#[must_use]
pub fn decode_tags(headers: &HeaderMap, mode: EncodingMode) -> MetadataTags {
    let mut tags = MetadataTags::new();
    if let Some(value) = header_string(headers, TAGS) {
        decode_tags_value(&value, false, mode, &mut tags);
    }
    if let Some(value) = header_string(headers, LISTABLE_TAGS) {
        decode_tags_value(&value, true, mode, &mut tags);
    }
    tags
}

// ---------------------------------------------------------------------------
// ACL
// ---------------------------------------------------------------------------

/// Encode an ACL. Both headers are always present, possibly empty.
#[must_use]
pub fn encode_acl(acl: &Acl) -> Vec<HeaderPair> {
    let join = |kind: GranteeType| {
        acl.grants_of(kind)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    vec![
        (USER_ACL, join(GranteeType::User)),
        (GROUP_ACL, join(GranteeType::Group)),
    ]
}

fn decode_acl_value(value: &str, kind: GranteeType, acl: &mut Acl) {
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, permission)) = entry.split_once('=') else {
            warn!(entry = %entry, "Ignoring ACL entry without a permission");
            continue;
        };
        let grant = Grantee::try_new(name.trim(), kind).and_then(|grantee| {
            permission
                .parse::<Permission>()
                .map(|permission| Grant::new(grantee, permission))
        });
        match grant {
            Ok(grant) => {
                acl.add(grant);
            }
            Err(err) => warn!(entry = %entry, error = %err, "Ignoring malformed ACL entry"),
        }
    }
}

/// Decode `x-emc-useracl` / `x-emc-groupacl` response headers.
#[must_use]
pub fn decode_acl(headers: &HeaderMap) -> Acl {
    let mut acl = Acl::new();
    if let Some(value) = header_string(headers, USER_ACL) {
        decode_acl_value(&value, GranteeType::User, &mut acl);
    }
    if let Some(value) = header_string(headers, GROUP_ACL) {
        decode_acl_value(&value, GranteeType::Group, &mut acl);
    }
    acl
}

// ---------------------------------------------------------------------------
// Checksum and range
// ---------------------------------------------------------------------------

/// Decode the `x-emc-wschecksum` response header, if present.
///
/// # Errors
///
/// Returns [`AtmosError::InvalidFormat`] for a malformed value.
pub fn decode_checksum(headers: &HeaderMap) -> Result<Option<ChecksumValue>, AtmosError> {
    header_string(headers, WSCHECKSUM)
        .map(|v| v.parse::<ChecksumValue>())
        .transpose()
}

/// Build a `Range` header value for one or more extents.
///
/// Returns `None` for a single [`Extent::ALL_CONTENT`].
///
/// ```
/// use atmos_http::headers::range_header;
/// use atmos_model::Extent;
///
/// let ranges = [Extent::new(0, 10).unwrap(), Extent::new(20, 5).unwrap()];
/// assert_eq!(range_header(&ranges).unwrap().as_deref(), Some("Bytes=0-9,20-24"));
/// assert_eq!(range_header(&[Extent::ALL_CONTENT]).unwrap(), None);
/// ```
///
/// # Errors
///
/// Returns [`AtmosError::Validation`] if no extent is given or
/// [`Extent::ALL_CONTENT`] is combined with other extents.
pub fn range_header(extents: &[Extent]) -> Result<Option<String>, AtmosError> {
    match extents {
        [] => Err(AtmosError::Validation("at least one extent is required".to_owned())),
        [only] if only.is_all_content() => Ok(None),
        _ if extents.iter().any(Extent::is_all_content) => Err(AtmosError::Validation(
            "the whole-object extent cannot be combined with other ranges".to_owned(),
        )),
        _ => Ok(Some(format!(
            "Bytes={}",
            extents
                .iter()
                .map(Extent::range_spec)
                .collect::<Vec<_>>()
                .join(",")
        ))),
    }
}
