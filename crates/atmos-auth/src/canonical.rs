//! Canonical string construction for Atmos request signatures.
//!
//! The string to sign has two halves with different encodings:
//!
//! ```text
//! HTTP-Verb + "\n" +
//! Content-Type + "\n" +
//! Range + "\n" +
//! Date + "\n" +
//! lowercase(resource) [+ "?" + query] + "\n"        <- UTF-8
//! x-emc-a:value + "\n" + ... + x-emc-z:value        <- ISO-8859-1
//! ```
//!
//! The `x-emc-*` header block is sorted by lowercased name and has no
//! trailing newline. It is encoded as ISO-8859-1 while the prefix is UTF-8;
//! servers compute the signature the same way, so the split encoding must be
//! reproduced byte for byte.

use std::collections::BTreeMap;

use http::HeaderMap;

use crate::error::AuthError;

/// Header-name prefix of the headers covered by the signature.
pub const EMC_HEADER_PREFIX: &str = "x-emc";

/// The signature header itself, never part of the signed block.
pub const SIGNATURE_HEADER: &str = "x-emc-signature";

/// Normalize a header value for signing.
///
/// Newlines are removed, then runs of spaces are collapsed until no double
/// space remains.
///
/// # Examples
///
/// ```
/// use atmos_auth::canonical::normalize_space;
///
/// assert_eq!(normalize_space("a    b\n c"), "a b c");
/// ```
#[must_use]
pub fn normalize_space(value: &str) -> String {
    let mut normalized = value.replace('\n', "");
    while normalized.contains("  ") {
        normalized = normalized.replace("  ", " ");
    }
    normalized
}

/// Encode a string as ISO-8859-1.
///
/// # Errors
/// Returns [`AuthError::NotLatin1`] if `value` holds a character above U+00FF.
pub fn latin1_encode(value: &str) -> Result<Vec<u8>, AuthError> {
    value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| AuthError::NotLatin1(value.to_owned())))
        .collect()
}

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same value.
#[must_use]
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Build the sorted `x-emc-*` header block from `(name, value)` pairs.
///
/// Names are lowercased; values are normalized with [`normalize_space`].
/// Repeated names have their values joined with `,`. The signature header is
/// skipped.
#[must_use]
pub fn build_emc_header_block<'a>(headers: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let mut emc: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if !name.starts_with(EMC_HEADER_PREFIX) || name == SIGNATURE_HEADER {
            continue;
        }
        emc.entry(name).or_default().push(normalize_space(&value));
    }

    emc.iter()
        .map(|(name, values)| format!("{name}:{}", values.join(",")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble the bytes to sign from the individual components.
///
/// Missing `content_type` and `range` contribute empty lines.
///
/// # Errors
/// Returns [`AuthError::NotLatin1`] if the header block is not ISO-8859-1.
///
/// # Examples
///
/// ```
/// use atmos_auth::canonical::build_string_to_sign;
///
/// let bytes = build_string_to_sign(
///     "GET",
///     None,
///     None,
///     "Tue, 01 Jan 2013 00:00:00 GMT",
///     "/rest/objects",
///     None,
///     "x-emc-uid:u",
/// )
/// .unwrap();
/// assert_eq!(
///     bytes,
///     b"GET\n\n\nTue, 01 Jan 2013 00:00:00 GMT\n/rest/objects\nx-emc-uid:u".to_vec()
/// );
/// ```
pub fn build_string_to_sign(
    method: &str,
    content_type: Option<&str>,
    range: Option<&str>,
    date: &str,
    resource: &str,
    query: Option<&str>,
    emc_header_block: &str,
) -> Result<Vec<u8>, AuthError> {
    let mut prefix = format!(
        "{method}\n{}\n{}\n{date}\n{}",
        content_type.unwrap_or_default(),
        range.unwrap_or_default(),
        resource.to_lowercase(),
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        prefix.push('?');
        prefix.push_str(query);
    }
    prefix.push('\n');

    let mut bytes = prefix.into_bytes();
    bytes.extend_from_slice(&latin1_encode(emc_header_block)?);
    Ok(bytes)
}

/// Build the bytes to sign for a request whose headers are already assembled.
///
/// Header values are read as ISO-8859-1, the encoding they travel in.
///
/// # Errors
/// See [`build_string_to_sign`].
pub fn string_to_sign_from_headers(
    method: &str,
    resource: &str,
    query: Option<&str>,
    headers: &HeaderMap,
) -> Result<Vec<u8>, AuthError> {
    let value_of = |name: http::header::HeaderName| {
        headers.get(name).map(|v| latin1_decode(v.as_bytes()))
    };
    let content_type = value_of(http::header::CONTENT_TYPE);
    let range = value_of(http::header::RANGE);
    let date = value_of(http::header::DATE).unwrap_or_default();

    let block = build_emc_header_block(
        headers
            .iter()
            .map(|(name, value)| (name.as_str(), latin1_decode(value.as_bytes()))),
    );

    build_string_to_sign(
        method,
        content_type.as_deref(),
        range.as_deref(),
        &date,
        resource,
        query,
        &block,
    )
}
