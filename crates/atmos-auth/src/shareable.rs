//! Shareable (pre-signed) download URLs.
//!
//! A shareable URL grants anonymous `GET` access to one object until an
//! expiration time. The signature covers:
//!
//! ```text
//! "GET\n" + lowercase(resource) + "\n" + uid + "\n" + expires [+ "\n" + disposition]
//! ```
//!
//! and travels in the query string:
//!
//! ```text
//! ?uid=<uid>&expires=<epoch seconds>&signature=<signature>[&disposition=<disposition>]
//! ```

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::AuthError;
use crate::signer::Credentials;

/// Characters escaped in shareable URL query values (everything but RFC 3986 unreserved).
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the string a shareable URL signature covers.
#[must_use]
pub fn build_shareable_string_to_sign(
    resource: &str,
    uid: &str,
    expires: i64,
    disposition: Option<&str>,
) -> String {
    let mut s = format!("GET\n{}\n{uid}\n{expires}", resource.to_lowercase());
    if let Some(disposition) = disposition {
        s.push('\n');
        s.push_str(disposition);
    }
    s
}

/// Build the query string of a shareable URL for `resource` (the unencoded path).
///
/// # Errors
/// Returns [`AuthError::Expired`] when `expiration` is not after `now`.
pub fn presign_query(
    credentials: &Credentials,
    resource: &str,
    expiration: DateTime<Utc>,
    disposition: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let expires = expiration.timestamp();
    if expiration <= now {
        return Err(AuthError::Expired(expires));
    }

    let string_to_sign =
        build_shareable_string_to_sign(resource, credentials.uid(), expires, disposition);
    debug!(string_to_sign = %string_to_sign, "Built shareable URL string to sign");
    let signature = credentials.sign_bytes(string_to_sign.as_bytes());

    let mut query = format!(
        "uid={}&expires={expires}&signature={}",
        utf8_percent_encode(credentials.uid(), QUERY_ENCODE_SET),
        utf8_percent_encode(&signature, QUERY_ENCODE_SET),
    );
    if let Some(disposition) = disposition {
        query.push_str("&disposition=");
        query.push_str(&utf8_percent_encode(disposition, QUERY_ENCODE_SET).to_string());
    }
    Ok(query)
}

/// Verify a shareable URL's query string against `resource` (the unencoded path).
///
/// # Errors
/// Returns [`AuthError`] if a parameter is missing, the URL has expired, the
/// UID is not the credentials' UID, or the signature does not match.
pub fn verify_shareable(
    credentials: &Credentials,
    resource: &str,
    query: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let mut uid = None;
    let mut expires = None;
    let mut signature = None;
    let mut disposition = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
        match key {
            "uid" => uid = Some(value),
            "expires" => expires = Some(value),
            "signature" => signature = Some(value),
            "disposition" => disposition = Some(value),
            _ => {}
        }
    }

    let uid = uid.ok_or_else(|| AuthError::InvalidQueryParam("uid".to_owned()))?;
    let expires = expires
        .and_then(|e| e.parse::<i64>().ok())
        .ok_or_else(|| AuthError::InvalidQueryParam("expires".to_owned()))?;
    let signature = signature.ok_or_else(|| AuthError::InvalidQueryParam("signature".to_owned()))?;

    if uid != credentials.uid() {
        return Err(AuthError::UnknownUid(uid));
    }
    if expires <= now.timestamp() {
        return Err(AuthError::Expired(expires));
    }

    let string_to_sign =
        build_shareable_string_to_sign(resource, &uid, expires, disposition.as_deref());
    let expected = credentials.sign_bytes(string_to_sign.as_bytes());
    if signature.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(AuthError::SignatureDoesNotMatch)
    }
}
