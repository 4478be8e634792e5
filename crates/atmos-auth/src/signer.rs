//! Request signing and verification.
//!
//! Every request carries `x-emc-uid` and `x-emc-signature`, where
//! `Signature = Base64(HMAC-SHA1(Base64Decode(SharedSecret), StringToSign))`
//! and `StringToSign` is built by [`crate::canonical`].

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use http::{HeaderMap, HeaderValue, Method};
use percent_encoding::percent_decode_str;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{
    EMC_HEADER_PREFIX, SIGNATURE_HEADER, latin1_decode, latin1_encode, normalize_space,
    string_to_sign_from_headers,
};
use crate::error::AuthError;

type HmacSha1 = Hmac<Sha1>;

/// The header carrying the caller's UID.
pub const UID_HEADER: &str = "x-emc-uid";

/// A UID and its decoded shared secret.
#[derive(Clone)]
pub struct Credentials {
    uid: String,
    key: Vec<u8>,
}

impl Credentials {
    /// Create credentials from a UID (`subtenant/user`) and a Base64 shared secret.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidSecret`] if the secret is not valid Base64.
    pub fn new(uid: impl Into<String>, shared_secret: &str) -> Result<Self, AuthError> {
        let key = BASE64
            .decode(shared_secret.trim())
            .map_err(|_| AuthError::InvalidSecret)?;
        Ok(Self {
            uid: uid.into(),
            key,
        })
    }

    /// The UID sent in `x-emc-uid`.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Compute `Base64(HMAC-SHA1(key, bytes))`.
    #[must_use]
    pub fn sign_bytes(&self, bytes: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(&self.key).expect("HMAC can accept any key length");
        mac.update(bytes);
        BASE64.encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Sign an outbound request in place.
///
/// Sets `x-emc-uid`, rewrites every `x-emc-*` value to its normalized form so
/// the wire value matches the signed one, and inserts `x-emc-signature`.
/// `resource` is the unencoded URL path; `query` is the raw query string.
///
/// # Errors
/// Returns [`AuthError::MissingHeader`] when the `Date` header is absent and
/// [`AuthError::NotLatin1`] when the UID cannot be sent as ISO-8859-1.
pub fn sign_request(
    credentials: &Credentials,
    method: &Method,
    resource: &str,
    query: Option<&str>,
    headers: &mut HeaderMap,
) -> Result<String, AuthError> {
    if !headers.contains_key(http::header::DATE) {
        return Err(AuthError::MissingHeader("date".to_owned()));
    }
    headers.remove(SIGNATURE_HEADER);
    let uid = HeaderValue::from_bytes(&latin1_encode(&credentials.uid)?)
        .map_err(|_| AuthError::UnknownUid(credentials.uid.clone()))?;
    headers.insert(UID_HEADER, uid);
    normalize_emc_headers(headers);

    let string_to_sign = string_to_sign_from_headers(method.as_str(), resource, query, headers)?;
    debug!(
        string_to_sign = %String::from_utf8_lossy(&string_to_sign),
        "Built Atmos string to sign"
    );

    let signature = credentials.sign_bytes(&string_to_sign);
    let value = HeaderValue::from_str(&signature).map_err(|_| AuthError::SignatureDoesNotMatch)?;
    headers.insert(SIGNATURE_HEADER, value);
    Ok(signature)
}

/// Verify a signed request as a server would.
///
/// The resource is taken from the percent-decoded URI path.
///
/// # Errors
/// Returns [`AuthError`] if the UID or signature header is missing, the UID
/// does not belong to `credentials`, or the signature does not match.
pub fn verify_request(
    credentials: &Credentials,
    parts: &http::request::Parts,
) -> Result<(), AuthError> {
    let uid = parts
        .headers
        .get(UID_HEADER)
        .map(|v| latin1_decode(v.as_bytes()))
        .ok_or_else(|| AuthError::MissingHeader(UID_HEADER.to_owned()))?;
    if uid != credentials.uid {
        return Err(AuthError::UnknownUid(uid));
    }

    let provided = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AuthError::MissingHeader(SIGNATURE_HEADER.to_owned()))?;

    let resource = percent_decode_str(parts.uri.path()).decode_utf8_lossy();
    let string_to_sign = string_to_sign_from_headers(
        parts.method.as_str(),
        &resource,
        parts.uri.query(),
        &parts.headers,
    )?;
    let expected = credentials.sign_bytes(&string_to_sign);

    if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
        debug!(uid = %uid, "Atmos signature verified");
        Ok(())
    } else {
        debug!(expected = %expected, provided = %provided, "Atmos signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

/// Rewrite every `x-emc-*` header value to its normalized form.
fn normalize_emc_headers(headers: &mut HeaderMap) {
    for (name, value) in headers.iter_mut() {
        if !name.as_str().starts_with(EMC_HEADER_PREFIX) {
            continue;
        }
        let raw = latin1_decode(value.as_bytes());
        let normalized = normalize_space(&raw);
        if normalized != raw {
            if let Some(v) = latin1_encode(&normalized)
                .ok()
                .and_then(|bytes| HeaderValue::from_bytes(&bytes).ok())
            {
                *value = v;
            }
        }
    }
}
