//! Authentication error types.

use atmos_model::AtmosError;

/// Errors that can occur while signing or verifying Atmos requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The shared secret is not valid Base64.
    #[error("Shared secret is not valid base64")]
    InvalidSecret,

    /// A header required for signing is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The `x-emc-uid` of a request does not match the expected credentials.
    #[error("Unknown uid: {0}")]
    UnknownUid(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// A shareable URL expiration lies in the past.
    #[error("Expiration {0} is in the past")]
    Expired(i64),

    /// A required query parameter of a shareable URL is missing or malformed.
    #[error("Missing or invalid query parameter: {0}")]
    InvalidQueryParam(String),

    /// A value to send in a header cannot be encoded as ISO-8859-1.
    #[error("Value is not ISO-8859-1: {0:?}")]
    NotLatin1(String),
}

impl From<AuthError> for AtmosError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SignatureDoesNotMatch => AtmosError::SignatureMismatch {
                message: err.to_string(),
            },
            AuthError::Expired(_) | AuthError::NotLatin1(_) => {
                AtmosError::Validation(err.to_string())
            }
            _ => AtmosError::Signing(err.to_string()),
        }
    }
}
