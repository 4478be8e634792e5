//! Error taxonomy for Atmos client operations.
//!
//! Every failure surfaces to the caller as an [`AtmosError`]. There is no
//! local recovery or retry layer: server-reported codes are parsed from the
//! XML error body and mapped onto the dedicated variants where one exists.

/// Atmos server error code reported when the request signature does not match.
pub const SIGNATURE_MISMATCH_CODE: u32 = 1032;

/// Atmos server error code reported when an object (or tag listing) is not found.
pub const OBJECT_NOT_FOUND_CODE: u32 = 1003;

/// Errors produced by the Atmos client and its codecs.
#[derive(Debug, thiserror::Error)]
pub enum AtmosError {
    /// The endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A network or I/O failure while talking to the server.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server returned an ESU error document.
    #[error("server error {code} (HTTP {status}): {message}")]
    Server {
        /// HTTP status code of the response.
        status: u16,
        /// Atmos error code from the `<Code>` element.
        code: u32,
        /// Message from the `<Message>` element.
        message: String,
    },

    /// The server returned an error status without a parseable ESU error body.
    #[error("HTTP error {status}: {reason}")]
    Http {
        /// HTTP status code of the response.
        status: u16,
        /// Canonical reason phrase for the status.
        reason: String,
    },

    /// The server rejected the request signature (code 1032).
    #[error("signature mismatch: {message}")]
    SignatureMismatch {
        /// Message reported by the server.
        message: String,
    },

    /// The requested object or listing does not exist (code 1003).
    #[error("not found: {message}")]
    NotFound {
        /// Message reported by the server.
        message: String,
    },

    /// A response body or header could not be parsed.
    #[error("failed to parse response: {message}")]
    Parse {
        /// What went wrong.
        message: String,
        /// The raw response body, kept for diagnosis.
        body: String,
    },

    /// The checksum computed locally does not match the one reported by the server.
    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        /// The checksum the server reported.
        expected: String,
        /// The checksum computed over the received content.
        actual: String,
    },

    /// A value did not match the required format (e.g. an object ID).
    #[error("invalid {kind} format: {value:?}")]
    InvalidFormat {
        /// The kind of value being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A request argument failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The request could not be signed.
    #[error("signing error: {0}")]
    Signing(String),
}

impl AtmosError {
    /// Build a [`AtmosError::Parse`] carrying the raw body.
    pub fn parse(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: body.into(),
        }
    }

    /// Map a server-reported error code onto the matching variant.
    #[must_use]
    pub fn from_server(status: u16, code: u32, message: String) -> Self {
        match code {
            SIGNATURE_MISMATCH_CODE => Self::SignatureMismatch { message },
            OBJECT_NOT_FOUND_CODE => Self::NotFound { message },
            _ => Self::Server {
                status,
                code,
                message,
            },
        }
    }

    /// The Atmos error code, if the error came from an ESU error document.
    #[must_use]
    pub fn server_code(&self) -> Option<u32> {
        match self {
            Self::Server { code, .. } => Some(*code),
            Self::SignatureMismatch { .. } => Some(SIGNATURE_MISMATCH_CODE),
            Self::NotFound { .. } => Some(OBJECT_NOT_FOUND_CODE),
            _ => None,
        }
    }
}

/// Convenience result type for Atmos operations.
pub type AtmosResult<T> = Result<T, AtmosError>;
