//! Access tokens: server-issued, pre-authenticated upload/download URLs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifier::{ObjectId, ObjectPath};

/// Allowed content sizes for uploads through a token, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLengthRange {
    /// Minimum size in bytes.
    pub from: u64,
    /// Maximum size in bytes.
    pub to: u64,
}

/// A condition a browser form field must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Field name.
    pub name: String,
    /// Whether the field may be omitted.
    pub optional: bool,
    /// Conditions as `(operator, value)` pairs, e.g. `("eq", "x")`,
    /// `("starts-with", "img/")`, `("matches", "^a.*$")`.
    pub conditions: Vec<(String, String)>,
}

/// The policy attached to an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// When the token stops working.
    pub expiration: Option<DateTime<Utc>>,
    /// Number of uploads allowed.
    pub max_uploads: Option<u32>,
    /// Number of downloads allowed.
    pub max_downloads: Option<u32>,
    /// Source addresses (CIDR or host) allowed to use the token.
    pub source_allow: Vec<String>,
    /// Source addresses denied the token.
    pub source_deny: Vec<String>,
    /// Allowed upload size.
    pub content_length_range: Option<ContentLengthRange>,
    /// Form field constraints for browser uploads.
    pub form_fields: Vec<FormField>,
}

/// An access token as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The token ID (last segment of the token URL).
    pub id: String,
    /// The object the token grants access to, if bound to an ID.
    pub object_id: Option<ObjectId>,
    /// The namespace path the token grants access to, if bound to a path.
    pub path: Option<ObjectPath>,
    /// The owner of the token.
    pub uid: Option<String>,
    /// The token's policy, including remaining upload/download counts.
    pub policy: TokenPolicy,
}
