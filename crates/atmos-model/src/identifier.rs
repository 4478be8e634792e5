//! Resource locators for Atmos objects.
//!
//! An object can be addressed three ways, each mapping to its own URL path
//! template under the REST context (normally `/rest`):
//!
//! | Variant | Path | Extra header |
//! |---------|------|--------------|
//! | [`ObjectId`] | `{context}/objects/{id}` | |
//! | [`ObjectPath`] | `{context}/namespace{path}` | |
//! | [`ObjectKey`] | `{context}/namespace/{key}` | `x-emc-pool` |

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AtmosError;

static OBJECT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9a-f-]{44,}$").expect("static object id pattern"));

/// A server-assigned object identifier (44+ lowercase hex/hyphen characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create an object ID, validating its format.
    ///
    /// # Errors
    /// Returns [`AtmosError::InvalidFormat`] unless the string matches `^[0-9a-f-]{44,}$`.
    ///
    /// # Examples
    ///
    /// ```
    /// use atmos_model::ObjectId;
    ///
    /// assert!(ObjectId::new("0123456789abcdef0123456789abcdef0123456789ab").is_ok());
    /// assert!(ObjectId::new("not-valid").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, AtmosError> {
        let id = id.into();
        if !OBJECT_ID_PATTERN.is_match(&id) {
            return Err(AtmosError::InvalidFormat {
                kind: "object id",
                value: id,
            });
        }
        Ok(Self(id))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = AtmosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = AtmosError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// A path in the Atmos namespace. Paths ending in `/` denote directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Create a namespace path. The path must start with `/`.
    ///
    /// # Errors
    /// Returns [`AtmosError::InvalidFormat`] for an empty or relative path.
    pub fn new(path: impl Into<String>) -> Result<Self, AtmosError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(AtmosError::InvalidFormat {
                kind: "object path",
                value: path,
            });
        }
        Ok(Self(path))
    }

    /// Get the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this path names a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }

    /// The last path component, without a trailing slash.
    ///
    /// ```
    /// use atmos_model::ObjectPath;
    ///
    /// assert_eq!(ObjectPath::new("/a/b/c.txt").unwrap().name(), "c.txt");
    /// assert_eq!(ObjectPath::new("/a/b/").unwrap().name(), "b");
    /// assert_eq!(ObjectPath::new("/").unwrap().name(), "");
    /// ```
    #[must_use]
    pub fn name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or_default()
    }

    /// Build the path of a child entry of this directory.
    ///
    /// # Errors
    /// Returns [`AtmosError::Validation`] if this path is not a directory.
    pub fn child(&self, name: &str, directory: bool) -> Result<Self, AtmosError> {
        if !self.is_directory() {
            return Err(AtmosError::Validation(format!(
                "{} is not a directory path",
                self.0
            )));
        }
        let mut path = format!("{}{name}", self.0);
        if directory && !path.ends_with('/') {
            path.push('/');
        }
        Ok(Self(path))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectPath {
    type Err = AtmosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = AtmosError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}

/// A key inside a named pool (bucket), addressed through the namespace interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pool: String,
    key: String,
}

impl ObjectKey {
    /// Create a pool/key locator. Leading slashes on the key are dropped.
    ///
    /// # Errors
    /// Returns [`AtmosError::InvalidFormat`] if the pool or key is empty.
    pub fn new(pool: impl Into<String>, key: impl Into<String>) -> Result<Self, AtmosError> {
        let pool = pool.into();
        let key = key.into().trim_start_matches('/').to_owned();
        if pool.is_empty() {
            return Err(AtmosError::InvalidFormat {
                kind: "pool",
                value: pool,
            });
        }
        if key.is_empty() {
            return Err(AtmosError::InvalidFormat {
                kind: "object key",
                value: key,
            });
        }
        Ok(Self { pool, key })
    }

    /// The pool (bucket) name.
    #[must_use]
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// The key within the pool.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pool, self.key)
    }
}

/// Any of the three ways to address an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// Addressed by server-assigned ID.
    Id(ObjectId),
    /// Addressed by namespace path.
    Path(ObjectPath),
    /// Addressed by pool and key.
    Key(ObjectKey),
}

impl Identifier {
    /// The unencoded URL path of this resource under `context` (e.g. `/rest`).
    ///
    /// ```
    /// use atmos_model::{Identifier, ObjectPath};
    ///
    /// let id = Identifier::Path(ObjectPath::new("/photos/cat.jpg").unwrap());
    /// assert_eq!(id.resource_path("/rest"), "/rest/namespace/photos/cat.jpg");
    /// ```
    #[must_use]
    pub fn resource_path(&self, context: &str) -> String {
        match self {
            Self::Id(id) => format!("{context}/objects/{id}"),
            Self::Path(path) => format!("{context}/namespace{path}"),
            Self::Key(key) => format!("{context}/namespace/{}", key.key()),
        }
    }

    /// The pool header value required by key-addressed objects.
    #[must_use]
    pub fn pool(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key.pool()),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => id.fmt(f),
            Self::Path(path) => path.fmt(f),
            Self::Key(key) => key.fmt(f),
        }
    }
}

impl From<ObjectId> for Identifier {
    fn from(id: ObjectId) -> Self {
        Self::Id(id)
    }
}

impl From<ObjectPath> for Identifier {
    fn from(path: ObjectPath) -> Self {
        Self::Path(path)
    }
}

impl From<ObjectKey> for Identifier {
    fn from(key: ObjectKey) -> Self {
        Self::Key(key)
    }
}
