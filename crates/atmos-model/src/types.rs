//! Result and option types shared by the REST operations.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::acl::Acl;
use crate::extent::Extent;
use crate::identifier::{ObjectId, ObjectPath};
use crate::metadata::{MetadataList, MetadataTags};

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Options for listing calls.
///
/// The continuation token for the next page is returned in [`Page::token`];
/// feed it back through [`ListOptions::token`] until the server stops
/// returning one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of results per page (`x-emc-limit`); `None` lets the server decide.
    pub limit: Option<u32>,
    /// Continuation token from a previous page (`x-emc-token`).
    pub token: Option<String>,
    /// Return metadata along with each result (`x-emc-include-meta`).
    pub include_metadata: bool,
    /// Restrict returned system metadata to these tags.
    pub system_tags: Option<MetadataTags>,
    /// Restrict returned user metadata to these tags.
    pub user_tags: Option<MetadataTags>,
}

impl ListOptions {
    /// Options that request metadata with every result.
    #[must_use]
    pub fn with_metadata() -> Self {
        Self {
            include_metadata: true,
            ..Self::default()
        }
    }

    /// Continue from the given page's token.
    #[must_use]
    pub fn next_page<T>(&self, page: &Page<T>) -> Option<Self> {
        page.token.as_ref().map(|token| Self {
            token: Some(token.clone()),
            ..self.clone()
        })
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Results on this page.
    pub items: Vec<T>,
    /// Continuation token; `None` when this is the last page.
    pub token: Option<String>,
}

impl<T> Page<T> {
    /// Whether more results remain on the server.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.token.is_some()
    }
}

/// An object returned by a tag listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectResult {
    /// The object's ID.
    pub id: ObjectId,
    /// System and user metadata when requested, otherwise empty.
    pub metadata: MetadataList,
}

/// The kind of entry in a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// A regular object.
    Regular,
    /// A subdirectory.
    Directory,
}

impl FileType {
    /// The wire name used in `<FileType>`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Directory => "directory",
        }
    }
}

impl From<&str> for FileType {
    fn from(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("directory") {
            Self::Directory
        } else {
            Self::Regular
        }
    }
}

/// An entry of a namespace directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// The object's ID.
    pub id: ObjectId,
    /// Full path of the entry; directories end in `/`.
    pub path: ObjectPath,
    /// Regular object or directory.
    pub file_type: FileType,
    /// System and user metadata when requested, otherwise empty.
    pub metadata: MetadataList,
}

/// One version of a versioned object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    /// Version number, when reported.
    pub version_number: Option<u32>,
    /// The version's own object ID.
    pub id: ObjectId,
    /// Creation time of the version, when reported.
    pub itime: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Object information
// ---------------------------------------------------------------------------

/// Everything returned by a `HEAD` on an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// User and system metadata.
    pub metadata: MetadataList,
    /// The object's ACL.
    pub acl: Acl,
    /// The object's content type.
    pub content_type: Option<String>,
}

/// A physical replica of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    /// Replica identifier.
    pub id: String,
    /// Storage location name.
    pub location: String,
    /// `sync` or `async`.
    pub replica_type: String,
    /// Whether the replica is up to date.
    pub current: bool,
    /// Storage type, e.g. `Normal` or `Stripe`.
    pub storage_type: String,
}

/// Retention or expiration state of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInfo {
    /// Whether the policy is active.
    pub enabled: bool,
    /// When retention or expiration ends.
    pub end_at: Option<DateTime<Utc>>,
}

/// Storage details of an object (`?info`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// The object's ID.
    pub id: ObjectId,
    /// Replica selection policy.
    pub selection: Option<String>,
    /// Physical replicas.
    pub replicas: Vec<Replica>,
    /// Retention state.
    pub retention: Option<PeriodInfo>,
    /// Expiration state.
    pub expiration: Option<PeriodInfo>,
}

/// Information about the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInformation {
    /// The Atmos version string.
    pub atmos_version: String,
    /// Whether the server accepts UTF-8 encoded metadata.
    pub utf8_supported: bool,
    /// Optional features advertised by the server.
    pub features: Vec<String>,
}

impl ServiceInformation {
    /// Whether the server advertises a feature.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(feature))
    }
}

/// One part of a multi-range read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartEntry {
    /// The part's content type.
    pub content_type: String,
    /// Which bytes of the object this part holds.
    pub extent: Extent,
    /// The part content.
    pub data: Bytes,
}
