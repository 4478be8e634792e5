//! Per-call options for writes.

use atmos_model::{Acl, Metadata, MetadataList};

/// Metadata, ACL and content type sent with a create, update or
/// access-token call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectOptions {
    /// User metadata to set.
    pub metadata: MetadataList,
    /// ACL to apply; `None` keeps the server default.
    pub acl: Option<Acl>,
    /// Content type of the body; defaults to `application/octet-stream`.
    pub content_type: Option<String>,
}

impl ObjectOptions {
    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.insert(metadata);
        self
    }

    /// Set the ACL.
    #[must_use]
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
