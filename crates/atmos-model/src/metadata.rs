//! User and system metadata.
//!
//! Metadata entries are `name=value` pairs attached to an object. Listable
//! entries are indexed by the server so objects can be listed by tag.

use serde::{Deserialize, Serialize};

/// A single metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    name: String,
    value: String,
    listable: bool,
}

impl Metadata {
    /// Create a metadata entry.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, listable: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            listable,
        }
    }

    /// The entry name. Names are immutable once created.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entry value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the entry value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Whether the server indexes this entry for tag listing.
    #[must_use]
    pub fn is_listable(&self) -> bool {
        self.listable
    }

    /// Change the listable flag.
    pub fn set_listable(&mut self, listable: bool) {
        self.listable = listable;
    }
}

/// A metadata name without a value, used to select or delete entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataTag {
    /// The tag name.
    pub name: String,
    /// Whether the tag is listable.
    pub listable: bool,
}

impl MetadataTag {
    /// Create a tag.
    #[must_use]
    pub fn new(name: impl Into<String>, listable: bool) -> Self {
        Self {
            name: name.into(),
            listable,
        }
    }
}

/// An ordered set of tag names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTags {
    tags: Vec<MetadataTag>,
}

impl MetadataTags {
    /// Create an empty tag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, replacing an existing tag with the same name.
    pub fn add(&mut self, tag: MetadataTag) {
        match self.tags.iter_mut().find(|t| t.name == tag.name) {
            Some(existing) => *existing = tag,
            None => self.tags.push(tag),
        }
    }

    /// Look up a tag by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetadataTag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Whether a tag with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate the tags in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, MetadataTag> {
        self.tags.iter()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<MetadataTag> for MetadataTags {
    fn from_iter<I: IntoIterator<Item = MetadataTag>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.add(tag);
        }
        tags
    }
}

impl<'a> IntoIterator for &'a MetadataTags {
    type Item = &'a MetadataTag;
    type IntoIter = std::slice::Iter<'a, MetadataTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// An ordered collection of metadata keyed by name.
///
/// Lookups are by name; iteration (and therefore header serialization)
/// follows insertion order. Inserting an existing name replaces the entry in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataList {
    entries: Vec<Metadata>,
    /// Expiration period in seconds, sent as `x-emc-expiration-period`.
    pub expiration_period: Option<i64>,
    /// Retention period in seconds, sent as `x-emc-retention-period`.
    pub retention_period: Option<i64>,
}

impl MetadataList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any entry with the same name.
    pub fn insert(&mut self, metadata: Metadata) {
        match self.entries.iter_mut().find(|m| m.name == metadata.name) {
            Some(existing) => *existing = metadata,
            None => self.entries.push(metadata),
        }
    }

    /// Look up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Metadata> {
        self.entries.iter().find(|m| m.name == name)
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Metadata> {
        self.entries.iter_mut().find(|m| m.name == name)
    }

    /// Remove and return the entry with this name.
    pub fn remove(&mut self, name: &str) -> Option<Metadata> {
        let pos = self.entries.iter().position(|m| m.name == name)?;
        Some(self.entries.remove(pos))
    }

    /// Shortcut for the value of an entry.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(Metadata::value)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Metadata> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every entry of `other`, replacing duplicates.
    pub fn extend(&mut self, other: MetadataList) {
        for metadata in other.entries {
            self.insert(metadata);
        }
    }

    /// The names of all entries as tags.
    #[must_use]
    pub fn tags(&self) -> MetadataTags {
        self.entries
            .iter()
            .map(|m| MetadataTag::new(m.name.clone(), m.listable))
            .collect()
    }
}

impl FromIterator<Metadata> for MetadataList {
    fn from_iter<I: IntoIterator<Item = Metadata>>(iter: I) -> Self {
        let mut list = Self::new();
        for metadata in iter {
            list.insert(metadata);
        }
        list
    }
}

impl<'a> IntoIterator for &'a MetadataList {
    type Item = &'a Metadata;
    type IntoIter = std::slice::Iter<'a, Metadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
