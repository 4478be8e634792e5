//! Access control lists.
//!
//! An [`Acl`] is a set of grants. Equality is set equality: two ACLs holding
//! the same grants compare equal regardless of the order they were added.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AtmosError;

/// Whether a grantee names a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GranteeType {
    /// A user (uid) grantee, sent in `x-emc-useracl`.
    User,
    /// A group grantee, sent in `x-emc-groupacl`.
    Group,
}

/// The subject of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grantee {
    kind: GranteeType,
    name: Cow<'static, str>,
}

impl Grantee {
    /// The well-known group covering everyone who is not the owner.
    pub const OTHER: Grantee = Grantee {
        kind: GranteeType::Group,
        name: Cow::Borrowed(Self::OTHER_NAME),
    };

    /// The name of the well-known "other" group.
    pub const OTHER_NAME: &str = "other";

    /// Create a grantee. A group named `other` is [`Grantee::OTHER`].
    ///
    /// The name is taken as given; use [`Grantee::try_new`] for untrusted input.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: GranteeType) -> Self {
        Self {
            kind,
            name: Cow::Owned(name.into()),
        }
    }

    /// Create a grantee, rejecting blank names.
    ///
    /// # Errors
    /// Returns [`AtmosError::Validation`] if `name` is empty or whitespace.
    pub fn try_new(name: impl Into<String>, kind: GranteeType) -> Result<Self, AtmosError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AtmosError::Validation(format!(
                "{kind:?} grantee name must not be empty"
            )));
        }
        Ok(Self::new(name, kind))
    }

    /// Create a user grantee.
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, GranteeType::User)
    }

    /// Create a group grantee.
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, GranteeType::Group)
    }

    /// The grantee name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a user or group grantee.
    #[must_use]
    pub fn kind(&self) -> GranteeType {
        self.kind
    }

    /// Whether this is the well-known "other" group.
    #[must_use]
    pub fn is_other(&self) -> bool {
        self.kind == GranteeType::Group && self.name == Self::OTHER_NAME
    }
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A permission granted on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Read access.
    Read,
    /// Write access.
    Write,
    /// Read, write and ACL modification.
    FullControl,
    /// Explicitly no access.
    None,
}

impl Permission {
    /// The canonical wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::FullControl => "FULL_CONTROL",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AtmosError;

    /// Parse a permission. The server's legacy alias `FULL` maps to `FULL_CONTROL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "READ" => Ok(Self::Read),
            "WRITE" => Ok(Self::Write),
            "FULL_CONTROL" | "FULL" => Ok(Self::FullControl),
            "NONE" => Ok(Self::None),
            _ => Err(AtmosError::InvalidFormat {
                kind: "permission",
                value: s.to_owned(),
            }),
        }
    }
}

/// A single grantee/permission pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    /// Who receives the permission.
    pub grantee: Grantee,
    /// The permission granted.
    pub permission: Permission,
}

impl Grant {
    /// Create a grant.
    #[must_use]
    pub fn new(grantee: Grantee, permission: Permission) -> Self {
        Self {
            grantee,
            permission,
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.grantee, self.permission)
    }
}

/// An unordered set of grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    grants: BTreeSet<Grant>,
}

impl Acl {
    /// Create an empty ACL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grant. Returns `false` if the same grant was already present.
    pub fn add(&mut self, grant: Grant) -> bool {
        self.grants.insert(grant)
    }

    /// Remove a grant. Returns `true` if it was present.
    pub fn remove(&mut self, grant: &Grant) -> bool {
        self.grants.remove(grant)
    }

    /// Whether the ACL holds this grant.
    #[must_use]
    pub fn contains(&self, grant: &Grant) -> bool {
        self.grants.contains(grant)
    }

    /// Iterate all grants.
    pub fn iter(&self) -> impl Iterator<Item = &Grant> {
        self.grants.iter()
    }

    /// Iterate the grants whose grantee is of `kind`.
    pub fn grants_of(&self, kind: GranteeType) -> impl Iterator<Item = &Grant> {
        self.grants.iter().filter(move |g| g.grantee.kind() == kind)
    }

    /// Number of grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether the ACL is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl FromIterator<Grant> for Acl {
    fn from_iter<I: IntoIterator<Item = Grant>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().collect(),
        }
    }
}
