//! Domain model for the EMC Atmos / ECS object REST API.
//!
//! This crate holds the value types every other `atmos-*` crate shares:
//!
//! - [`identifier`] - [`ObjectId`], [`ObjectPath`], [`ObjectKey`] and the [`Identifier`] union
//! - [`metadata`] - [`Metadata`], [`MetadataList`], [`MetadataTag`], [`MetadataTags`]
//! - [`acl`] - [`Acl`], [`Grant`], [`Grantee`], [`Permission`]
//! - [`extent`] - byte ranges, including the [`Extent::ALL_CONTENT`] sentinel
//! - [`checksum`] - the running `x-emc-wschecksum` state
//! - [`types`] - listing pages and operation results
//! - [`token`] - access tokens and their policies
//! - [`error`] - the [`AtmosError`] taxonomy
//!
//! All of these are short-lived values built per call; none hold shared state.

pub mod acl;
pub mod checksum;
pub mod error;
pub mod extent;
pub mod identifier;
pub mod metadata;
pub mod token;
pub mod types;

pub use acl::{Acl, Grant, Grantee, GranteeType, Permission};
pub use checksum::{Checksum, ChecksumAlgorithm, ChecksumValue};
pub use error::{AtmosError, AtmosResult, OBJECT_NOT_FOUND_CODE, SIGNATURE_MISMATCH_CODE};
pub use extent::Extent;
pub use identifier::{Identifier, ObjectId, ObjectKey, ObjectPath};
pub use metadata::{Metadata, MetadataList, MetadataTag, MetadataTags};
pub use token::{AccessToken, ContentLengthRange, FormField, TokenPolicy};
pub use types::{
    DirectoryEntry, FileType, ListOptions, MultipartEntry, ObjectInfo, ObjectMetadata,
    ObjectResult, ObjectVersion, Page, PeriodInfo, Replica, ServiceInformation,
};
