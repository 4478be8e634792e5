//! XML layer for the Atmos object REST API.
//!
//! Atmos answers listing, info, service and access-token requests with small
//! XML documents, and reports failures as `<Error><Code/><Message/></Error>`.
//!
//! # Key components
//!
//! - [`AtmosDeserialize`] trait and [`from_xml`] for reading response documents
//! - [`AtmosSerialize`] trait and [`to_xml`] for writing documents, with
//!   [`policy_to_xml`] for access-token policies and [`error_to_xml`] for error bodies
//! - `parse_*` helpers returning model types, with failures mapped to
//!   [`AtmosError::Parse`] carrying the raw body
//!
//! Metadata names and values are returned exactly as they appear in the
//! document.

pub mod deserialize;
pub mod error;
pub mod serialize;

use atmos_model::{
    AccessToken, AtmosError, AtmosResult, DirectoryEntry, ObjectId, ObjectInfo, ObjectPath,
    ObjectResult, ObjectVersion, ServiceInformation,
};

pub use deserialize::{
    AccessTokenList, AtmosDeserialize, DirectoryListing, ErrorDocument, ListedEntry,
    ObjectIdList, ObjectList, VersionList, from_xml,
};
pub use error::XmlError;
pub use serialize::{AccessTokenListRef, AtmosSerialize, error_to_xml, policy_to_xml, to_xml};

/// Parse a response body, keeping the body in the error on failure.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] if the body is not the expected document.
pub fn parse_response<T: AtmosDeserialize>(body: &[u8]) -> AtmosResult<T> {
    from_xml(body).map_err(|e| e.into_atmos(body))
}

/// Parse every `<ObjectID>` in a response.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML or an invalid ID.
pub fn parse_object_ids(body: &[u8]) -> AtmosResult<Vec<ObjectId>> {
    parse_response::<ObjectIdList>(body).map(|list| list.0)
}

/// Parse a `ListVersionsResponse`.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML or an invalid ID.
pub fn parse_versions(body: &[u8]) -> AtmosResult<Vec<ObjectVersion>> {
    parse_response::<VersionList>(body).map(|list| list.0)
}

/// Parse a `ListObjectsResponse`.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML or a missing `<ObjectID>`.
pub fn parse_object_list(body: &[u8]) -> AtmosResult<Vec<ObjectResult>> {
    parse_response::<ObjectList>(body).map(|list| list.0)
}

/// Parse a `ListDirectoryResponse` for `directory`, resolving each entry's path.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML or missing entry fields.
pub fn parse_directory_listing(
    body: &[u8],
    directory: &ObjectPath,
) -> AtmosResult<Vec<DirectoryEntry>> {
    parse_response::<DirectoryListing>(body)?
        .0
        .into_iter()
        .map(|entry| entry.into_entry(directory).map_err(|e| e.into_atmos(body)))
        .collect()
}

/// Parse an ESU error document, returning `None` if the body is not one.
#[must_use]
pub fn parse_error(body: &[u8]) -> Option<ErrorDocument> {
    from_xml(body).ok()
}

/// Parse a `GetObjectInfoResponse`.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML.
pub fn parse_object_info(body: &[u8]) -> AtmosResult<ObjectInfo> {
    parse_response(body)
}

/// Parse a `<Service>` document. Capability flags are left unset.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML.
pub fn parse_service_information(body: &[u8]) -> AtmosResult<ServiceInformation> {
    parse_response(body)
}

/// Parse an `<access-token>` document.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML.
pub fn parse_access_token(body: &[u8]) -> AtmosResult<AccessToken> {
    parse_response(body)
}

/// Parse a `list-access-tokens-result` document.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] on malformed XML.
pub fn parse_access_tokens(body: &[u8]) -> AtmosResult<Vec<AccessToken>> {
    parse_response::<AccessTokenList>(body).map(|list| list.0)
}

/// Map an error document onto the matching [`AtmosError`] variant.
#[must_use]
pub fn error_from_document(status: u16, document: ErrorDocument) -> AtmosError {
    AtmosError::from_server(status, document.code, document.message)
}
