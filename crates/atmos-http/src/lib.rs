//! HTTP layer for the Atmos object REST API.
//!
//! This crate sits between the wire and the typed model. It owns the
//! `x-emc-*` header contract but not the transport: requests come out as
//! `http::Request<Bytes>` and responses go in as status, headers and body.
//!
//! # Modules
//!
//! - [`headers`] - header names, [`EncodingMode`], and the metadata, tag,
//!   ACL, checksum and range codecs
//! - [`multipart`] - `multipart/byteranges` parsing for multi-extent reads
//! - [`request`] - [`AtmosRequest`], which stamps and signs outbound calls
//! - [`response`] - [`AtmosResponse`], error mapping and header extraction

pub mod headers;
pub mod multipart;
pub mod request;
pub mod response;

pub use headers::EncodingMode;
pub use multipart::{extract_boundary, parse_byteranges};
pub use request::{AtmosRequest, http_date};
pub use response::{
    AtmosResponse, continuation_token, listing_page, object_metadata, server_date,
};
