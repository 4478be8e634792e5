//! HMAC-SHA1 request authentication for the Atmos object REST API.
//!
//! # Overview
//!
//! Atmos authenticates each request with a signature over a canonical string
//! built from the method, `Content-Type`, `Range`, `Date`, the lowercased
//! resource path and the sorted `x-emc-*` headers. This crate builds that
//! string, signs outbound requests, verifies inbound ones, and produces
//! shareable pre-signed URLs.
//!
//! # Usage
//!
//! ```rust
//! use atmos_auth::{Credentials, sign_request};
//! use http::{HeaderMap, Method};
//!
//! let credentials = Credentials::new("tenant/user", "LJLuryj6zs8ste6Y3jTGQp71xq0=").unwrap();
//! let mut headers = HeaderMap::new();
//! headers.insert(http::header::DATE, "Tue, 01 Jan 2013 00:00:00 GMT".parse().unwrap());
//! sign_request(&credentials, &Method::GET, "/rest/service", None, &mut headers).unwrap();
//! assert!(headers.contains_key("x-emc-signature"));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - String-to-sign construction and header normalization
//! - [`error`] - Authentication error types
//! - [`shareable`] - Shareable URL signing and verification
//! - [`signer`] - Credentials, request signing and verification

pub mod canonical;
pub mod error;
pub mod shareable;
pub mod signer;

pub use error::AuthError;
pub use shareable::{presign_query, verify_shareable};
pub use signer::{Credentials, UID_HEADER, sign_request, verify_request};
