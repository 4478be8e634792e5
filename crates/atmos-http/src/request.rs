//! Outbound request construction.
//!
//! An [`AtmosRequest`] collects the method, unencoded resource path, raw
//! query, `x-emc-*` headers and body of one REST call. [`AtmosRequest::into_http`]
//! stamps the date, signs the request and produces an `http::Request` ready
//! for any HTTP client.

use atmos_auth::canonical::latin1_encode;
use atmos_auth::{Credentials, sign_request};
use atmos_model::{AtmosError, AtmosResult, Identifier};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use crate::headers::{EMC_DATE, HeaderPair, POOL};

/// Characters escaped in URL paths: everything but RFC 3986 unreserved and `/`.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Content type sent with bodies that have none of their own.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Format a timestamp as an RFC 1123 HTTP date.
///
/// ```
/// use atmos_http::request::http_date;
/// use chrono::DateTime;
///
/// let date = DateTime::from_timestamp(1_356_998_400, 0).unwrap();
/// assert_eq!(http_date(&date), "Tue, 01 Jan 2013 00:00:00 GMT");
/// ```
#[must_use]
pub fn http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Percent-encode a resource path for use in a URL. Slashes are kept.
#[must_use]
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// One REST call before signing.
#[derive(Debug, Clone)]
pub struct AtmosRequest {
    method: Method,
    resource: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    body: Bytes,
}

impl AtmosRequest {
    /// Start a request for an unencoded resource path such as `/rest/objects`.
    #[must_use]
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            query: None,
            headers: Vec::new(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Start a request addressing an object; key-addressed objects get `x-emc-pool`.
    #[must_use]
    pub fn for_identifier(method: Method, identifier: &Identifier, context: &str) -> Self {
        let request = Self::new(method, identifier.resource_path(context));
        match identifier.pool() {
            Some(pool) => request.header(POOL, pool),
            None => request,
        }
    }

    /// Set the raw query string (without `?`), e.g. `metadata/user`.
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Add a header when the value is present.
    #[must_use]
    pub fn optional_header(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// Add headers produced by the codecs.
    #[must_use]
    pub fn headers(mut self, pairs: impl IntoIterator<Item = HeaderPair>) -> Self {
        self.headers
            .extend(pairs.into_iter().map(|(name, value)| (name.to_owned(), value)));
        self
    }

    /// Set the `Content-Type`.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The unencoded resource path.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The raw query string.
    #[must_use]
    pub fn query_str(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The value of a header added so far.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Stamp, sign and build the HTTP request.
    ///
    /// `endpoint` is the scheme and authority, e.g. `http://atmos.example.com:80`.
    /// `Date` and `x-emc-date` are set from `date`. A body without a content
    /// type is sent as `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for a header value that cannot be
    /// sent, [`AtmosError::InvalidUrl`] for an unusable endpoint, or a signing
    /// error.
    pub fn into_http(
        self,
        endpoint: &str,
        credentials: &Credentials,
        date: DateTime<Utc>,
    ) -> AtmosResult<http::Request<Bytes>> {
        let mut headers = HeaderMap::new();
        let date = http_date(&date);
        insert_header(&mut headers, http::header::DATE.as_str(), &date)?;
        insert_header(&mut headers, EMC_DATE, &date)?;

        let content_type = self.content_type.or_else(|| {
            (!self.body.is_empty()).then(|| DEFAULT_CONTENT_TYPE.to_owned())
        });
        if let Some(content_type) = &content_type {
            insert_header(&mut headers, http::header::CONTENT_TYPE.as_str(), content_type)?;
        }
        for (name, value) in &self.headers {
            insert_header(&mut headers, name, value)?;
        }

        sign_request(
            credentials,
            &self.method,
            &self.resource,
            self.query.as_deref(),
            &mut headers,
        )?;

        let mut uri = format!(
            "{}{}",
            endpoint.trim_end_matches('/'),
            encode_path(&self.resource)
        );
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            uri.push('?');
            uri.push_str(query);
        }
        debug!(method = %self.method, uri = %uri, "Built Atmos request");

        let mut request = http::Request::builder()
            .method(self.method)
            .uri(&uri)
            .body(self.body)
            .map_err(|e| AtmosError::InvalidUrl(format!("{uri}: {e}")))?;
        *request.headers_mut() = headers;
        Ok(request)
    }
}

/// Append a header, carrying the value as ISO-8859-1 bytes.
fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> AtmosResult<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| AtmosError::Validation(format!("invalid header name {name:?}")))?;
    let bytes = latin1_encode(value).map_err(|_| {
        AtmosError::Validation(format!("value for header {name} is not ISO-8859-1"))
    })?;
    let header_value = HeaderValue::from_bytes(&bytes)
        .map_err(|_| AtmosError::Validation(format!("invalid value for header {name}")))?;
    headers.append(header_name, header_value);
    Ok(())
}
