//! The async Atmos REST client.
//!
//! Every method issues exactly one request and waits for its response. There
//! is no retry: any failure is returned to the caller as an [`AtmosError`].

use atmos_auth::{Credentials, presign_query};
use atmos_http::headers::{
    FORCE, INCLUDE_META, LIMIT, OBJECT_ID, PATH, SYSTEM_TAGS, TAGS, TOKEN, USER_TAGS, UTF8,
    VERSION_OID, WSCHECKSUM, decode_checksum, decode_metadata, decode_tags, encode_acl,
    encode_metadata, encode_tags, range_header,
};
use atmos_http::request::encode_path;
use atmos_http::response::{apply_service_flags, listing_page};
use atmos_http::{
    AtmosRequest, AtmosResponse, EncodingMode, extract_boundary, object_metadata,
    parse_byteranges, server_date,
};
use atmos_model::{
    AccessToken, Acl, AtmosError, AtmosResult, Checksum, DirectoryEntry, Extent, Identifier,
    ListOptions, MetadataList, MetadataTag, MetadataTags, MultipartEntry, ObjectId, ObjectInfo,
    ObjectMetadata, ObjectPath, ObjectResult, ObjectVersion, Page, ServiceInformation,
    TokenPolicy,
};
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use http::Method;
use tracing::{debug, info};

use crate::balancer::LoadBalancer;
use crate::config::AtmosConfig;
use crate::content::ContentSource;
use crate::options::ObjectOptions;

const XML_CONTENT_TYPE: &str = "application/xml";

/// Client for one Atmos tenant.
///
/// Cheap to share behind an `Arc`; calls do not contend on anything but the
/// host rotation counter.
#[derive(Debug)]
pub struct AtmosClient {
    config: AtmosConfig,
    credentials: Credentials,
    balancer: LoadBalancer,
    http: reqwest::Client,
}

impl AtmosClient {
    /// Build a client from configuration.
    ///
    /// Idle connections are not pooled, so every call opens and releases
    /// its own connection.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an unusable configuration, a
    /// signing error for a malformed secret, or [`AtmosError::Connection`]
    /// if the HTTP client cannot be created.
    pub fn new(config: AtmosConfig) -> AtmosResult<Self> {
        config.validate()?;
        let credentials = config.credentials()?;
        let balancer = LoadBalancer::new(config.hosts.clone())?;
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()
            .map_err(|e| AtmosError::Connection(Box::new(e)))?;
        info!(
            hosts = ?balancer.hosts(),
            uid = %config.uid,
            encoding = %config.encoding,
            "Atmos client ready"
        );
        Ok(Self {
            config,
            credentials,
            balancer,
            http,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AtmosConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Create an object and return its ID.
    ///
    /// With no target the server assigns an ID only; a path or key target
    /// also names the object in the namespace. A checksum, when given, is
    /// fed the content and sent as `x-emc-wschecksum`.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an [`Identifier::Id`] target,
    /// since IDs are assigned by the server.
    pub async fn create_object(
        &self,
        target: Option<&Identifier>,
        content: ContentSource,
        options: &ObjectOptions,
        checksum: Option<&mut Checksum>,
    ) -> AtmosResult<ObjectId> {
        let request = match target {
            None => AtmosRequest::new(Method::POST, self.objects_resource()),
            Some(Identifier::Id(id)) => {
                return Err(AtmosError::Validation(format!(
                    "cannot create an object at an existing ID ({id})"
                )));
            }
            Some(target) => AtmosRequest::for_identifier(Method::POST, target, self.context()),
        };
        let body = content.into_bytes().await?;
        let request = self
            .with_object_options(request, options)
            .optional_header(WSCHECKSUM, update_checksum(checksum, &body))
            .body(body);

        let id = self.execute(request).await?.created_object_id()?;
        debug!(id = %id, "Created object");
        Ok(id)
    }

    /// Replace an object's content, or the bytes covered by `extent`.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn update_object(
        &self,
        id: &Identifier,
        content: ContentSource,
        extent: Option<Extent>,
        options: &ObjectOptions,
        checksum: Option<&mut Checksum>,
    ) -> AtmosResult<()> {
        let range = extent.map(|e| range_header(&[e])).transpose()?.flatten();
        let body = content.into_bytes().await?;
        let request = AtmosRequest::for_identifier(Method::PUT, id, self.context())
            .optional_header(http::header::RANGE.as_str(), range);
        let request = self
            .with_object_options(request, options)
            .optional_header(WSCHECKSUM, update_checksum(checksum, &body))
            .body(body);
        self.execute(request).await?;
        Ok(())
    }

    /// Read an object, or the bytes covered by `extent`.
    ///
    /// A checksum, when given, is fed the content and checked against the
    /// server's `x-emc-wschecksum` once it covers the whole object.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::ChecksumMismatch`] on a failed check, or a
    /// server error.
    pub async fn read_object(
        &self,
        id: &Identifier,
        extent: Option<Extent>,
        checksum: Option<&mut Checksum>,
    ) -> AtmosResult<Bytes> {
        let range = extent.map(|e| range_header(&[e])).transpose()?.flatten();
        let request = AtmosRequest::for_identifier(Method::GET, id, self.context())
            .optional_header(http::header::RANGE.as_str(), range);
        let response = self.execute(request).await?;

        if let Some(checksum) = checksum {
            checksum.update(&response.body);
            if let Some(expected) = decode_checksum(&response.headers)? {
                let complete = expected.offset == checksum.offset();
                checksum.set_expected(expected);
                if complete {
                    checksum.verify()?;
                }
            }
        }
        Ok(response.body)
    }

    /// Read an object into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] if the content does not fit.
    pub async fn read_object_into(
        &self,
        id: &Identifier,
        extent: Option<Extent>,
        buf: &mut [u8],
    ) -> AtmosResult<usize> {
        let data = self.read_object(id, extent, None).await?;
        copy_into(&data, buf)
    }

    /// Read several extents in one request.
    ///
    /// Parts come back in the order the server sends them. A single extent
    /// answered without a multipart body yields one part.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an empty or invalid extent
    /// list, or [`AtmosError::Parse`] for a malformed multipart body.
    pub async fn read_object_ranges(
        &self,
        id: &Identifier,
        extents: &[Extent],
    ) -> AtmosResult<Vec<MultipartEntry>> {
        let range = range_header(extents)?;
        let request = AtmosRequest::for_identifier(Method::GET, id, self.context())
            .optional_header(http::header::RANGE.as_str(), range);
        let response = self.execute(request).await?;

        let content_type = response.content_type().unwrap_or_default();
        if content_type
            .to_ascii_lowercase()
            .starts_with("multipart/byteranges")
        {
            let boundary = extract_boundary(&content_type)?;
            return parse_byteranges(&response.body, &boundary);
        }
        match extents {
            [only] => Ok(vec![MultipartEntry {
                content_type: if content_type.is_empty() {
                    atmos_http::request::DEFAULT_CONTENT_TYPE.to_owned()
                } else {
                    content_type
                },
                extent: *only,
                data: response.body,
            }]),
            _ => Err(AtmosError::parse(
                format!("expected a multipart/byteranges response, got {content_type:?}"),
                String::from_utf8_lossy(&response.body),
            )),
        }
    }

    /// Delete an object.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn delete_object(&self, id: &Identifier) -> AtmosResult<()> {
        self.execute(AtmosRequest::for_identifier(
            Method::DELETE,
            id,
            self.context(),
        ))
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    /// Fetch user and system metadata, ACL and content type in one `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn get_all_metadata(&self, id: &Identifier) -> AtmosResult<ObjectMetadata> {
        let request = self.with_encoding(AtmosRequest::for_identifier(
            Method::HEAD,
            id,
            self.context(),
        ));
        let response = self.execute(request).await?;
        Ok(object_metadata(&response.headers, self.config.encoding))
    }

    /// Fetch user metadata, optionally restricted to `tags`.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn get_user_metadata(
        &self,
        id: &Identifier,
        tags: Option<&MetadataTags>,
    ) -> AtmosResult<MetadataList> {
        self.get_metadata(id, "metadata/user", tags).await
    }

    /// Fetch system metadata, optionally restricted to `tags`.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn get_system_metadata(
        &self,
        id: &Identifier,
        tags: Option<&MetadataTags>,
    ) -> AtmosResult<MetadataList> {
        self.get_metadata(id, "metadata/system", tags).await
    }

    async fn get_metadata(
        &self,
        id: &Identifier,
        query: &str,
        tags: Option<&MetadataTags>,
    ) -> AtmosResult<MetadataList> {
        let request = AtmosRequest::for_identifier(Method::GET, id, self.context())
            .query(query)
            .optional_header(TAGS, tags.map(|t| self.encode_tag_names(t)));
        let response = self.execute(self.with_encoding(request)).await?;
        let mode = response.encoding(self.config.encoding);
        Ok(decode_metadata(&response.headers, mode))
    }

    /// Add or replace user metadata.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an empty list.
    pub async fn set_user_metadata(
        &self,
        id: &Identifier,
        metadata: &MetadataList,
    ) -> AtmosResult<()> {
        if metadata.is_empty() {
            return Err(AtmosError::Validation("no metadata to set".to_owned()));
        }
        let request = AtmosRequest::for_identifier(Method::POST, id, self.context())
            .query("metadata/user")
            .headers(encode_metadata(metadata, self.config.encoding));
        self.execute(request).await?;
        Ok(())
    }

    /// Delete the named user metadata.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] when no tag is given.
    pub async fn delete_user_metadata(
        &self,
        id: &Identifier,
        tags: &MetadataTags,
    ) -> AtmosResult<()> {
        if tags.is_empty() {
            return Err(AtmosError::Validation("no metadata tags to delete".to_owned()));
        }
        let request = AtmosRequest::for_identifier(Method::DELETE, id, self.context())
            .query("metadata/user")
            .header(TAGS, self.encode_tag_names(tags));
        self.execute(self.with_encoding(request)).await?;
        Ok(())
    }

    /// List the names of an object's user metadata.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn list_user_metadata_tags(&self, id: &Identifier) -> AtmosResult<MetadataTags> {
        let request = AtmosRequest::for_identifier(Method::GET, id, self.context())
            .query("metadata/tags");
        let response = self.execute(self.with_encoding(request)).await?;
        let mode = response.encoding(self.config.encoding);
        Ok(decode_tags(&response.headers, mode))
    }

    /// List listable tags directly under `parent`, or at the top level.
    ///
    /// # Errors
    ///
    /// Returns a server error.
    pub async fn get_listable_tags(
        &self,
        parent: Option<&str>,
        token: Option<&str>,
    ) -> AtmosResult<Page<MetadataTag>> {
        let mode = self.config.encoding;
        let request = AtmosRequest::new(Method::GET, self.objects_resource())
            .query("listabletags")
            .optional_header(TAGS, parent.map(|p| encode_tags([p], mode)))
            .optional_header(TOKEN, token);
        let response = self.execute(self.with_encoding(request)).await?;
        let mode = response.encoding(mode);
        let tags = decode_tags(&response.headers, mode);
        Ok(listing_page(tags.iter().cloned().collect(), &response.headers))
    }

    // -----------------------------------------------------------------------
    // ACL
    // -----------------------------------------------------------------------

    /// Fetch an object's ACL.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn get_acl(&self, id: &Identifier) -> AtmosResult<Acl> {
        let request = AtmosRequest::for_identifier(Method::GET, id, self.context()).query("acl");
        let response = self.execute(request).await?;
        Ok(atmos_http::headers::decode_acl(&response.headers))
    }

    /// Replace an object's ACL.
    ///
    /// # Errors
    ///
    /// Returns a server error, e.g. [`AtmosError::NotFound`].
    pub async fn set_acl(&self, id: &Identifier, acl: &Acl) -> AtmosResult<()> {
        let request = AtmosRequest::for_identifier(Method::POST, id, self.context())
            .query("acl")
            .headers(encode_acl(acl));
        self.execute(request).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// List one page of objects carrying a listable tag.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an empty tag, or
    /// [`AtmosError::NotFound`] when the tag does not exist.
    pub async fn list_objects(
        &self,
        tag: &str,
        options: &ListOptions,
    ) -> AtmosResult<Page<ObjectResult>> {
        if tag.trim().is_empty() {
            return Err(AtmosError::Validation("a tag is required".to_owned()));
        }
        let request = AtmosRequest::new(Method::GET, self.objects_resource())
            .header(TAGS, encode_tags([tag], self.config.encoding));
        let response = self
            .execute(self.with_list_options(request, options))
            .await?;
        let items = atmos_xml::parse_object_list(&response.body)?;
        Ok(listing_page(items, &response.headers))
    }

    /// List one page of a namespace directory.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] if `path` is not a directory path.
    pub async fn list_directory(
        &self,
        path: &ObjectPath,
        options: &ListOptions,
    ) -> AtmosResult<Page<DirectoryEntry>> {
        if !path.is_directory() {
            return Err(AtmosError::Validation(format!(
                "{path} is not a directory path"
            )));
        }
        let request =
            AtmosRequest::for_identifier(Method::GET, &path.clone().into(), self.context());
        let response = self
            .execute(self.with_list_options(request, options))
            .await?;
        let items = atmos_xml::parse_directory_listing(&response.body, path)?;
        Ok(listing_page(items, &response.headers))
    }

    // -----------------------------------------------------------------------
    // Namespace
    // -----------------------------------------------------------------------

    /// Move a namespace object to `destination`.
    ///
    /// Without `force` the call fails if the destination exists.
    ///
    /// # Errors
    ///
    /// Returns a server error.
    pub async fn rename(
        &self,
        source: &ObjectPath,
        destination: &ObjectPath,
        force: bool,
    ) -> AtmosResult<()> {
        let target = self.encode_path_header(destination.as_str().trim_start_matches('/'));
        let request =
            AtmosRequest::for_identifier(Method::POST, &source.clone().into(), self.context())
                .query("rename")
                .header(PATH, target)
                .optional_header(FORCE, force.then_some("true"));
        self.execute(self.with_encoding(request)).await?;
        debug!(source = %source, destination = %destination, "Renamed object");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    /// Snapshot an object as a new version and return the version's ID.
    ///
    /// # Errors
    ///
    /// Returns a server error.
    pub async fn version_object(&self, id: &Identifier) -> AtmosResult<ObjectId> {
        let request =
            AtmosRequest::for_identifier(Method::POST, id, self.context()).query("versions");
        self.execute(request).await?.created_object_id()
    }

    /// List one page of an object's versions.
    ///
    /// # Errors
    ///
    /// Returns a server error.
    pub async fn list_versions(
        &self,
        id: &Identifier,
        options: &ListOptions,
    ) -> AtmosResult<Page<ObjectVersion>> {
        let request =
            AtmosRequest::for_identifier(Method::GET, id, self.context()).query("versions");
        let response = self
            .execute(self.with_list_options(request, options))
            .await?;
        let items = atmos_xml::parse_versions(&response.body)?;
        Ok(listing_page(items, &response.headers))
    }

    /// Restore an object's content from one of its versions.
    ///
    /// # Errors
    ///
    /// Returns a server error.
    pub async fn restore_version(&self, id: &Identifier, version: &ObjectId) -> AtmosResult<()> {
        let request = AtmosRequest::for_identifier(Method::PUT, id, self.context())
            .query("versions")
            .header(VERSION_OID, version.as_str());
        self.execute(request).await?;
        Ok(())
    }

    /// Delete one version.
    ///
    /// # Errors
    ///
    /// Returns a server error.
    pub async fn delete_version(&self, version: &ObjectId) -> AtmosResult<()> {
        let request =
            AtmosRequest::for_identifier(Method::DELETE, &version.clone().into(), self.context())
                .query("versions");
        self.execute(request).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Information
    // -----------------------------------------------------------------------

    /// Fetch replica, retention and expiration details of an object.
    ///
    /// # Errors
    ///
    /// Returns a server error or [`AtmosError::Parse`].
    pub async fn get_object_info(&self, id: &Identifier) -> AtmosResult<ObjectInfo> {
        let request = AtmosRequest::for_identifier(Method::GET, id, self.context()).query("info");
        let response = self.execute(request).await?;
        atmos_xml::parse_object_info(&response.body)
    }

    /// Fetch the server version and capabilities.
    ///
    /// # Errors
    ///
    /// Returns a server error or [`AtmosError::Parse`].
    pub async fn get_service_information(&self) -> AtmosResult<ServiceInformation> {
        let response = self
            .execute(AtmosRequest::new(Method::GET, self.service_resource()))
            .await?;
        let mut info = atmos_xml::parse_service_information(&response.body)?;
        apply_service_flags(&mut info, &response.headers);
        Ok(info)
    }

    /// Seconds the server clock is ahead of the local clock.
    ///
    /// The result can be stored in [`AtmosConfig::server_offset_secs`] for
    /// clients created afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Parse`] if the response has no usable `Date`.
    pub async fn calculate_server_offset(&self) -> AtmosResult<i64> {
        let response = self
            .execute(AtmosRequest::new(Method::GET, self.service_resource()))
            .await?;
        let local = Utc::now();
        let server = server_date(&response.headers)
            .ok_or_else(|| AtmosError::parse("response has no valid Date header", ""))?;
        let offset = (server - local).num_seconds();
        debug!(offset, "Calculated server clock offset");
        Ok(offset)
    }

    // -----------------------------------------------------------------------
    // Shareable URLs and access tokens
    // -----------------------------------------------------------------------

    /// Build a pre-signed URL that grants anonymous `GET` until `expiration`.
    ///
    /// `disposition` is returned by the server as `Content-Disposition`.
    /// No request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for a key identifier or an
    /// expiration in the past.
    pub fn get_shareable_url(
        &self,
        id: &Identifier,
        expiration: DateTime<Utc>,
        disposition: Option<&str>,
    ) -> AtmosResult<String> {
        if let Identifier::Key(key) = id {
            return Err(AtmosError::Validation(format!(
                "shareable URLs cannot address keys ({key})"
            )));
        }
        let resource = id.resource_path(self.context());
        let query = presign_query(
            &self.credentials,
            &resource,
            expiration,
            disposition,
            self.now(),
        )?;
        Ok(format!(
            "{}{}?{query}",
            self.config.endpoint(self.balancer.next_host()),
            encode_path(&resource)
        ))
    }

    /// Create an access token and return its ID.
    ///
    /// A download token names an existing object as `target`; an upload
    /// token may name a path for the object it will create. `options`
    /// supplies metadata and ACL for uploaded objects.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for a key target.
    pub async fn create_access_token(
        &self,
        target: Option<&Identifier>,
        policy: Option<&TokenPolicy>,
        options: &ObjectOptions,
    ) -> AtmosResult<String> {
        let mut request = AtmosRequest::new(Method::POST, self.tokens_resource());
        match target {
            None => {}
            Some(Identifier::Id(id)) => request = request.header(OBJECT_ID, id.as_str()),
            Some(Identifier::Path(path)) => {
                request = request.header(PATH, self.encode_path_header(path.as_str()));
            }
            Some(Identifier::Key(key)) => {
                return Err(AtmosError::Validation(format!(
                    "access tokens cannot address keys ({key})"
                )));
            }
        }
        let mut request = self.with_object_options(request, options);
        if let Some(policy) = policy {
            request = request
                .content_type(XML_CONTENT_TYPE)
                .body(Bytes::from(atmos_xml::policy_to_xml(policy)?));
        }
        let token = self.execute(request).await?.created_token_id()?;
        debug!(token = %token, "Created access token");
        Ok(token)
    }

    /// Fetch an access token's target and policy.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an empty ID, or a server error.
    pub async fn get_access_token(&self, token_id: &str) -> AtmosResult<AccessToken> {
        let request =
            AtmosRequest::new(Method::GET, self.token_resource(token_id)?).query("info");
        let response = self.execute(request).await?;
        atmos_xml::parse_access_token(&response.body)
    }

    /// Revoke an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an empty ID, or a server error.
    pub async fn delete_access_token(&self, token_id: &str) -> AtmosResult<()> {
        self.execute(AtmosRequest::new(
            Method::DELETE,
            self.token_resource(token_id)?,
        ))
        .await?;
        Ok(())
    }

    /// List one page of the tenant's access tokens.
    ///
    /// # Errors
    ///
    /// Returns a server error or [`AtmosError::Parse`].
    pub async fn list_access_tokens(&self, options: &ListOptions) -> AtmosResult<Page<AccessToken>> {
        let request = AtmosRequest::new(Method::GET, self.tokens_resource());
        let response = self
            .execute(self.with_list_options(request, options))
            .await?;
        let items = atmos_xml::parse_access_tokens(&response.body)?;
        Ok(listing_page(items, &response.headers))
    }

    /// The anonymous URL through which an access token is used.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] for an empty ID.
    pub fn access_token_url(&self, token_id: &str) -> AtmosResult<String> {
        let resource = self.token_resource(token_id)?;
        Ok(format!(
            "{}{}",
            self.config.endpoint(self.balancer.next_host()),
            encode_path(&resource)
        ))
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    async fn execute(&self, request: AtmosRequest) -> AtmosResult<AtmosResponse> {
        let host = self.balancer.next_host();
        let method = request.method().clone();
        let resource = request.resource().to_owned();
        let http_request =
            request.into_http(&self.config.endpoint(host), &self.credentials, self.now())?;
        let http_request = reqwest::Request::try_from(http_request)
            .map_err(|e| AtmosError::InvalidUrl(e.to_string()))?;

        debug!(method = %method, host, resource = %resource, "Sending Atmos request");
        let response = self
            .http
            .execute(http_request)
            .await
            .map_err(|e| AtmosError::Connection(Box::new(e)))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| AtmosError::Connection(Box::new(e)))?;
        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            "Received Atmos response"
        );

        AtmosResponse::new(status, headers, body).check_status()
    }

    /// The local clock corrected by the configured server offset.
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        TimeDelta::try_seconds(self.config.server_offset_secs)
            .and_then(|offset| now.checked_add_signed(offset))
            .unwrap_or(now)
    }

    fn context(&self) -> &str {
        &self.config.context
    }

    fn objects_resource(&self) -> String {
        format!("{}/objects", self.context())
    }

    fn service_resource(&self) -> String {
        format!("{}/service", self.context())
    }

    fn tokens_resource(&self) -> String {
        format!("{}/accesstokens", self.context())
    }

    fn token_resource(&self, token_id: &str) -> AtmosResult<String> {
        let token_id = token_id.trim();
        if token_id.is_empty() || token_id.contains('/') {
            return Err(AtmosError::Validation(format!(
                "invalid access token ID {token_id:?}"
            )));
        }
        Ok(format!("{}/{token_id}", self.tokens_resource()))
    }

    fn encode_tag_names(&self, tags: &MetadataTags) -> String {
        encode_tags(tags.iter().map(|t| t.name.as_str()), self.config.encoding)
    }

    /// Paths in `x-emc-path` are percent-encoded in UTF-8 mode and sent as is otherwise.
    fn encode_path_header(&self, path: &str) -> String {
        match self.config.encoding {
            EncodingMode::Utf8 => EncodingMode::Utf8.encode(path),
            EncodingMode::Legacy => path.to_owned(),
        }
    }

    /// Ask for UTF-8 encoded metadata in the response.
    fn with_encoding(&self, request: AtmosRequest) -> AtmosRequest {
        let utf8 = self.config.encoding == EncodingMode::Utf8;
        request.optional_header(UTF8, utf8.then_some("true"))
    }

    fn with_object_options(&self, request: AtmosRequest, options: &ObjectOptions) -> AtmosRequest {
        let mut request = request.headers(encode_metadata(&options.metadata, self.config.encoding));
        if let Some(acl) = &options.acl {
            request = request.headers(encode_acl(acl));
        }
        if let Some(content_type) = &options.content_type {
            request = request.content_type(content_type.as_str());
        }
        request
    }

    fn with_list_options(&self, request: AtmosRequest, options: &ListOptions) -> AtmosRequest {
        let mut request = self
            .with_encoding(request)
            .optional_header(LIMIT, options.limit.filter(|l| *l > 0).map(|l| l.to_string()))
            .optional_header(TOKEN, options.token.as_deref());
        if options.include_metadata {
            request = request
                .header(INCLUDE_META, "true")
                .optional_header(
                    SYSTEM_TAGS,
                    options.system_tags.as_ref().map(|t| self.encode_tag_names(t)),
                )
                .optional_header(
                    USER_TAGS,
                    options.user_tags.as_ref().map(|t| self.encode_tag_names(t)),
                );
        }
        request
    }
}

/// Feed `body` to the checksum and return the header value to send.
fn update_checksum(checksum: Option<&mut Checksum>, body: &[u8]) -> Option<String> {
    checksum.map(|checksum| {
        checksum.update(body);
        checksum.current().to_string()
    })
}

/// Copy `data` to the front of `buf`, failing when it does not fit.
fn copy_into(data: &[u8], buf: &mut [u8]) -> AtmosResult<usize> {
    let buf_len = buf.len();
    let target = buf.get_mut(..data.len()).ok_or_else(|| {
        AtmosError::Validation(format!(
            "content of {} bytes does not fit a {buf_len}-byte buffer",
            data.len()
        ))
    })?;
    target.copy_from_slice(data);
    Ok(data.len())
}
