//! In-process Atmos server double.
//!
//! Keeps objects, namespace paths, versions and access tokens in memory and
//! verifies the signature of every request with the same credentials the
//! test clients use. Requests are recorded for assertions.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use atmos_auth::canonical::SIGNATURE_HEADER;
use atmos_auth::{Credentials, verify_request, verify_shareable};
use atmos_client::{AtmosClient, AtmosConfig};
use atmos_http::EncodingMode;
use atmos_http::headers::{
    FEATURES, FORCE, GROUP_ACL, INCLUDE_META, LIMIT, LISTABLE_TAGS, OBJECT_ID, PATH, POOL,
    SUPPORT_UTF8, TAGS, TOKEN, USER_ACL, UTF8, VERSION_OID, WSCHECKSUM, decode_acl,
    decode_metadata, encode_acl, encode_metadata, header_string,
};
use atmos_model::{
    AccessToken, Acl, Grant, Grantee, Metadata, MetadataList, ObjectId, ObjectPath, Permission,
    TokenPolicy,
};
use atmos_xml::{AccessTokenListRef, error_to_xml, to_xml};
use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use http::request::Parts;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use quick_xml::escape::escape;
use tokio::net::TcpListener;
use tracing::{debug, warn};

/// UID every mock server accepts.
pub const UID: &str = "tenant/user";

/// Shared secret every mock server accepts.
pub const SECRET: &str = "LJLuryj6zs8ste6Y3jTGQp71xq0=";

/// Boundary used for multi-range responses.
pub const BOUNDARY: &str = "bound1234";

type MockResponse = Response<Full<Bytes>>;

/// A request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: http::Method,
    /// Percent-decoded path.
    pub path: String,
    /// Raw query string.
    pub query: Option<String>,
    /// Request headers.
    pub headers: http::HeaderMap,
}

impl RecordedRequest {
    /// A header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        header_string(&self.headers, name)
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    metadata: MetadataList,
    acl: Acl,
    content_type: String,
    checksum: Option<String>,
    versions: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    objects: BTreeMap<String, StoredObject>,
    paths: BTreeMap<String, String>,
    tokens: BTreeMap<String, AccessToken>,
    next_id: u64,
    clock_skew_secs: i64,
    fail_next: Option<(StatusCode, Option<u32>)>,
    requests: Vec<RecordedRequest>,
}

impl MockState {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        format!("4ef49feaa106904c04ef4a066e7781{:014x}", self.next_id)
    }

    fn insert_object(&mut self, object: StoredObject) -> String {
        let id = self.new_id();
        self.objects.insert(id.clone(), object);
        id
    }

    /// Register every missing parent directory of `path`.
    fn ensure_parents(&mut self, path: &str) {
        let mut parent = parent_of(path);
        while let Some(dir) = parent {
            if dir == "/" || self.paths.contains_key(dir) {
                break;
            }
            let id = self.insert_object(StoredObject::directory());
            self.paths.insert(dir.to_owned(), id);
            parent = parent_of(dir);
        }
    }
}

impl StoredObject {
    fn directory() -> Self {
        Self {
            data: Vec::new(),
            metadata: MetadataList::new(),
            acl: default_acl(),
            content_type: "directory".to_owned(),
            checksum: None,
            versions: Vec::new(),
        }
    }

    fn system_metadata(&self, id: &str) -> MetadataList {
        let mut list = MetadataList::new();
        list.insert(Metadata::new("objectid", id, false));
        list.insert(Metadata::new("size", self.data.len().to_string(), false));
        list.insert(Metadata::new("uid", UID, false));
        list
    }
}

fn default_acl() -> Acl {
    [
        Grant::new(Grantee::user(UID), Permission::FullControl),
        Grant::new(Grantee::OTHER, Permission::None),
    ]
    .into_iter()
    .collect()
}

/// A running mock server. Stops with the test's runtime.
#[derive(Debug, Clone)]
pub struct MockAtmos {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockAtmos {
    /// Bind to a free local port and start serving.
    pub async fn start() -> Self {
        crate::init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind mock server: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("mock server has no address: {e}"));
        let state = Arc::new(Mutex::new(MockState::default()));
        let credentials = Arc::new(
            Credentials::new(UID, SECRET).unwrap_or_else(|e| panic!("bad mock secret: {e}")),
        );

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "mock server failed to accept");
                        continue;
                    }
                };
                let state = Arc::clone(&shared);
                let credentials = Arc::clone(&credentials);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = Arc::clone(&state);
                        let credentials = Arc::clone(&credentials);
                        async move { Ok::<_, Infallible>(handle(req, &state, &credentials).await) }
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!(peer = %peer, error = %e, "mock connection closed with error");
                    }
                });
            }
        });

        Self { addr, state }
    }

    /// The port the server listens on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Configuration for a client of this server.
    #[must_use]
    pub fn config(&self) -> AtmosConfig {
        AtmosConfig::builder()
            .hosts(vec!["127.0.0.1".to_owned()])
            .port(self.port())
            .uid(UID.to_owned())
            .shared_secret(SECRET.to_owned())
            .build()
    }

    /// A legacy-encoding client of this server.
    #[must_use]
    pub fn client(&self) -> AtmosClient {
        self.client_from(self.config())
    }

    /// A client of this server using `encoding`.
    #[must_use]
    pub fn client_with_encoding(&self, encoding: EncodingMode) -> AtmosClient {
        let mut config = self.config();
        config.encoding = encoding;
        self.client_from(config)
    }

    /// A client built from an adjusted configuration.
    #[must_use]
    pub fn client_from(&self, config: AtmosConfig) -> AtmosClient {
        AtmosClient::new(config).unwrap_or_else(|e| panic!("failed to build client: {e}"))
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> RecordedRequest {
        self.lock()
            .requests
            .last()
            .cloned()
            .unwrap_or_else(|| panic!("mock server received no request"))
    }

    /// Answer the next request with `status`, and an error document when `code` is set.
    pub fn fail_next(&self, status: StatusCode, code: Option<u32>) {
        self.lock().fail_next = Some((status, code));
    }

    /// Report a server clock `secs` ahead of the real one.
    pub fn set_clock_skew(&self, secs: i64) {
        self.lock().clock_skew_secs = secs;
    }

    /// Overwrite an object's content without touching its stored checksum.
    pub fn corrupt(&self, id: &ObjectId, data: &[u8]) {
        if let Some(object) = self.lock().objects.get_mut(id.as_str()) {
            object.data = data.to_vec();
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

async fn handle(
    req: Request<Incoming>,
    state: &Mutex<MockState>,
    credentials: &Credentials,
) -> MockResponse {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return error(StatusCode::BAD_REQUEST, 1004, &e.to_string()),
    };
    let resource = percent_decode_str(parts.uri.path())
        .decode_utf8_lossy()
        .into_owned();
    let query = parts.uri.query().map(str::to_owned);

    let mut state = lock(state);
    state.requests.push(RecordedRequest {
        method: parts.method.clone(),
        path: resource.clone(),
        query: query.clone(),
        headers: parts.headers.clone(),
    });

    let shareable = !parts.headers.contains_key(SIGNATURE_HEADER)
        && query.as_deref().is_some_and(|q| q.contains("signature="));
    let verified = if shareable {
        verify_shareable(credentials, &resource, query.as_deref().unwrap_or(""), Utc::now())
    } else {
        verify_request(credentials, &parts)
    };
    if let Err(e) = verified {
        return error(StatusCode::FORBIDDEN, 1032, &e.to_string());
    }

    if let Some((status, code)) = state.fail_next.take() {
        return match code {
            Some(code) => error(status, code, "injected failure"),
            None => respond(status, Vec::new(), "<html>upstream failure</html>"),
        };
    }

    if shareable {
        let (path, query) = (resource.as_str(), query.as_deref().unwrap_or(""));
        return shared_read(&state, path, query);
    }
    route(&mut state, &parts, query.as_deref(), &resource, body)
}

fn route(
    state: &mut MockState,
    parts: &Parts,
    query: Option<&str>,
    resource: &str,
    body: Bytes,
) -> MockResponse {
    let Some(rest) = resource.strip_prefix("/rest") else {
        return not_found();
    };
    let mode = EncodingMode::for_response(&parts.headers, EncodingMode::Legacy);
    let method = parts.method.as_str();

    if rest == "/service" {
        return service(state);
    }
    if rest == "/accesstokens" {
        return match method {
            "POST" => create_token(state, parts, &body, mode),
            "GET" => list_tokens(state, parts),
            _ => bad_request("unsupported token operation"),
        };
    }
    if let Some(token) = rest.strip_prefix("/accesstokens/") {
        return match (method, query) {
            ("GET", Some("info")) => match state.tokens.get(token) {
                Some(t) => xml(StatusCode::OK, to_xml("access-token", t)),
                None => not_found(),
            },
            ("DELETE", None) => match state.tokens.remove(token) {
                Some(_) => respond(StatusCode::NO_CONTENT, Vec::new(), ""),
                None => not_found(),
            },
            _ => bad_request("unsupported token operation"),
        };
    }
    if rest == "/objects" {
        return match (method, query) {
            ("POST", None) => create(state, parts, None, body, mode),
            ("GET", Some("listabletags")) => listable_tags(state, parts, mode),
            ("GET", None) => list_objects(state, parts, mode),
            _ => bad_request("unsupported objects operation"),
        };
    }

    let id = if let Some(id) = rest.strip_prefix("/objects/") {
        id.to_owned()
    } else if let Some(path) = rest.strip_prefix("/namespace") {
        let path = namespace_key(parts, path);
        if method == "POST" && query.is_none() {
            return create(state, parts, Some(path), body, mode);
        }
        if method == "GET" && query.is_none() && path.ends_with('/') {
            return list_directory(state, parts, &path);
        }
        if method == "POST" && query == Some("rename") {
            return rename(state, parts, &path, mode);
        }
        match state.paths.get(&path) {
            Some(id) => id.clone(),
            None => return not_found(),
        }
    } else {
        return not_found();
    };
    if !state.objects.contains_key(&id) {
        return not_found();
    }

    match (method, query) {
        ("GET", None) => read(state, &id, parts),
        ("PUT", None) => update(state, &id, parts, &body, mode),
        ("DELETE", None) => delete(state, &id),
        ("HEAD", None) => head(state, &id, mode),
        ("GET", Some("metadata/user")) => user_metadata(state, &id, parts, mode),
        ("GET", Some("metadata/system")) => system_metadata(state, &id),
        ("POST", Some("metadata/user")) => set_user_metadata(state, &id, parts, mode),
        ("DELETE", Some("metadata/user")) => delete_user_metadata(state, &id, parts, mode),
        ("GET", Some("metadata/tags")) => metadata_tags(state, &id, mode),
        ("GET", Some("acl")) => respond(StatusCode::OK, encode_acl(&state.objects[&id].acl), ""),
        ("POST", Some("acl")) => {
            if let Some(object) = state.objects.get_mut(&id) {
                object.acl = decode_acl(&parts.headers);
            }
            respond(StatusCode::OK, Vec::new(), "")
        }
        ("POST", Some("versions")) => create_version(state, &id),
        ("GET", Some("versions")) => list_versions(state, &id, parts),
        ("PUT", Some("versions")) => restore_version(state, &id, parts),
        ("DELETE", Some("versions")) => delete_version(state, &id),
        ("GET", Some("info")) => object_info(&id),
        _ => bad_request("unsupported object operation"),
    }
}

/// Namespace lookup key: the path, prefixed by the pool for key-addressed objects.
fn namespace_key(parts: &Parts, path: &str) -> String {
    match header_string(&parts.headers, POOL) {
        Some(pool) => format!("@{pool}{path}"),
        None => path.to_owned(),
    }
}

fn parent_of(path: &str) -> Option<&str> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed.rfind('/').map(|i| &path[..=i])
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

fn create(
    state: &mut MockState,
    parts: &Parts,
    path: Option<String>,
    body: Bytes,
    mode: EncodingMode,
) -> MockResponse {
    if let Some(path) = &path {
        if state.paths.contains_key(path) {
            return error(StatusCode::BAD_REQUEST, 1016, "The resource already exists.");
        }
    }
    let acl = if parts.headers.contains_key(USER_ACL) || parts.headers.contains_key(GROUP_ACL) {
        decode_acl(&parts.headers)
    } else {
        default_acl()
    };
    let object = StoredObject {
        data: body.to_vec(),
        metadata: decode_metadata(&parts.headers, mode),
        acl,
        content_type: header_string(&parts.headers, "content-type")
            .unwrap_or_else(|| "application/octet-stream".to_owned()),
        checksum: header_string(&parts.headers, WSCHECKSUM),
        versions: Vec::new(),
    };
    let id = state.insert_object(object);
    if let Some(path) = path {
        state.ensure_parents(&path);
        state.paths.insert(path, id.clone());
    }
    respond(
        StatusCode::CREATED,
        vec![("location", format!("/rest/objects/{id}"))],
        "",
    )
}

fn read(state: &MockState, id: &str, parts: &Parts) -> MockResponse {
    let object = &state.objects[id];
    let total = object.data.len();
    let mut headers = Vec::new();
    if let Some(checksum) = &object.checksum {
        headers.push((WSCHECKSUM, checksum.clone()));
    }

    let Some(range) = header_string(&parts.headers, "range") else {
        headers.push(("content-type", object.content_type.clone()));
        return respond(StatusCode::OK, headers, object.data.clone());
    };
    let Some(ranges) = parse_ranges(&range, total) else {
        return error(StatusCode::RANGE_NOT_SATISFIABLE, 1016, "invalid range");
    };

    if let [(start, end)] = ranges.as_slice() {
        headers.push(("content-type", object.content_type.clone()));
        headers.push(("content-range", format!("bytes {start}-{end}/{total}")));
        return respond(
            StatusCode::PARTIAL_CONTENT,
            headers,
            object.data[*start..=*end].to_vec(),
        );
    }

    let mut body = Vec::new();
    for (start, end) in &ranges {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Type: {}\r\nContent-Range: bytes {start}-{end}/{total}\r\n\r\n",
                object.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&object.data[*start..=*end]);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    headers.push((
        "content-type",
        format!("multipart/byteranges; boundary={BOUNDARY}"),
    ));
    respond(StatusCode::PARTIAL_CONTENT, headers, body)
}

/// Parse `Bytes=a-b,c-d` into inclusive ranges within `total` bytes.
fn parse_ranges(value: &str, total: usize) -> Option<Vec<(usize, usize)>> {
    let (unit, spec) = value.split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }
    spec.split(',')
        .map(|range| {
            let (start, end) = range.trim().split_once('-')?;
            let start: usize = start.parse().ok()?;
            let end: usize = end.parse().ok()?;
            (start <= end && end < total).then_some((start, end))
        })
        .collect()
}

fn update(
    state: &mut MockState,
    id: &str,
    parts: &Parts,
    body: &[u8],
    mode: EncodingMode,
) -> MockResponse {
    let range = header_string(&parts.headers, "range");
    let Some(object) = state.objects.get_mut(id) else {
        return not_found();
    };
    match range {
        Some(range) => {
            let Some(start) = range
                .split_once('=')
                .and_then(|(_, spec)| spec.split_once('-'))
                .and_then(|(start, _)| start.trim().parse::<usize>().ok())
            else {
                return bad_request("invalid range");
            };
            if object.data.len() < start + body.len() {
                object.data.resize(start + body.len(), 0);
            }
            object.data[start..start + body.len()].copy_from_slice(body);
        }
        None => object.data = body.to_vec(),
    }
    object.metadata.extend(decode_metadata(&parts.headers, mode));
    if parts.headers.contains_key(USER_ACL) || parts.headers.contains_key(GROUP_ACL) {
        object.acl = decode_acl(&parts.headers);
    }
    if let Some(checksum) = header_string(&parts.headers, WSCHECKSUM) {
        object.checksum = Some(checksum);
    }
    respond(StatusCode::OK, Vec::new(), "")
}

fn delete(state: &mut MockState, id: &str) -> MockResponse {
    state.objects.remove(id);
    state.paths.retain(|_, v| v.as_str() != id);
    respond(StatusCode::NO_CONTENT, Vec::new(), "")
}

fn head(state: &MockState, id: &str, mode: EncodingMode) -> MockResponse {
    let object = &state.objects[id];
    let mut all = object.system_metadata(id);
    all.extend(object.metadata.clone());
    let mut headers = encode_metadata(&all, mode);
    headers.extend(encode_acl(&object.acl));
    headers.push(("content-type", object.content_type.clone()));
    respond(StatusCode::OK, headers, "")
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

fn requested_tags(parts: &Parts, mode: EncodingMode) -> Option<Vec<String>> {
    header_string(&parts.headers, TAGS).map(|v| {
        v.split(',')
            .map(|t| mode.decode(t.trim()))
            .filter(|t| !t.is_empty())
            .collect()
    })
}

fn user_metadata(state: &MockState, id: &str, parts: &Parts, mode: EncodingMode) -> MockResponse {
    let wanted = requested_tags(parts, mode);
    let mut list = MetadataList::new();
    for entry in state.objects[id].metadata.iter() {
        if wanted
            .as_ref()
            .is_none_or(|w| w.iter().any(|t| t == entry.name()))
        {
            list.insert(entry.clone());
        }
    }
    respond(StatusCode::OK, encode_metadata(&list, mode), "")
}

fn system_metadata(state: &MockState, id: &str) -> MockResponse {
    let list = state.objects[id].system_metadata(id);
    respond(StatusCode::OK, encode_metadata(&list, EncodingMode::Legacy), "")
}

fn set_user_metadata(
    state: &mut MockState,
    id: &str,
    parts: &Parts,
    mode: EncodingMode,
) -> MockResponse {
    if let Some(object) = state.objects.get_mut(id) {
        object.metadata.extend(decode_metadata(&parts.headers, mode));
    }
    respond(StatusCode::OK, Vec::new(), "")
}

fn delete_user_metadata(
    state: &mut MockState,
    id: &str,
    parts: &Parts,
    mode: EncodingMode,
) -> MockResponse {
    let tags = requested_tags(parts, mode).unwrap_or_default();
    if let Some(object) = state.objects.get_mut(id) {
        for tag in &tags {
            object.metadata.remove(tag);
        }
    }
    respond(StatusCode::NO_CONTENT, Vec::new(), "")
}

fn metadata_tags(state: &MockState, id: &str, mode: EncodingMode) -> MockResponse {
    let metadata = &state.objects[id].metadata;
    let join = |listable: bool| {
        metadata
            .iter()
            .filter(|m| m.is_listable() == listable)
            .map(|m| mode.encode(m.name()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut headers = vec![(TAGS, join(false)), (LISTABLE_TAGS, join(true))];
    if mode == EncodingMode::Utf8 {
        headers.push((UTF8, "true".to_owned()));
    }
    respond(StatusCode::OK, headers, "")
}

fn listable_tags(state: &MockState, parts: &Parts, mode: EncodingMode) -> MockResponse {
    let parent = requested_tags(parts, mode).and_then(|t| t.into_iter().next());
    let mut names: Vec<String> = state
        .objects
        .values()
        .flat_map(|o| o.metadata.iter())
        .filter(|m| m.is_listable())
        .filter_map(|m| match &parent {
            Some(parent) => m
                .name()
                .strip_prefix(parent.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| rest.split('/').next().unwrap_or(rest).to_owned()),
            None => m.name().split('/').next().map(str::to_owned),
        })
        .collect();
    names.sort();
    names.dedup();
    let value = names
        .iter()
        .map(|n| mode.encode(n))
        .collect::<Vec<_>>()
        .join(", ");
    respond(StatusCode::OK, vec![(LISTABLE_TAGS, value)], "")
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Apply `x-emc-limit` / `x-emc-token` to a sorted result set.
fn paginate<T>(items: Vec<T>, parts: &Parts) -> (Vec<T>, Option<String>) {
    let start = header_string(&parts.headers, TOKEN)
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(0);
    let limit = header_string(&parts.headers, LIMIT)
        .and_then(|l| l.parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(usize::MAX);
    let total = items.len();
    let page: Vec<T> = items.into_iter().skip(start).take(limit).collect();
    let next = start + page.len();
    (page, (next < total).then(|| next.to_string()))
}

fn list_objects(state: &MockState, parts: &Parts, mode: EncodingMode) -> MockResponse {
    let Some(tag) = requested_tags(parts, mode).and_then(|t| t.into_iter().next()) else {
        return bad_request("missing tag");
    };
    let matching: Vec<(&String, &StoredObject)> = state
        .objects
        .iter()
        .filter(|(_, o)| o.metadata.iter().any(|m| m.is_listable() && m.name() == tag))
        .collect();
    if matching.is_empty() {
        return error(StatusCode::NOT_FOUND, 1003, "The requested object was not found.");
    }
    let include_meta = header_string(&parts.headers, INCLUDE_META).as_deref() == Some("true");
    let (page, token) = paginate(matching, parts);

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><ListObjectsResponse>");
    for (id, object) in page {
        xml.push_str(&format!("<Object><ObjectID>{id}</ObjectID>"));
        if include_meta {
            xml.push_str(&metadata_xml("SystemMetadataList", &object.system_metadata(id)));
            xml.push_str(&metadata_xml("UserMetadataList", &object.metadata));
        }
        xml.push_str("</Object>");
    }
    xml.push_str("</ListObjectsResponse>");
    listing(xml, token)
}

fn list_directory(state: &MockState, parts: &Parts, dir: &str) -> MockResponse {
    if dir != "/" && !state.paths.contains_key(dir) {
        return not_found();
    }
    let children: Vec<(&String, &String)> = state
        .paths
        .iter()
        .filter(|(path, _)| path.as_str() != dir && parent_of(path) == Some(dir))
        .collect();
    let (page, token) = paginate(children, parts);

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><ListDirectoryResponse><DirectoryList>",
    );
    for (path, id) in page {
        let directory = path.ends_with('/');
        let name = path[dir.len()..].trim_end_matches('/');
        xml.push_str(&format!(
            "<DirectoryEntry><ObjectID>{id}</ObjectID><FileType>{}</FileType><Filename>{}</Filename></DirectoryEntry>",
            if directory { "directory" } else { "regular" },
            escape(name)
        ));
    }
    xml.push_str("</DirectoryList></ListDirectoryResponse>");
    listing(xml, token)
}

fn metadata_xml(element: &str, list: &MetadataList) -> String {
    let mut xml = format!("<{element}>");
    for m in list.iter() {
        xml.push_str(&format!(
            "<Metadata><Name>{}</Name><Value>{}</Value><Listable>{}</Listable></Metadata>",
            escape(m.name()),
            escape(m.value()),
            m.is_listable()
        ));
    }
    xml.push_str(&format!("</{element}>"));
    xml
}

fn listing(xml: String, token: Option<String>) -> MockResponse {
    let mut headers = vec![("content-type", "text/xml".to_owned())];
    if let Some(token) = token {
        headers.push((TOKEN, token));
    }
    respond(StatusCode::OK, headers, xml)
}

// ---------------------------------------------------------------------------
// Namespace, versions, info, service
// ---------------------------------------------------------------------------

fn rename(state: &mut MockState, parts: &Parts, source: &str, mode: EncodingMode) -> MockResponse {
    let Some(target) = header_string(&parts.headers, PATH) else {
        return bad_request("missing x-emc-path");
    };
    let destination = format!("/{}", mode.decode(&target));
    let force = header_string(&parts.headers, FORCE).as_deref() == Some("true");
    if state.paths.contains_key(&destination) && !force {
        return error(StatusCode::BAD_REQUEST, 1016, "The resource already exists.");
    }
    let Some(id) = state.paths.remove(source) else {
        return not_found();
    };
    state.ensure_parents(&destination);
    state.paths.insert(destination, id);
    respond(StatusCode::OK, Vec::new(), "")
}

fn create_version(state: &mut MockState, id: &str) -> MockResponse {
    let mut snapshot = state.objects[id].clone();
    snapshot.versions.clear();
    let version = state.insert_object(snapshot);
    if let Some(object) = state.objects.get_mut(id) {
        object.versions.push(version.clone());
    }
    respond(
        StatusCode::CREATED,
        vec![("location", format!("/rest/objects/{version}"))],
        "",
    )
}

fn list_versions(state: &MockState, id: &str, parts: &Parts) -> MockResponse {
    let versions: Vec<(usize, &String)> = state.objects[id].versions.iter().enumerate().collect();
    let (page, token) = paginate(versions, parts);
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><ListVersionsResponse>");
    for (number, version) in page {
        xml.push_str(&format!(
            "<Ver><VerNum>{number}</VerNum><OID>{version}</OID><itime>2013-01-01T00:00:00Z</itime></Ver>"
        ));
    }
    xml.push_str("</ListVersionsResponse>");
    listing(xml, token)
}

fn restore_version(state: &mut MockState, id: &str, parts: &Parts) -> MockResponse {
    let Some(version) = header_string(&parts.headers, VERSION_OID) else {
        return bad_request("missing x-emc-version-oid");
    };
    let Some(snapshot) = state.objects.get(&version).cloned() else {
        return not_found();
    };
    if let Some(object) = state.objects.get_mut(id) {
        object.data = snapshot.data;
        object.metadata = snapshot.metadata;
    }
    respond(StatusCode::OK, Vec::new(), "")
}

fn delete_version(state: &mut MockState, version: &str) -> MockResponse {
    state.objects.remove(version);
    for object in state.objects.values_mut() {
        object.versions.retain(|v| v.as_str() != version);
    }
    respond(StatusCode::NO_CONTENT, Vec::new(), "")
}

fn object_info(id: &str) -> MockResponse {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><GetObjectInfoResponse>\
         <objectId>{id}</objectId><selection>geographic</selection>\
         <replicas><replica><id>3</id><type>sync</type><current>true</current>\
         <location>Boston</location><storageType>Normal</storageType></replica></replicas>\
         <retention><enabled>false</enabled><endAt></endAt></retention>\
         <expiration><enabled>false</enabled><endAt></endAt></expiration>\
         </GetObjectInfoResponse>"
    );
    respond(
        StatusCode::OK,
        vec![("content-type", "text/xml".to_owned())],
        xml,
    )
}

fn service(state: &MockState) -> MockResponse {
    let now = Utc::now()
        + TimeDelta::try_seconds(state.clock_skew_secs).unwrap_or_default();
    respond(
        StatusCode::OK,
        vec![
            ("content-type", "text/xml".to_owned()),
            ("date", atmos_http::http_date(&now)),
            (SUPPORT_UTF8, "true".to_owned()),
            (FEATURES, "object, namespace, keypool, versioning".to_owned()),
        ],
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Service><Atmos>2.1.0</Atmos></Service>",
    )
}

/// Anonymous read through a shareable URL.
fn shared_read(state: &MockState, resource: &str, query: &str) -> MockResponse {
    let Some(id) = resource
        .strip_prefix("/rest/objects/")
        .map(str::to_owned)
        .or_else(|| {
            resource
                .strip_prefix("/rest/namespace")
                .and_then(|p| state.paths.get(p).cloned())
        })
    else {
        return not_found();
    };
    let Some(object) = state.objects.get(&id) else {
        return not_found();
    };
    let mut headers = vec![("content-type", object.content_type.clone())];
    if let Some(disposition) = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("disposition="))
    {
        headers.push((
            "content-disposition",
            percent_decode_str(disposition).decode_utf8_lossy().into_owned(),
        ));
    }
    respond(StatusCode::OK, headers, object.data.clone())
}

// ---------------------------------------------------------------------------
// Access tokens
// ---------------------------------------------------------------------------

fn create_token(
    state: &mut MockState,
    parts: &Parts,
    body: &[u8],
    mode: EncodingMode,
) -> MockResponse {
    let policy = if body.is_empty() {
        TokenPolicy::default()
    } else {
        match atmos_xml::from_xml::<TokenPolicy>(body) {
            Ok(policy) => policy,
            Err(e) => return bad_request(&e.to_string()),
        }
    };
    let object_id = header_string(&parts.headers, OBJECT_ID).and_then(|id| ObjectId::new(id).ok());
    let path = header_string(&parts.headers, PATH)
        .and_then(|p| ObjectPath::new(mode.decode(&p)).ok());

    state.next_id += 1;
    let id = format!("tok-{:04}", state.next_id);
    state.tokens.insert(
        id.clone(),
        AccessToken {
            id: id.clone(),
            object_id,
            path,
            uid: Some(UID.to_owned()),
            policy,
        },
    );
    respond(
        StatusCode::CREATED,
        vec![("location", format!("/rest/accesstokens/{id}"))],
        "",
    )
}

fn list_tokens(state: &MockState, parts: &Parts) -> MockResponse {
    let tokens: Vec<AccessToken> = state.tokens.values().cloned().collect();
    let (page, token) = paginate(tokens, parts);
    let body = to_xml("list-access-tokens-result", &AccessTokenListRef(&page));
    let mut headers = vec![("content-type", "text/xml".to_owned())];
    if let Some(token) = token {
        headers.push((TOKEN, token));
    }
    match body {
        Ok(body) => respond(StatusCode::OK, headers, body),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, 1001, &e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

fn respond(
    status: StatusCode,
    headers: Vec<(&str, String)>,
    body: impl Into<Bytes>,
) -> MockResponse {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        let bytes = atmos_auth::canonical::latin1_encode(&value)
            .unwrap_or_else(|e| panic!("mock sent a non ISO-8859-1 header {name}: {e}"));
        builder = builder.header(name, bytes);
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|e| panic!("mock built an invalid response: {e}"))
}

fn xml<E: std::fmt::Display>(status: StatusCode, body: Result<Vec<u8>, E>) -> MockResponse {
    match body {
        Ok(body) => respond(status, vec![("content-type", "text/xml".to_owned())], body),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, 1001, &e.to_string()),
    }
}

fn error(status: StatusCode, code: u32, message: &str) -> MockResponse {
    respond(
        status,
        vec![("content-type", "text/xml".to_owned())],
        error_to_xml(code, message),
    )
}

fn not_found() -> MockResponse {
    error(StatusCode::NOT_FOUND, 1003, "The requested object was not found.")
}

fn bad_request(message: &str) -> MockResponse {
    error(StatusCode::BAD_REQUEST, 1002, message)
}
