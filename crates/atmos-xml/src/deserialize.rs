//! Atmos XML deserialization: parsing response bodies into typed values.
//!
//! Every response document implements [`AtmosDeserialize`]; [`from_xml`]
//! locates the root element and hands the reader to the implementation.
//! Text is read untrimmed so metadata values keep their whitespace; entity
//! and character references are resolved while reading.

use atmos_model::{
    AccessToken, ContentLengthRange, DirectoryEntry, FileType, FormField, Metadata,
    MetadataList, ObjectId, ObjectInfo, ObjectPath, ObjectResult, ObjectVersion, PeriodInfo,
    Replica, ServiceInformation, TokenPolicy,
};
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::error::XmlError;

/// Trait for deserializing Atmos response documents.
///
/// The root element has already been consumed by the caller; the
/// implementation reads child elements until the matching end tag.
pub trait AtmosDeserialize: Sized {
    /// Deserialize an instance from the given XML reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;

    /// Build an instance from a self-closing root element such as `<List/>`.
    ///
    /// # Errors
    ///
    /// The default rejects empty documents with [`XmlError::MissingElement`].
    fn from_empty() -> Result<Self, XmlError> {
        Err(XmlError::MissingElement("document content".to_owned()))
    }
}

/// Deserialize an Atmos XML document into a typed value.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed or deserialization fails.
pub fn from_xml<T: AtmosDeserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event()? {
            Event::Start(_) => return T::deserialize_xml(&mut reader),
            Event::Empty(_) => return T::from_empty(),
            Event::Eof => return Err(XmlError::MissingElement("root element".to_owned())),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Reader helpers
// ---------------------------------------------------------------------------

fn local_name(start: &BytesStart<'_>) -> Result<String, XmlError> {
    String::from_utf8(start.local_name().as_ref().to_vec())
        .map_err(|e| XmlError::ParseError(e.to_string()))
}

/// Visit every child element of the current element, then consume its end tag.
///
/// The callback gets the element name, its start tag and whether it was
/// self-closing. A non-empty child must be fully consumed by the callback.
fn read_children<'a, F>(
    reader: &mut Reader<&'a [u8]>,
    context: &str,
    mut on_child: F,
) -> Result<(), XmlError>
where
    F: FnMut(&mut Reader<&'a [u8]>, &str, &BytesStart<'a>, bool) -> Result<(), XmlError>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e)?;
                on_child(reader, &name, &e, false)?;
            }
            Event::Empty(e) => {
                let name = local_name(&e)?;
                on_child(reader, &name, &e, true)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(format!(
                    "unexpected EOF in {context}"
                )));
            }
            _ => {}
        }
    }
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&decoded);
            }
            Event::CData(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&decoded);
            }
            Event::GeneralRef(e) => text.push_str(&resolve_reference(&e)?),
            Event::Start(_) => skip_element(reader)?,
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, XmlError> {
    if let Some(ch) = reference.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = reference
        .decode()
        .map_err(|err| XmlError::ParseError(err.to_string()))?;
    quick_xml::escape::resolve_predefined_entity(&name)
        .map(str::to_owned)
        .ok_or_else(|| XmlError::ParseError(format!("unknown entity &{name};")))
}

/// Text of a child element; self-closing elements have empty text.
fn read_text(reader: &mut Reader<&[u8]>, empty: bool) -> Result<String, XmlError> {
    if empty {
        Ok(String::new())
    } else {
        read_text_content(reader)
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

fn skip(reader: &mut Reader<&[u8]>, empty: bool) -> Result<(), XmlError> {
    if empty { Ok(()) } else { skip_element(reader) }
}

/// Read and unescape an attribute value.
fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, XmlError> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let raw =
                std::str::from_utf8(&attr.value).map_err(|e| XmlError::ParseError(e.to_string()))?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|e| XmlError::ParseError(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a boolean from XML text (`true`/`false`, any case).
fn parse_bool(s: &str) -> Result<bool, XmlError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        _ => Err(XmlError::ParseError(format!("invalid boolean: {s}"))),
    }
}

fn parse_u32(s: &str) -> Result<u32, XmlError> {
    s.trim()
        .parse::<u32>()
        .map_err(|e| XmlError::ParseError(format!("invalid integer '{s}': {e}")))
}

fn parse_u64(s: &str) -> Result<u64, XmlError> {
    s.trim()
        .parse::<u64>()
        .map_err(|e| XmlError::ParseError(format!("invalid integer '{s}': {e}")))
}

/// Parse an ISO 8601 timestamp. Empty text means "not set".
fn parse_timestamp(s: &str) -> Result<Option<DateTime<Utc>>, XmlError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
                .map(|ndt| ndt.and_utc())
        })
        .map(Some)
        .map_err(|e| XmlError::ParseError(format!("invalid timestamp '{s}': {e}")))
}

fn parse_object_id(s: &str) -> Result<ObjectId, XmlError> {
    ObjectId::new(s.trim()).map_err(|e| XmlError::ParseError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Metadata lists
// ---------------------------------------------------------------------------

/// Read `<Metadata>` children of a `<SystemMetadataList>` or `<UserMetadataList>`.
fn read_metadata_list(reader: &mut Reader<&[u8]>, into: &mut MetadataList) -> Result<(), XmlError> {
    read_children(reader, "metadata list", |reader, name, _, empty| {
        if name == "Metadata" && !empty {
            into.insert(read_metadata(reader)?);
            Ok(())
        } else {
            skip(reader, empty)
        }
    })
}

fn read_metadata(reader: &mut Reader<&[u8]>) -> Result<Metadata, XmlError> {
    let mut name = None;
    let mut value = String::new();
    let mut listable = false;

    read_children(reader, "Metadata", |reader, tag, _, empty| {
        match tag {
            "Name" => name = Some(read_text(reader, empty)?.trim().to_owned()),
            "Value" => value = read_text(reader, empty)?,
            "Listable" => listable = parse_bool(&read_text(reader, empty)?)?,
            _ => skip(reader, empty)?,
        }
        Ok(())
    })?;

    let name = name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| XmlError::MissingElement("Metadata/Name".to_owned()))?;
    Ok(Metadata::new(name, value, listable))
}

// ---------------------------------------------------------------------------
// Listing documents
// ---------------------------------------------------------------------------

/// Every `<ObjectID>` in a document, at any depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectIdList(pub Vec<ObjectId>);

impl AtmosDeserialize for ObjectIdList {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut ids = Vec::new();
        collect_object_ids(reader, &mut ids)?;
        Ok(Self(ids))
    }

    fn from_empty() -> Result<Self, XmlError> {
        Ok(Self::default())
    }
}

fn collect_object_ids(reader: &mut Reader<&[u8]>, ids: &mut Vec<ObjectId>) -> Result<(), XmlError> {
    read_children(reader, "object id list", |reader, name, _, empty| {
        if name == "ObjectID" {
            ids.push(parse_object_id(&read_text(reader, empty)?)?);
            Ok(())
        } else if empty {
            Ok(())
        } else {
            collect_object_ids(reader, ids)
        }
    })
}

/// A `ListVersionsResponse`, in either the `<Ver>` or the bare `<OID>` form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionList(pub Vec<ObjectVersion>);

impl AtmosDeserialize for VersionList {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut versions = Vec::new();
        read_children(reader, "ListVersionsResponse", |reader, name, _, empty| {
            match name {
                "Ver" if !empty => versions.push(read_version(reader)?),
                "OID" => versions.push(ObjectVersion {
                    version_number: None,
                    id: parse_object_id(&read_text(reader, empty)?)?,
                    itime: None,
                }),
                _ => skip(reader, empty)?,
            }
            Ok(())
        })?;
        Ok(Self(versions))
    }

    fn from_empty() -> Result<Self, XmlError> {
        Ok(Self::default())
    }
}

fn read_version(reader: &mut Reader<&[u8]>) -> Result<ObjectVersion, XmlError> {
    let mut version_number = None;
    let mut id = None;
    let mut itime = None;

    read_children(reader, "Ver", |reader, name, _, empty| {
        match name {
            "VerNum" => version_number = Some(parse_u32(&read_text(reader, empty)?)?),
            "OID" => id = Some(parse_object_id(&read_text(reader, empty)?)?),
            "itime" => itime = parse_timestamp(&read_text(reader, empty)?)?,
            _ => skip(reader, empty)?,
        }
        Ok(())
    })?;

    Ok(ObjectVersion {
        version_number,
        id: id.ok_or_else(|| XmlError::MissingElement("Ver/OID".to_owned()))?,
        itime,
    })
}

/// A `ListObjectsResponse`: `<Object>` entries, or bare `<ObjectID>`s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectList(pub Vec<ObjectResult>);

impl AtmosDeserialize for ObjectList {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut objects = Vec::new();
        read_children(reader, "ListObjectsResponse", |reader, name, _, empty| {
            match name {
                "Object" if !empty => objects.push(read_object_entry(reader)?),
                "ObjectID" => objects.push(ObjectResult {
                    id: parse_object_id(&read_text(reader, empty)?)?,
                    metadata: MetadataList::new(),
                }),
                _ => skip(reader, empty)?,
            }
            Ok(())
        })?;
        Ok(Self(objects))
    }

    fn from_empty() -> Result<Self, XmlError> {
        Ok(Self::default())
    }
}

fn read_object_entry(reader: &mut Reader<&[u8]>) -> Result<ObjectResult, XmlError> {
    let mut id = None;
    let mut metadata = MetadataList::new();

    read_children(reader, "Object", |reader, name, _, empty| {
        match name {
            "ObjectID" => id = Some(parse_object_id(&read_text(reader, empty)?)?),
            "SystemMetadataList" | "UserMetadataList" if !empty => {
                read_metadata_list(reader, &mut metadata)?;
            }
            _ => skip(reader, empty)?,
        }
        Ok(())
    })?;

    Ok(ObjectResult {
        id: id.ok_or_else(|| XmlError::MissingElement("Object/ObjectID".to_owned()))?,
        metadata,
    })
}

/// One raw `<DirectoryEntry>`, before its path is resolved against the listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    /// The entry's object ID.
    pub id: ObjectId,
    /// The entry's file name within the directory.
    pub filename: String,
    /// Regular object or directory.
    pub file_type: FileType,
    /// System and user metadata, when requested.
    pub metadata: MetadataList,
}

impl ListedEntry {
    /// Resolve this entry against the directory that was listed.
    ///
    /// Directory entries get a trailing `/`.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::ParseError`] if `directory` is not a directory path.
    pub fn into_entry(self, directory: &ObjectPath) -> Result<DirectoryEntry, XmlError> {
        let path = directory
            .child(&self.filename, self.file_type == FileType::Directory)
            .map_err(|e| XmlError::ParseError(e.to_string()))?;
        Ok(DirectoryEntry {
            id: self.id,
            path,
            file_type: self.file_type,
            metadata: self.metadata,
        })
    }
}

/// A `ListDirectoryResponse`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing(pub Vec<ListedEntry>);

impl AtmosDeserialize for DirectoryListing {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut entries = Vec::new();
        collect_directory_entries(reader, &mut entries)?;
        Ok(Self(entries))
    }

    fn from_empty() -> Result<Self, XmlError> {
        Ok(Self::default())
    }
}

fn collect_directory_entries(
    reader: &mut Reader<&[u8]>,
    entries: &mut Vec<ListedEntry>,
) -> Result<(), XmlError> {
    read_children(reader, "ListDirectoryResponse", |reader, name, _, empty| {
        match name {
            "DirectoryEntry" if !empty => entries.push(read_directory_entry(reader)?),
            "DirectoryList" if !empty => collect_directory_entries(reader, entries)?,
            _ => skip(reader, empty)?,
        }
        Ok(())
    })
}

fn read_directory_entry(reader: &mut Reader<&[u8]>) -> Result<ListedEntry, XmlError> {
    let mut id = None;
    let mut filename = None;
    let mut file_type = FileType::Regular;
    let mut metadata = MetadataList::new();

    read_children(reader, "DirectoryEntry", |reader, name, _, empty| {
        match name {
            "ObjectID" => id = Some(parse_object_id(&read_text(reader, empty)?)?),
            "Filename" => filename = Some(read_text(reader, empty)?),
            "FileType" => file_type = FileType::from(read_text(reader, empty)?.as_str()),
            "SystemMetadataList" | "UserMetadataList" if !empty => {
                read_metadata_list(reader, &mut metadata)?;
            }
            _ => skip(reader, empty)?,
        }
        Ok(())
    })?;

    Ok(ListedEntry {
        id: id.ok_or_else(|| XmlError::MissingElement("DirectoryEntry/ObjectID".to_owned()))?,
        filename: filename
            .filter(|f| !f.is_empty())
            .ok_or_else(|| XmlError::MissingElement("DirectoryEntry/Filename".to_owned()))?,
        file_type,
        metadata,
    })
}

// ---------------------------------------------------------------------------
// Error, info and service documents
// ---------------------------------------------------------------------------

/// An ESU error document: `<Error><Code/><Message/></Error>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDocument {
    /// The Atmos error code.
    pub code: u32,
    /// The human-readable message.
    pub message: String,
}

impl AtmosDeserialize for ErrorDocument {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut code = None;
        let mut message = String::new();
        read_children(reader, "Error", |reader, name, _, empty| {
            match name {
                "Code" => code = Some(parse_u32(&read_text(reader, empty)?)?),
                "Message" => message = read_text(reader, empty)?.trim().to_owned(),
                _ => skip(reader, empty)?,
            }
            Ok(())
        })?;
        Ok(Self {
            code: code.ok_or_else(|| XmlError::MissingElement("Error/Code".to_owned()))?,
            message,
        })
    }
}

impl AtmosDeserialize for ObjectInfo {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut id = None;
        let mut selection = None;
        let mut replicas = Vec::new();
        let mut retention = None;
        let mut expiration = None;

        read_children(reader, "GetObjectInfoResponse", |reader, name, _, empty| {
            match name {
                "objectId" => id = Some(parse_object_id(&read_text(reader, empty)?)?),
                "selection" => {
                    selection = Some(read_text(reader, empty)?.trim().to_owned())
                        .filter(|s| !s.is_empty());
                }
                "replicas" if !empty => {
                    read_children(reader, "replicas", |reader, name, _, empty| {
                        if name == "replica" && !empty {
                            replicas.push(read_replica(reader)?);
                            Ok(())
                        } else {
                            skip(reader, empty)
                        }
                    })?;
                }
                "retention" if !empty => retention = Some(read_period(reader, "retention")?),
                "expiration" if !empty => expiration = Some(read_period(reader, "expiration")?),
                _ => skip(reader, empty)?,
            }
            Ok(())
        })?;

        Ok(Self {
            id: id.ok_or_else(|| XmlError::MissingElement("objectId".to_owned()))?,
            selection,
            replicas,
            retention,
            expiration,
        })
    }
}

fn read_replica(reader: &mut Reader<&[u8]>) -> Result<Replica, XmlError> {
    let mut replica = Replica {
        id: String::new(),
        location: String::new(),
        replica_type: String::new(),
        current: false,
        storage_type: String::new(),
    };
    read_children(reader, "replica", |reader, name, _, empty| {
        match name {
            "id" => replica.id = read_text(reader, empty)?.trim().to_owned(),
            "location" => replica.location = read_text(reader, empty)?.trim().to_owned(),
            "type" => replica.replica_type = read_text(reader, empty)?.trim().to_owned(),
            "current" => replica.current = parse_bool(&read_text(reader, empty)?)?,
            "storageType" => replica.storage_type = read_text(reader, empty)?.trim().to_owned(),
            _ => skip(reader, empty)?,
        }
        Ok(())
    })?;
    Ok(replica)
}

fn read_period(reader: &mut Reader<&[u8]>, context: &str) -> Result<PeriodInfo, XmlError> {
    let mut period = PeriodInfo {
        enabled: false,
        end_at: None,
    };
    read_children(reader, context, |reader, name, _, empty| {
        match name {
            "enabled" => period.enabled = parse_bool(&read_text(reader, empty)?)?,
            "endAt" => period.end_at = parse_timestamp(&read_text(reader, empty)?)?,
            _ => skip(reader, empty)?,
        }
        Ok(())
    })?;
    Ok(period)
}

/// `<Service><Atmos>version</Atmos></Service>`. Capability flags come from
/// response headers and are filled in by the caller.
impl AtmosDeserialize for ServiceInformation {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut version = None;
        read_children(reader, "Service", |reader, name, _, empty| {
            if name == "Atmos" {
                version = Some(read_text(reader, empty)?.trim().to_owned());
                Ok(())
            } else {
                skip(reader, empty)
            }
        })?;
        Ok(Self {
            atmos_version: version
                .ok_or_else(|| XmlError::MissingElement("Service/Atmos".to_owned()))?,
            utf8_supported: false,
            features: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Access tokens
// ---------------------------------------------------------------------------

/// Apply one policy child element. Returns `false` if `name` is not a policy element.
fn read_policy_element(
    reader: &mut Reader<&[u8]>,
    name: &str,
    start: &BytesStart<'_>,
    empty: bool,
    policy: &mut TokenPolicy,
) -> Result<bool, XmlError> {
    match name {
        "expiration" => policy.expiration = parse_timestamp(&read_text(reader, empty)?)?,
        "max-uploads" => policy.max_uploads = Some(parse_u32(&read_text(reader, empty)?)?),
        "max-downloads" => policy.max_downloads = Some(parse_u32(&read_text(reader, empty)?)?),
        "source" => {
            if !empty {
                read_children(reader, "source", |reader, name, _, empty| {
                    match name {
                        "allow" => policy
                            .source_allow
                            .push(read_text(reader, empty)?.trim().to_owned()),
                        "disallow" => policy
                            .source_deny
                            .push(read_text(reader, empty)?.trim().to_owned()),
                        _ => skip(reader, empty)?,
                    }
                    Ok(())
                })?;
            }
        }
        "content-length-range" => {
            let from = attribute(start, "from")?.map(|v| parse_u64(&v)).transpose()?;
            let to = attribute(start, "to")?.map(|v| parse_u64(&v)).transpose()?;
            skip(reader, empty)?;
            policy.content_length_range = Some(ContentLengthRange {
                from: from.unwrap_or(0),
                to: to.unwrap_or(u64::MAX),
            });
        }
        "form-field" => {
            let mut field = FormField {
                name: attribute(start, "name")?
                    .ok_or_else(|| XmlError::MissingElement("form-field@name".to_owned()))?,
                optional: attribute(start, "optional")?
                    .map(|v| parse_bool(&v))
                    .transpose()?
                    .unwrap_or(false),
                conditions: Vec::new(),
            };
            if !empty {
                read_children(reader, "form-field", |reader, name, _, empty| {
                    field
                        .conditions
                        .push((name.to_owned(), read_text(reader, empty)?));
                    Ok(())
                })?;
            }
            policy.form_fields.push(field);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

impl AtmosDeserialize for TokenPolicy {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut policy = TokenPolicy::default();
        read_children(reader, "policy", |reader, name, start, empty| {
            if !read_policy_element(reader, name, start, empty, &mut policy)? {
                skip(reader, empty)?;
            }
            Ok(())
        })?;
        Ok(policy)
    }

    fn from_empty() -> Result<Self, XmlError> {
        Ok(Self::default())
    }
}

impl AtmosDeserialize for AccessToken {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut id = None;
        let mut object_id = None;
        let mut path = None;
        let mut uid = None;
        let mut policy = TokenPolicy::default();

        read_children(reader, "access-token", |reader, name, start, empty| {
            match name {
                "access-token-id" => id = Some(read_text(reader, empty)?.trim().to_owned()),
                "object-id" => {
                    let text = read_text(reader, empty)?;
                    if !text.trim().is_empty() {
                        object_id = Some(parse_object_id(&text)?);
                    }
                }
                "path" => {
                    let text = read_text(reader, empty)?;
                    if !text.trim().is_empty() {
                        path = Some(
                            ObjectPath::new(text.trim())
                                .map_err(|e| XmlError::ParseError(e.to_string()))?,
                        );
                    }
                }
                "uid" => uid = Some(read_text(reader, empty)?.trim().to_owned()),
                _ => {
                    if !read_policy_element(reader, name, start, empty, &mut policy)? {
                        skip(reader, empty)?;
                    }
                }
            }
            Ok(())
        })?;

        Ok(Self {
            id: id
                .filter(|i| !i.is_empty())
                .ok_or_else(|| XmlError::MissingElement("access-token-id".to_owned()))?,
            object_id,
            path,
            uid,
            policy,
        })
    }
}

/// A `list-access-tokens-result`: every `<access-token>` at any depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTokenList(pub Vec<AccessToken>);

impl AtmosDeserialize for AccessTokenList {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut tokens = Vec::new();
        collect_access_tokens(reader, &mut tokens)?;
        Ok(Self(tokens))
    }

    fn from_empty() -> Result<Self, XmlError> {
        Ok(Self::default())
    }
}

fn collect_access_tokens(
    reader: &mut Reader<&[u8]>,
    tokens: &mut Vec<AccessToken>,
) -> Result<(), XmlError> {
    read_children(reader, "list-access-tokens-result", |reader, name, _, empty| {
        if empty {
            Ok(())
        } else if name == "access-token" {
            tokens.push(AccessToken::deserialize_xml(reader)?);
            Ok(())
        } else {
            collect_access_tokens(reader, tokens)
        }
    })
}
