//! `multipart/byteranges` parser for multi-extent reads.
//!
//! A read of several extents comes back as:
//!
//! ```text
//! --BOUNDARY
//! Content-Type: text/plain
//! Content-Range: bytes 27-29/30
//!
//! ago
//! --BOUNDARY
//! ...
//! --BOUNDARY--
//! ```
//!
//! Line endings may be CRLF or bare LF. Part data is taken by length from
//! `Content-Range`, so it may contain anything, including the boundary text.

use atmos_model::{AtmosError, Extent, MultipartEntry};
use bytes::Bytes;

const DEFAULT_PART_TYPE: &str = "application/octet-stream";

/// Extract the boundary from `multipart/byteranges; boundary=...`.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] if the content type is not
/// `multipart/byteranges` or has no boundary.
pub fn extract_boundary(content_type: &str) -> Result<String, AtmosError> {
    let parsed: mime::Mime = content_type
        .parse()
        .map_err(|_| AtmosError::parse("unparseable multipart content type", content_type))?;
    if parsed.type_() != mime::MULTIPART || parsed.subtype().as_str() != "byteranges" {
        return Err(AtmosError::parse(
            format!("expected multipart/byteranges, got {content_type}"),
            "",
        ));
    }
    let boundary = parsed
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().trim_matches('"').to_owned())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AtmosError::parse("missing boundary in content type", content_type))?;
    Ok(boundary)
}

/// Split a `multipart/byteranges` body into its parts.
///
/// # Errors
///
/// Returns [`AtmosError::Parse`] for an empty body, a line that is not the
/// expected boundary marker, an invalid `Content-Range`, or part data that
/// runs past the end of the body.
pub fn parse_byteranges(body: &Bytes, boundary: &str) -> Result<Vec<MultipartEntry>, AtmosError> {
    if body.is_empty() {
        return Err(AtmosError::parse("empty multipart body", ""));
    }
    let fail = |message: String| AtmosError::parse(message, String::from_utf8_lossy(body));
    let delimiter = format!("--{boundary}");
    let terminator = format!("--{boundary}--");

    let mut entries = Vec::new();
    let mut pos = skip_blank_lines(body, 0);

    while pos < body.len() {
        let (line, next) = read_line(body, pos);
        pos = next;
        if line == terminator.as_bytes() {
            break;
        }
        if line != delimiter.as_bytes() {
            return Err(fail(format!(
                "expected boundary {delimiter:?}, found {:?}",
                String::from_utf8_lossy(line)
            )));
        }

        let mut content_type = None;
        let mut range = None;
        loop {
            if pos >= body.len() {
                return Err(fail("truncated part headers".to_owned()));
            }
            let (line, next) = read_line(body, pos);
            pos = next;
            if line.is_empty() {
                break;
            }
            let line = String::from_utf8_lossy(line);
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_owned());
            } else if name.eq_ignore_ascii_case("content-range") {
                range = Some(parse_content_range(value.trim()).map_err(&fail)?);
            }
        }

        let extent = range.ok_or_else(|| fail("part without Content-Range".to_owned()))?;
        let len = usize::try_from(extent.size())
            .map_err(|_| fail("part too large".to_owned()))?;
        let end = pos
            .checked_add(len)
            .filter(|end| *end <= body.len())
            .ok_or_else(|| fail(format!("truncated part data for bytes {}", extent.range_spec())))?;

        entries.push(MultipartEntry {
            content_type: content_type.unwrap_or_else(|| DEFAULT_PART_TYPE.to_owned()),
            extent,
            data: body.slice(pos..end),
        });

        pos = skip_line_ending(body, end);
    }

    Ok(entries)
}

/// Parse `bytes start-end/total` into an extent.
fn parse_content_range(value: &str) -> Result<Extent, String> {
    let invalid = || format!("invalid Content-Range {value:?}");
    let spec = value
        .strip_prefix("bytes")
        .ok_or_else(invalid)?
        .trim_start();
    let (range, total) = spec.split_once('/').ok_or_else(invalid)?;
    let (start, end) = range.split_once('-').ok_or_else(invalid)?;
    let start: u64 = start.trim().parse().map_err(|_| invalid())?;
    let end: u64 = end.trim().parse().map_err(|_| invalid())?;
    let total = total.trim();

    if end < start {
        return Err(format!("Content-Range end before start: {value:?}"));
    }
    if total != "*" {
        let total: u64 = total.parse().map_err(|_| invalid())?;
        if end >= total {
            return Err(format!("Content-Range end beyond total: {value:?}"));
        }
    }
    Extent::new(start, end - start + 1).map_err(|e| e.to_string())
}

/// Return the line starting at `pos` without its ending, and the offset after it.
fn read_line(body: &[u8], pos: usize) -> (&[u8], usize) {
    let rest = &body[pos..];
    match rest.iter().position(|b| *b == b'\n') {
        Some(i) => {
            let line = &rest[..i];
            (line.strip_suffix(b"\r").unwrap_or(line), pos + i + 1)
        }
        None => (rest, body.len()),
    }
}

/// Skip a single CRLF or LF at `pos`.
fn skip_line_ending(body: &[u8], pos: usize) -> usize {
    let rest = &body[pos..];
    if rest.starts_with(b"\r\n") {
        pos + 2
    } else if rest.starts_with(b"\n") {
        pos + 1
    } else {
        pos
    }
}

/// Skip any number of blank lines at `pos`.
fn skip_blank_lines(body: &[u8], mut pos: usize) -> usize {
    loop {
        let next = skip_line_ending(body, pos);
        if next == pos {
            return pos;
        }
        pos = next;
    }
}
