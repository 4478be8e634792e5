//! Request content sources.

use std::fmt;
use std::pin::Pin;

use atmos_model::{AtmosError, AtmosResult};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Content to upload with a create or update call.
///
/// Every variant has a known length. Reader content is read fully before the
/// request is sent.
pub enum ContentSource {
    /// In-memory bytes.
    Bytes(Bytes),
    /// `len` bytes of `data` starting at `offset`.
    Slice {
        /// The whole buffer.
        data: Bytes,
        /// Start of the content within `data`.
        offset: usize,
        /// Number of bytes to send.
        len: usize,
    },
    /// A reader expected to yield exactly `length` bytes.
    Reader {
        /// The content stream.
        reader: Pin<Box<dyn AsyncRead + Send>>,
        /// Declared content length.
        length: u64,
    },
}

impl ContentSource {
    /// No content.
    #[must_use]
    pub fn empty() -> Self {
        Self::Bytes(Bytes::new())
    }

    /// Content from a reader of declared length.
    #[must_use]
    pub fn from_reader(reader: impl AsyncRead + Send + 'static, length: u64) -> Self {
        Self::Reader {
            reader: Box::pin(reader),
            length,
        }
    }

    /// A range of a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] if the range lies outside `data`.
    pub fn slice(data: impl Into<Bytes>, offset: usize, len: usize) -> AtmosResult<Self> {
        let data = data.into();
        if offset.checked_add(len).is_none_or(|end| end > data.len()) {
            return Err(AtmosError::Validation(format!(
                "range {offset}+{len} is outside a buffer of {} bytes",
                data.len()
            )));
        }
        Ok(Self::Slice { data, offset, len })
    }

    /// The number of bytes that will be sent.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Bytes(data) => data.len() as u64,
            Self::Slice { len, .. } => *len as u64,
            Self::Reader { length, .. } => *length,
        }
    }

    /// Whether there is no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect the content into memory.
    ///
    /// # Errors
    ///
    /// Returns [`AtmosError::Validation`] when a reader ends before its
    /// declared length, or [`AtmosError::Connection`] when it fails.
    pub async fn into_bytes(self) -> AtmosResult<Bytes> {
        match self {
            Self::Bytes(data) => Ok(data),
            Self::Slice { data, offset, len } => Ok(data.slice(offset..offset + len)),
            Self::Reader { reader, length } => {
                let capacity = usize::try_from(length).map_err(|_| {
                    AtmosError::Validation(format!("content of {length} bytes is too large"))
                })?;
                let mut buf = BytesMut::with_capacity(capacity);
                let mut limited = reader.take(length);
                while (buf.len() as u64) < length {
                    let read = limited
                        .read_buf(&mut buf)
                        .await
                        .map_err(|e| AtmosError::Connection(Box::new(e)))?;
                    if read == 0 {
                        return Err(AtmosError::Validation(format!(
                            "content ended after {} of {length} bytes",
                            buf.len()
                        )));
                    }
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            Self::Slice { offset, len, .. } => f
                .debug_struct("Slice")
                .field("offset", offset)
                .field("len", len)
                .finish_non_exhaustive(),
            Self::Reader { length, .. } => f
                .debug_struct("Reader")
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

impl Default for ContentSource {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for ContentSource {
    fn from(data: Bytes) -> Self {
        Self::Bytes(data)
    }
}

impl From<Vec<u8>> for ContentSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(data.into())
    }
}

impl From<&'static [u8]> for ContentSource {
    fn from(data: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(data))
    }
}

impl From<String> for ContentSource {
    fn from(data: String) -> Self {
        Self::Bytes(data.into())
    }
}

impl From<&'static str> for ContentSource {
    fn from(data: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(data.as_bytes()))
    }
}
