//! Byte ranges of object content.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AtmosError;

/// A byte range `(offset, size)` of object content.
///
/// [`Extent::ALL_CONTENT`] stands for the entire object and never produces a
/// `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawExtent")]
pub struct Extent {
    offset: u64,
    size: u64,
}

/// Unchecked wire form of [`Extent`].
#[derive(Deserialize)]
struct RawExtent {
    offset: u64,
    size: u64,
}

impl TryFrom<RawExtent> for Extent {
    type Error = AtmosError;

    fn try_from(raw: RawExtent) -> Result<Self, Self::Error> {
        Extent::new(raw.offset, raw.size)
    }
}

impl Extent {
    /// Sentinel meaning "the whole object".
    pub const ALL_CONTENT: Extent = Extent {
        offset: 0,
        size: u64::MAX,
    };

    /// Create an extent.
    ///
    /// # Errors
    /// Returns [`AtmosError::Validation`] for an empty extent or one whose end
    /// overflows `u64`.
    pub fn new(offset: u64, size: u64) -> Result<Self, AtmosError> {
        if size == 0 {
            return Err(AtmosError::Validation("extent size must be positive".to_owned()));
        }
        if offset.checked_add(size).is_none() {
            return Err(AtmosError::Validation(format!(
                "extent {offset}+{size} overflows"
            )));
        }
        Ok(Self { offset, size })
    }

    /// First byte of the range.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes in the range.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last byte of the range (inclusive).
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.size - 1
    }

    /// Whether this is the [`Extent::ALL_CONTENT`] sentinel.
    #[must_use]
    pub fn is_all_content(&self) -> bool {
        *self == Self::ALL_CONTENT
    }

    /// The `start-end` form used inside `Range` and `Content-Range` headers.
    #[must_use]
    pub fn range_spec(&self) -> String {
        format!("{}-{}", self.offset, self.end())
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all_content() {
            f.write_str("all")
        } else {
            f.write_str(&self.range_spec())
        }
    }
}
