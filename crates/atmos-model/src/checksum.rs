//! Running content checksums.
//!
//! Atmos can verify content written in several chunks: the client keeps a
//! running hash across calls and sends its state in the `x-emc-wschecksum`
//! header as `<ALGORITHM>/<offset>/<hex digest>`, where `offset` is the total
//! number of bytes hashed so far. The same [`Checksum`] must be threaded
//! through every call of a multi-part upload or download; it takes `&mut`
//! access, so it cannot be shared between concurrent calls.

use std::fmt;
use std::str::FromStr;

use digest::Digest;
use md5::Md5;
use sha1::Sha1;

use crate::error::AtmosError;

// ---------------------------------------------------------------------------
// ChecksumAlgorithm
// ---------------------------------------------------------------------------

/// Checksum algorithms known to the Atmos wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    /// SHA-0. Recognized on the wire but not computable by this client.
    Sha0,
    /// SHA-1.
    Sha1,
    /// MD5.
    Md5,
}

impl ChecksumAlgorithm {
    /// The name used in the `x-emc-wschecksum` header.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha0 => "SHA0",
            Self::Sha1 => "SHA1",
            Self::Md5 => "MD5",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = AtmosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SHA0" => Ok(Self::Sha0),
            "SHA1" => Ok(Self::Sha1),
            "MD5" => Ok(Self::Md5),
            _ => Err(AtmosError::InvalidFormat {
                kind: "checksum algorithm",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ChecksumValue
// ---------------------------------------------------------------------------

/// A parsed `x-emc-wschecksum` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumValue {
    /// The algorithm used.
    pub algorithm: ChecksumAlgorithm,
    /// Number of bytes covered by the digest.
    pub offset: u64,
    /// Lowercase hex digest.
    pub value: String,
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.algorithm, self.offset, self.value)
    }
}

impl FromStr for ChecksumValue {
    type Err = AtmosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AtmosError::InvalidFormat {
            kind: "checksum",
            value: s.to_owned(),
        };
        let mut fields = s.trim().splitn(3, '/');
        let algorithm: ChecksumAlgorithm = fields.next().ok_or_else(invalid)?.parse()?;
        let offset = fields
            .next()
            .and_then(|o| o.parse::<u64>().ok())
            .ok_or_else(invalid)?;
        let value = fields.next().filter(|v| !v.is_empty()).ok_or_else(invalid)?;
        Ok(Self {
            algorithm,
            offset,
            value: value.to_ascii_lowercase(),
        })
    }
}

// ---------------------------------------------------------------------------
// Checksum
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum HashState {
    Sha1(Sha1),
    Md5(Md5),
}

/// Running checksum state threaded through chunked writes and reads.
#[derive(Clone)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    state: HashState,
    offset: u64,
    expected: Option<ChecksumValue>,
}

impl Checksum {
    /// Start a new checksum.
    ///
    /// # Errors
    /// Returns [`AtmosError::Validation`] for [`ChecksumAlgorithm::Sha0`], which
    /// this client cannot compute.
    pub fn new(algorithm: ChecksumAlgorithm) -> Result<Self, AtmosError> {
        let state = match algorithm {
            ChecksumAlgorithm::Sha1 => HashState::Sha1(Sha1::new()),
            ChecksumAlgorithm::Md5 => HashState::Md5(Md5::new()),
            ChecksumAlgorithm::Sha0 => {
                return Err(AtmosError::Validation(
                    "SHA0 checksums are not supported".to_owned(),
                ));
            }
        };
        Ok(Self {
            algorithm,
            state,
            offset: 0,
            expected: None,
        })
    }

    /// The algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Total number of bytes hashed so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Feed more content into the running hash.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HashState::Sha1(h) => Digest::update(h, data),
            HashState::Md5(h) => Digest::update(h, data),
        }
        self.offset += data.len() as u64;
    }

    /// Hex digest of everything hashed so far. The running state is kept.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        match &self.state {
            HashState::Sha1(h) => hex::encode(h.clone().finalize()),
            HashState::Md5(h) => hex::encode(h.clone().finalize()),
        }
    }

    /// The current state as a wire value.
    #[must_use]
    pub fn current(&self) -> ChecksumValue {
        ChecksumValue {
            algorithm: self.algorithm,
            offset: self.offset,
            value: self.digest_hex(),
        }
    }

    /// Record the checksum the server reported.
    pub fn set_expected(&mut self, expected: ChecksumValue) {
        self.expected = Some(expected);
    }

    /// The checksum the server reported, if any.
    #[must_use]
    pub fn expected(&self) -> Option<&ChecksumValue> {
        self.expected.as_ref()
    }

    /// Compare the running state with the expected value.
    ///
    /// Succeeds trivially when no expected value was recorded.
    ///
    /// # Errors
    /// Returns [`AtmosError::ChecksumMismatch`] when they differ.
    pub fn verify(&self) -> Result<(), AtmosError> {
        let Some(expected) = &self.expected else {
            return Ok(());
        };
        let actual = self.current();
        if *expected != actual {
            return Err(AtmosError::ChecksumMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checksum")
            .field("algorithm", &self.algorithm)
            .field("offset", &self.offset)
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.current().fmt(f)
    }
}
