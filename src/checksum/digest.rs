//! Digest algorithms
//!
//! The checksum / MAC variants an entry frame can carry.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::error::{BookieError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Width of an HMAC-SHA1 code and of password-derived keys
pub const MAC_CODE_LENGTH: usize = 20;

/// Digest algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestType {
    /// CRC-32 (IEEE), stored widened to 8 bytes
    Crc32,
    /// CRC-32C (Castagnoli), 4 bytes
    Crc32c,
    /// HMAC-SHA1 keyed by the ledger password, 20 bytes
    Hmac,
    /// No digest at all; for trusted channels and tests
    Dummy,
}

impl DigestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestType::Crc32 => "CRC32",
            DigestType::Crc32c => "CRC32C",
            DigestType::Hmac => "HMAC",
            DigestType::Dummy => "DUMMY",
        }
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestType {
    type Err = BookieError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CRC32" => Ok(DigestType::Crc32),
            "CRC32C" => Ok(DigestType::Crc32c),
            "HMAC" | "MAC" => Ok(DigestType::Hmac),
            "DUMMY" => Ok(DigestType::Dummy),
            other => Err(BookieError::InvalidArgument(format!(
                "unknown digest type: {}",
                other
            ))),
        }
    }
}

/// Capability shared by every digest algorithm
///
/// `chunks` are digested as if concatenated, so a header and a payload can be
/// covered without copying them together.
pub trait Digester {
    /// Bytes the digest occupies in a frame
    fn digest_length(&self) -> usize;

    /// Digest of the concatenated chunks
    fn compute(&self, chunks: &[&[u8]]) -> Vec<u8>;

    /// Constant-time check of `expected` against the digest of `chunks`
    fn verify(&self, chunks: &[&[u8]], expected: &[u8]) -> bool {
        let actual = self.compute(chunks);
        bool::from(actual.as_slice().ct_eq(expected))
    }
}

/// A digest algorithm, with key material only for the HMAC variant
#[derive(Clone)]
pub enum DigestAlgorithm {
    Crc32,
    Crc32c,
    Hmac(HmacSha1),
    Dummy,
}

impl DigestAlgorithm {
    /// Build the algorithm for `digest_type`; `password` is only used by HMAC
    pub fn new(digest_type: DigestType, password: &[u8]) -> Result<Self> {
        Ok(match digest_type {
            DigestType::Crc32 => DigestAlgorithm::Crc32,
            DigestType::Crc32c => DigestAlgorithm::Crc32c,
            DigestType::Dummy => DigestAlgorithm::Dummy,
            DigestType::Hmac => {
                let key = derive_key(b"mac", password);
                let mac = HmacSha1::new_from_slice(&key).map_err(|e| {
                    BookieError::Security(format!("failed to initialize HMAC key: {}", e))
                })?;
                DigestAlgorithm::Hmac(mac)
            }
        })
    }

    pub fn digest_type(&self) -> DigestType {
        match self {
            DigestAlgorithm::Crc32 => DigestType::Crc32,
            DigestAlgorithm::Crc32c => DigestType::Crc32c,
            DigestAlgorithm::Hmac(_) => DigestType::Hmac,
            DigestAlgorithm::Dummy => DigestType::Dummy,
        }
    }
}

impl fmt::Debug for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keyed state stays out of logs.
        write!(f, "DigestAlgorithm({})", self.digest_type())
    }
}

impl Digester for DigestAlgorithm {
    fn digest_length(&self) -> usize {
        match self {
            DigestAlgorithm::Crc32 => 8,
            DigestAlgorithm::Crc32c => 4,
            DigestAlgorithm::Hmac(_) => MAC_CODE_LENGTH,
            DigestAlgorithm::Dummy => 0,
        }
    }

    fn compute(&self, chunks: &[&[u8]]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Crc32 => {
                let mut hasher = crc32fast::Hasher::new();
                for chunk in chunks {
                    hasher.update(chunk);
                }
                u64::from(hasher.finalize()).to_be_bytes().to_vec()
            }
            DigestAlgorithm::Crc32c => {
                let crc = chunks
                    .iter()
                    .fold(0u32, |crc, chunk| crc32c::crc32c_append(crc, chunk));
                crc.to_be_bytes().to_vec()
            }
            DigestAlgorithm::Hmac(keyed) => {
                let mut mac = keyed.clone();
                for chunk in chunks {
                    Mac::update(&mut mac, chunk);
                }
                mac.finalize().into_bytes().to_vec()
            }
            DigestAlgorithm::Dummy => Vec::new(),
        }
    }
}

/// SHA-1 of `pad || password`
pub(crate) fn derive_key(pad: &[u8], password: &[u8]) -> [u8; MAC_CODE_LENGTH] {
    let mut hasher = Sha1::new();
    Digest::update(&mut hasher, pad);
    Digest::update(&mut hasher, password);

    let mut key = [0u8; MAC_CODE_LENGTH];
    key.copy_from_slice(&hasher.finalize());
    key
}
