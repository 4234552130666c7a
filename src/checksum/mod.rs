//! Checksum Module
//!
//! Tamper-evident framing for log entries.
//!
//! ## Responsibilities
//! - Prefix each entry with ledger id, entry id, LAC and length
//! - Digest header and payload with CRC32, CRC32C, HMAC-SHA1 or nothing
//! - Reject frames whose digest, ledger id or entry id does not match
//! - Extract LAC and length for ledger recovery
//!
//! Frames too short to hold a header are `MalformedFrame`; every other
//! verification failure is `DigestMismatch`.

mod digest;
mod manager;

pub use digest::{DigestAlgorithm, DigestType, Digester, MAC_CODE_LENGTH};
pub use manager::{DigestManager, EntryFrame, RecoveryData, LAC_METADATA_LENGTH, METADATA_LENGTH};
