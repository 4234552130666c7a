//! Digest Manager
//!
//! Frames entries and LAC updates with a digest and verifies them on read.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::error;

use crate::config::Config;
use crate::error::{BookieError, Result};

use super::digest::{derive_key, DigestAlgorithm, DigestType, Digester, MAC_CODE_LENGTH};

/// ledger id (8) + entry id (8) + LAC (8) + length (8)
pub const METADATA_LENGTH: usize = 32;

/// ledger id (8) + LAC (8)
pub const LAC_METADATA_LENGTH: usize = 16;

/// Tail state read back from a frame during ledger recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryData {
    last_add_confirmed: i64,
    length: u64,
}

impl RecoveryData {
    pub fn new(last_add_confirmed: i64, length: u64) -> Self {
        Self {
            last_add_confirmed,
            length,
        }
    }

    pub fn last_add_confirmed(&self) -> i64 {
        self.last_add_confirmed
    }

    /// Ledger length recorded in the frame
    pub fn length(&self) -> u64 {
        self.length
    }
}

/// A digest-framed entry kept as two regions so the payload is never copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFrame {
    header: Bytes,
    payload: Bytes,
}

impl EntryFrame {
    /// Metadata followed by the digest
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Total framed size in bytes
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both regions copied into one contiguous buffer
    pub fn coalesce(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());
        buf.extend_from_slice(&self.header);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.header, self.payload)
    }
}

/// Produces and verifies frames for one ledger
///
/// ## Frame Layout (big-endian)
/// ```text
/// ┌────────────┬────────────┬─────────┬────────────┬──────────┬─────────┐
/// │ ledger (8) │ entry (8)  │ LAC (8) │ length (8) │ digest   │ payload │
/// └────────────┴────────────┴─────────┴────────────┴──────────┴─────────┘
/// ┌────────────┬─────────┬──────────┐
/// │ ledger (8) │ LAC (8) │ digest   │   (LAC frame)
/// └────────────┴─────────┴──────────┘
/// ```
/// The digest covers the metadata and the payload. Its width depends on the
/// digest type: CRC32 8, CRC32C 4, HMAC 20, DUMMY 0.
///
/// Holds no per-call state, so concurrent verification needs no locking.
#[derive(Debug, Clone)]
pub struct DigestManager {
    ledger_id: i64,
    algorithm: DigestAlgorithm,
    use_v2_protocol: bool,
}

impl DigestManager {
    /// Create a manager bound to `ledger_id`
    ///
    /// `password` keys the HMAC variant and is ignored otherwise.
    pub fn instantiate(
        ledger_id: i64,
        password: &[u8],
        digest_type: DigestType,
        use_v2_protocol: bool,
    ) -> Result<Self> {
        let algorithm = DigestAlgorithm::new(digest_type, password)?;

        Ok(Self {
            ledger_id,
            algorithm,
            use_v2_protocol,
        })
    }

    /// Create a manager using the digest settings from `config`
    pub fn from_config(ledger_id: i64, password: &[u8], config: &Config) -> Result<Self> {
        Self::instantiate(
            ledger_id,
            password,
            config.digest_type,
            config.use_v2_protocol,
        )
    }

    /// Master key a bookie stores to authorize writes to a ledger
    pub fn generate_master_key(password: &[u8]) -> [u8; MAC_CODE_LENGTH] {
        derive_key(b"ledger", password)
    }

    pub fn ledger_id(&self) -> i64 {
        self.ledger_id
    }

    pub fn digest_type(&self) -> DigestType {
        self.algorithm.digest_type()
    }

    /// Width of the digest in every frame this manager handles
    pub fn mac_code_length(&self) -> usize {
        self.algorithm.digest_length()
    }

    pub fn use_v2_protocol(&self) -> bool {
        self.use_v2_protocol
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Frame `payload` as entry `entry_id`
    ///
    /// Entry ids and LAC are written as given, sentinels such as `-1`
    /// included. `length` must equal the payload size.
    pub fn compute_digest_and_package_for_sending(
        &self,
        entry_id: i64,
        last_add_confirmed: i64,
        length: u64,
        payload: Bytes,
    ) -> Result<EntryFrame> {
        if payload.len() as u64 != length {
            return Err(BookieError::InvalidArgument(format!(
                "declared length {} does not match payload of {} bytes",
                length,
                payload.len()
            )));
        }

        let mut header = BytesMut::with_capacity(METADATA_LENGTH + self.mac_code_length());
        header.put_i64(self.ledger_id);
        header.put_i64(entry_id);
        header.put_i64(last_add_confirmed);
        header.put_u64(length);

        let digest = self.algorithm.compute(&[&header[..], &payload[..]]);
        header.extend_from_slice(&digest);

        Ok(EntryFrame {
            header: header.freeze(),
            payload,
        })
    }

    /// Verify a contiguous frame for `entry_id` and return its payload
    pub fn verify_digest_and_return_data(&self, entry_id: i64, frame: &Bytes) -> Result<Bytes> {
        self.verify_digest(Some(entry_id), frame)?;
        Ok(frame.slice(METADATA_LENGTH + self.mac_code_length()..))
    }

    /// Verify a frame without checking its entry id and return its tail state
    pub fn verify_digest_and_return_last_confirmed(&self, frame: &[u8]) -> Result<RecoveryData> {
        self.verify_digest(None, frame)?;

        let mut metadata = &frame[16..METADATA_LENGTH];
        let last_add_confirmed = metadata.get_i64();
        let length = metadata.get_u64();
        Ok(RecoveryData::new(last_add_confirmed, length))
    }

    fn verify_digest(&self, entry_id: Option<i64>, frame: &[u8]) -> Result<()> {
        let digest_len = self.mac_code_length();
        if frame.len() < METADATA_LENGTH + digest_len {
            error!(
                ledger_id = self.ledger_id,
                digest_type = %self.digest_type(),
                frame_len = frame.len(),
                "frame is smaller than the minimum for this digest type"
            );
            return Err(BookieError::MalformedFrame(format!(
                "frame of {} bytes is shorter than the {} byte header for {}",
                frame.len(),
                METADATA_LENGTH + digest_len,
                self.digest_type()
            )));
        }

        let (metadata, rest) = frame.split_at(METADATA_LENGTH);
        let (digest, payload) = rest.split_at(digest_len);

        let mut fields = metadata;
        let actual_ledger_id = fields.get_i64();
        let actual_entry_id = fields.get_i64();

        if !self.algorithm.verify(&[metadata, payload], digest) {
            error!(
                ledger_id = self.ledger_id,
                entry_id = actual_entry_id,
                "mac mismatch"
            );
            return Err(BookieError::DigestMismatch(format!(
                "digest mismatch for ledger {} entry {}",
                self.ledger_id, actual_entry_id
            )));
        }

        self.check_ledger_id(actual_ledger_id)?;

        if let Some(expected) = entry_id {
            if actual_entry_id != expected {
                error!(
                    ledger_id = self.ledger_id,
                    expected,
                    actual = actual_entry_id,
                    "entry id mismatch in authenticated message"
                );
                return Err(BookieError::DigestMismatch(format!(
                    "entry id mismatch: expected {}, actual {}",
                    expected, actual_entry_id
                )));
            }
        }

        Ok(())
    }

    // =========================================================================
    // Last Add Confirmed
    // =========================================================================

    /// Frame a LAC update for this ledger
    pub fn compute_digest_and_package_for_sending_lac(&self, last_add_confirmed: i64) -> Bytes {
        let mut buf = BytesMut::with_capacity(LAC_METADATA_LENGTH + self.mac_code_length());
        buf.put_i64(self.ledger_id);
        buf.put_i64(last_add_confirmed);

        let digest = self.algorithm.compute(&[&buf[..]]);
        buf.extend_from_slice(&digest);
        buf.freeze()
    }

    /// Verify a LAC frame and return the LAC it carries
    pub fn verify_digest_and_return_lac(&self, frame: &[u8]) -> Result<i64> {
        let expected_len = LAC_METADATA_LENGTH + self.mac_code_length();
        if frame.len() != expected_len {
            error!(
                ledger_id = self.ledger_id,
                digest_type = %self.digest_type(),
                frame_len = frame.len(),
                "lac frame has the wrong size for this digest type"
            );
            return Err(BookieError::MalformedFrame(format!(
                "lac frame of {} bytes, expected {} for {}",
                frame.len(),
                expected_len,
                self.digest_type()
            )));
        }

        let (metadata, digest) = frame.split_at(LAC_METADATA_LENGTH);
        if !self.algorithm.verify(&[metadata], digest) {
            error!(ledger_id = self.ledger_id, "mac mismatch on lac frame");
            return Err(BookieError::DigestMismatch(format!(
                "lac digest mismatch for ledger {}",
                self.ledger_id
            )));
        }

        let mut fields = metadata;
        let actual_ledger_id = fields.get_i64();
        let last_add_confirmed = fields.get_i64();

        self.check_ledger_id(actual_ledger_id)?;
        Ok(last_add_confirmed)
    }

    fn check_ledger_id(&self, actual: i64) -> Result<()> {
        if actual != self.ledger_id {
            error!(
                expected = self.ledger_id,
                actual,
                "ledger id mismatch in authenticated message"
            );
            return Err(BookieError::DigestMismatch(format!(
                "ledger id mismatch: expected {}, actual {}",
                self.ledger_id, actual
            )));
        }
        Ok(())
    }
}
