//! Configuration for bookie-io
//!
//! Centralized configuration with sensible defaults.

use crate::checksum::DigestType;
use crate::error::{BookieError, Result};

/// Largest write or read buffer a channel will allocate (1 GiB)
pub const MAX_BUFFER_CAPACITY: usize = 1 << 30;

/// Configuration shared by buffered channels and digest managers
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Channel Configuration
    // -------------------------------------------------------------------------
    /// Bytes held in the write buffer before it is spilled to the store.
    /// `0` writes every call straight through.
    pub write_capacity: usize,

    /// Read-ahead buffer used for ranges that are already on disk.
    /// `0` disables read-ahead.
    pub read_capacity: usize,

    /// Bytes accepted since the last flush that force a flush + sync.
    /// `0` disables threshold flushes; callers flush explicitly.
    pub unpersisted_bytes_bound: u64,

    // -------------------------------------------------------------------------
    // Digest Configuration
    // -------------------------------------------------------------------------
    /// Checksum algorithm used to frame entries
    pub digest_type: DigestType,

    /// Frame entries for the v2 wire protocol
    pub use_v2_protocol: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_capacity: 64 * 1024, // 64 KB
            read_capacity: 512,
            unpersisted_bytes_bound: 0,
            digest_type: DigestType::Crc32c,
            use_v2_protocol: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the channel settings can be honoured
    pub fn validate(&self) -> Result<()> {
        check_capacity("write_capacity", self.write_capacity)?;
        check_capacity("read_capacity", self.read_capacity)
    }
}

pub(crate) fn check_capacity(name: &str, bytes: usize) -> Result<()> {
    if bytes > MAX_BUFFER_CAPACITY {
        return Err(BookieError::Config(format!(
            "{} of {} bytes exceeds maximum of {} bytes",
            name, bytes, MAX_BUFFER_CAPACITY
        )));
    }
    Ok(())
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the write buffer capacity (in bytes)
    pub fn write_capacity(mut self, bytes: usize) -> Self {
        self.config.write_capacity = bytes;
        self
    }

    /// Set the read-ahead buffer capacity (in bytes)
    pub fn read_capacity(mut self, bytes: usize) -> Self {
        self.config.read_capacity = bytes;
        self
    }

    /// Set the unpersisted bytes bound (in bytes)
    pub fn unpersisted_bytes_bound(mut self, bytes: u64) -> Self {
        self.config.unpersisted_bytes_bound = bytes;
        self
    }

    /// Set the digest type
    pub fn digest_type(mut self, digest_type: DigestType) -> Self {
        self.config.digest_type = digest_type;
        self
    }

    /// Use the v2 wire protocol when framing entries
    pub fn use_v2_protocol(mut self, enabled: bool) -> Self {
        self.config.use_v2_protocol = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
