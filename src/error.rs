//! Error types for bookie-io
//!
//! Provides a unified error type for the channel and digest layers.

use thiserror::Error;

/// Result type alias using BookieError
pub type Result<T> = std::result::Result<T, BookieError>;

/// Unified error type for bookie-io operations
#[derive(Debug, Error)]
pub enum BookieError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested range extends past the logical end of the channel
    #[error("Read past EOF: position {position} + length {length} exceeds {available} bytes")]
    EndOfData {
        position: u64,
        length: usize,
        available: u64,
    },

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Frame Errors
    // -------------------------------------------------------------------------
    /// Digest, ledger id or entry id of a frame did not match
    #[error("Digest mismatch: {0}")]
    DigestMismatch(String),

    /// Frame is too short or structurally invalid to be verified at all
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Security error: {0}")]
    Security(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BookieError {
    /// True for errors that mean a frame must not be trusted
    pub fn is_digest_mismatch(&self) -> bool {
        matches!(self, BookieError::DigestMismatch(_))
    }
}
