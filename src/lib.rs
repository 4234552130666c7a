//! # bookie-io
//!
//! The write path and integrity layer beneath a log storage node:
//! - Buffered channel batching appends to an append-only file
//! - Byte-exact reads across flushed and still-buffered bytes
//! - Digest-framed entries (CRC32, CRC32C, HMAC-SHA1) with ledger binding
//! - Length-prefixed entry log composing the two
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Caller (ledger / replication)                │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │ frame / verify                │ append / read
//!                ▼                               ▼
//!   ┌─────────────────────────┐     ┌─────────────────────────┐
//!   │     DigestManager       │     │       EntryLog          │
//!   │ (CRC32/CRC32C/HMAC/none)│     │  (size-prefixed frames) │
//!   └─────────────────────────┘     └────────────┬────────────┘
//!                                                │
//!                                                ▼
//!                                   ┌─────────────────────────┐
//!                                   │    BufferedChannel      │
//!                                   │ (write buffer + Mutex)  │
//!                                   └────────────┬────────────┘
//!                                                │
//!                                                ▼
//!                                   ┌─────────────────────────┐
//!                                   │  LogStore (file / mem)  │
//!                                   └─────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod channel;
pub mod checksum;
pub mod entrylog;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BookieError, Result};
pub use config::Config;
pub use channel::{BufferedChannel, FileStore, LogStore, MemoryStore};
pub use checksum::{DigestManager, DigestType, EntryFrame, RecoveryData};
pub use entrylog::EntryLog;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bookie-io
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
