//! Buffered Channel Module
//!
//! Write batching over an append-only log file.
//!
//! ## Responsibilities
//! - Absorb appends in memory, spilling to the store at capacity
//! - Flush and sync once enough unpersisted bytes accumulate
//! - Serve byte-exact reads across flushed and buffered bytes
//!
//! ## Layout
//! ```text
//!   0                  write_buffer_start_position            position
//!   ├──────── store (durable) ────────┼──────── write buffer ────────┤
//!   │  read via positional I/O        │  copied under the state lock │
//!   └─────────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Closing a channel never flushes: buffered bytes are dropped unless the
//! caller flushed them first.

mod buffered;
mod store;

pub use buffered::BufferedChannel;
pub use store::{FileStore, LogStore, MemoryStore};
