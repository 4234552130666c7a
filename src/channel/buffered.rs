//! Buffered Channel
//!
//! Batches appends to a `LogStore` and serves reads spanning flushed and
//! still-buffered bytes.

use std::path::Path;

use bytes::BytesMut;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::{check_capacity, Config};
use crate::error::{BookieError, Result};

use super::store::{FileStore, LogStore};

/// Write-buffered channel over a single log store
///
/// ## Concurrency:
/// - `state`: Mutex over {write buffer, buffer start position, unpersisted
///   counter}. Held for a whole write or flush (including the sync of a
///   threshold trip) and for the planning phase of a read, so readers never
///   observe a half-applied flush.
/// - `read_buffer`: separate Mutex for the read-ahead cache. Bytes below the
///   buffer start position are immutable, so disk reads run without `state`.
pub struct BufferedChannel<S: LogStore = FileStore> {
    /// Underlying store, owned for the channel's lifetime
    store: S,

    /// Write buffer size that triggers a spill (`0` = write-through)
    write_capacity: usize,

    /// Read-ahead window for disk-resident reads (`0` = disabled)
    read_capacity: usize,

    /// Unpersisted bytes that trigger flush + sync (`0` = disabled)
    unpersisted_bytes_bound: u64,

    state: Mutex<WriteState>,

    read_buffer: Mutex<ReadBuffer>,
}

struct WriteState {
    /// Bytes accepted but not yet written to the store
    write_buffer: BytesMut,

    /// Store offset of the first byte in `write_buffer`; also the durable end
    write_buffer_start_position: u64,

    /// Bytes accepted since the last whole-buffer flush
    unpersisted_bytes: u64,
}

#[derive(Default)]
struct ReadBuffer {
    start: u64,
    data: Vec<u8>,
}

impl ReadBuffer {
    fn covers(&self, position: u64, end: u64) -> bool {
        !self.data.is_empty() && self.start <= position && end <= self.start + self.data.len() as u64
    }
}

impl BufferedChannel<FileStore> {
    /// Open a file-backed channel that appends after any existing content
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        let store = FileStore::open(path)?;
        Self::from_config(store, config)
    }
}

impl<S: LogStore> BufferedChannel<S> {
    /// Create a channel whose read-ahead window equals `write_capacity`
    pub fn new(store: S, write_capacity: usize, unpersisted_bytes_bound: u64) -> Result<Self> {
        Self::with_capacities(store, write_capacity, write_capacity, unpersisted_bytes_bound)
    }

    /// Create a channel using the channel settings from `config`
    pub fn from_config(store: S, config: &Config) -> Result<Self> {
        Self::with_capacities(
            store,
            config.write_capacity,
            config.read_capacity,
            config.unpersisted_bytes_bound,
        )
    }

    /// Create a channel with explicit write and read-ahead capacities
    ///
    /// Buffering starts at the store's current size. Capacities above
    /// `MAX_BUFFER_CAPACITY` are rejected.
    pub fn with_capacities(
        store: S,
        write_capacity: usize,
        read_capacity: usize,
        unpersisted_bytes_bound: u64,
    ) -> Result<Self> {
        check_capacity("write_capacity", write_capacity)?;
        check_capacity("read_capacity", read_capacity)?;
        let start = store.size()?;

        Ok(Self {
            store,
            write_capacity,
            read_capacity,
            unpersisted_bytes_bound,
            state: Mutex::new(WriteState {
                write_buffer: BytesMut::with_capacity(write_capacity),
                write_buffer_start_position: start,
                unpersisted_bytes: 0,
            }),
            read_buffer: Mutex::new(ReadBuffer::default()),
        })
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Append `src` to the channel
    ///
    /// Whenever the buffer fills to capacity it is spilled to the store, so a
    /// write larger than capacity leaves `len % capacity` bytes buffered.
    /// Crossing `unpersisted_bytes_bound` flushes everything and syncs.
    ///
    /// On error nothing is applied: the buffer, start position and counter
    /// are as before the call and the same bytes can be written again. Bytes
    /// that reached the store before the failure sit past the durable end and
    /// are overwritten in place by the retry.
    pub fn write(&self, src: &[u8]) -> Result<()> {
        let mut state = self.state.lock();

        let buffered = state.write_buffer.len();
        let total = buffered + src.len();
        let unpersisted = state.unpersisted_bytes + src.len() as u64;
        let threshold_tripped =
            self.unpersisted_bytes_bound > 0 && unpersisted >= self.unpersisted_bytes_bound;
        let write_through = self.write_capacity == 0;

        let drain = if threshold_tripped || write_through {
            total
        } else {
            total - total % self.write_capacity
        };

        if drain == 0 {
            state.write_buffer.extend_from_slice(src);
            state.unpersisted_bytes = unpersisted;
            trace!(
                bytes = src.len(),
                buffered = state.write_buffer.len(),
                "buffered write"
            );
            return Ok(());
        }

        debug_assert!(drain >= buffered);
        let start = state.write_buffer_start_position;
        let from_src = drain - buffered;

        // Stage the drained prefix behind the buffered bytes so the store sees
        // one contiguous write, then undo the staging on failure.
        state.write_buffer.extend_from_slice(&src[..from_src]);
        let stored = self
            .store
            .write_all_at(start, &state.write_buffer)
            .and_then(|()| {
                if threshold_tripped {
                    self.store.sync(false)
                } else {
                    Ok(())
                }
            });
        if let Err(e) = stored {
            state.write_buffer.truncate(buffered);
            return Err(e.into());
        }

        state.write_buffer.clear();
        state.write_buffer.extend_from_slice(&src[from_src..]);
        state.write_buffer_start_position = start + drain as u64;
        state.unpersisted_bytes = if threshold_tripped || write_through {
            0
        } else {
            unpersisted
        };

        debug!(
            offset = start,
            drained = drain,
            remaining = state.write_buffer.len(),
            threshold_tripped,
            "drained write buffer"
        );
        if threshold_tripped {
            trace!(position = start + drain as u64, "synced store");
        }
        Ok(())
    }

    /// Write every buffered byte to the store
    ///
    /// A no-op on an empty buffer apart from resetting the unpersisted counter.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();

        if !state.write_buffer.is_empty() {
            let start = state.write_buffer_start_position;
            self.store.write_all_at(start, &state.write_buffer)?;

            let flushed = state.write_buffer.len();
            state.write_buffer.clear();
            state.write_buffer_start_position = start + flushed as u64;
            debug!(offset = start, flushed, "flushed write buffer");
        }

        state.unpersisted_bytes = 0;
        Ok(())
    }

    /// Sync the store, returning the durable position that was synced
    pub fn force_write(&self, force_metadata: bool) -> Result<u64> {
        let position = self.state.lock().write_buffer_start_position;
        self.store.sync(force_metadata)?;
        trace!(position, force_metadata, "synced store");
        Ok(position)
    }

    /// Flush the buffer, then sync the store
    pub fn flush_and_force_write(&self, force_metadata: bool) -> Result<u64> {
        self.flush()?;
        self.force_write(force_metadata)
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Append exactly `length` bytes located at `position` to `dest`
    ///
    /// The range may lie on disk, in the write buffer, or span both. Reads are
    /// all-or-nothing: a range ending past the logical end fails with
    /// `EndOfData` and `dest` is left untouched on any error.
    ///
    /// Returns the number of bytes appended, always `length`.
    pub fn read(&self, dest: &mut BytesMut, position: u64, length: usize) -> Result<usize> {
        let end = position.checked_add(length as u64).ok_or_else(|| {
            BookieError::InvalidArgument(format!(
                "read range overflows: position {} length {}",
                position, length
            ))
        })?;

        // Plan under the lock: snapshot the durable end and copy out whatever
        // part of the range is still buffered.
        let (durable_end, buffered_part) = {
            let state = self.state.lock();
            let start = state.write_buffer_start_position;
            let available = start + state.write_buffer.len() as u64;

            if end > available {
                return Err(BookieError::EndOfData {
                    position,
                    length,
                    available,
                });
            }

            let buffered_part = if end > start {
                let from = (position.max(start) - start) as usize;
                let to = (end - start) as usize;
                state.write_buffer[from..to].to_vec()
            } else {
                Vec::new()
            };
            (start, buffered_part)
        };

        if length == 0 {
            return Ok(0);
        }

        let base = dest.len();
        dest.reserve(length);

        if position < durable_end {
            if let Err(e) = self.read_from_store(dest, position, end.min(durable_end), durable_end) {
                dest.truncate(base);
                return Err(e);
            }
        }
        dest.extend_from_slice(&buffered_part);

        Ok(length)
    }

    /// Read `[position, end)` from the store, through the read-ahead buffer
    /// when the range fits in it
    fn read_from_store(
        &self,
        dest: &mut BytesMut,
        position: u64,
        end: u64,
        durable_end: u64,
    ) -> Result<()> {
        let len = (end - position) as usize;

        if self.read_capacity == 0 || len > self.read_capacity {
            let base = dest.len();
            dest.resize(base + len, 0);
            self.store.read_exact_at(position, &mut dest[base..])?;
            return Ok(());
        }

        let mut cache = self.read_buffer.lock();
        if !cache.covers(position, end) {
            // Never read ahead past the durable end seen while planning.
            let fill = (self.read_capacity as u64).min(durable_end - position) as usize;
            cache.start = position;
            cache.data.resize(fill, 0);
            if let Err(e) = self.store.read_exact_at(position, &mut cache.data) {
                cache.data.clear();
                return Err(e.into());
            }
            trace!(position, fill, "filled read buffer");
        }

        let from = (position - cache.start) as usize;
        dest.extend_from_slice(&cache.data[from..from + len]);
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Release the store without flushing
    ///
    /// Buffered bytes are discarded; callers that need them durable must
    /// `flush` first. Returns the number of bytes discarded.
    pub fn close(self) -> usize {
        let state = self.state.into_inner();
        let discarded = state.write_buffer.len();

        if discarded > 0 {
            warn!(
                discarded,
                offset = state.write_buffer_start_position,
                "closing channel with unflushed bytes"
            );
        }
        discarded
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Logical end of the channel: flushed plus buffered bytes
    pub fn position(&self) -> u64 {
        let state = self.state.lock();
        state.write_buffer_start_position + state.write_buffer.len() as u64
    }

    /// End of the data written to the store
    pub fn file_position(&self) -> u64 {
        self.state.lock().write_buffer_start_position
    }

    /// Store offset of the first buffered byte
    pub fn write_buffer_start_position(&self) -> u64 {
        self.state.lock().write_buffer_start_position
    }

    pub fn num_bytes_in_write_buffer(&self) -> usize {
        self.state.lock().write_buffer.len()
    }

    pub fn unpersisted_bytes(&self) -> u64 {
        self.state.lock().unpersisted_bytes
    }

    /// Current size reported by the store
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.store.size()?)
    }

    pub fn write_capacity(&self) -> usize {
        self.write_capacity
    }

    pub fn read_capacity(&self) -> usize {
        self.read_capacity
    }

    pub fn unpersisted_bytes_bound(&self) -> u64 {
        self.unpersisted_bytes_bound
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}
