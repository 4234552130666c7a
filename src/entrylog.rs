//! Entry Log
//!
//! Length-prefixed entry records appended through a `BufferedChannel`.
//!
//! ## Record Format
//! ```text
//! ┌──────────┬──────────────────────────────────────┐
//! │ Size (4) │ Frame (header + digest + payload)    │
//! └──────────┴──────────────────────────────────────┘
//! ```

use std::path::Path;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::trace;

use crate::channel::{BufferedChannel, FileStore, LogStore};
use crate::checksum::EntryFrame;
use crate::config::Config;
use crate::error::{BookieError, Result};

/// Size prefix in front of every record
pub const RECORD_HEADER_SIZE: usize = 4;

/// Append-only log of framed entries
pub struct EntryLog<S: LogStore = FileStore> {
    channel: BufferedChannel<S>,

    /// Serializes appends so a record's offset and bytes stay together
    append_lock: Mutex<()>,
}

impl EntryLog<FileStore> {
    /// Open or create a file-backed entry log
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        Ok(Self::new(BufferedChannel::open(path, config)?))
    }
}

impl<S: LogStore> EntryLog<S> {
    pub fn new(channel: BufferedChannel<S>) -> Self {
        Self {
            channel,
            append_lock: Mutex::new(()),
        }
    }

    /// Append a frame, returning the offset of its record
    pub fn add_entry(&self, frame: &EntryFrame) -> Result<u64> {
        let size = u32::try_from(frame.len()).map_err(|_| {
            BookieError::InvalidArgument(format!("entry of {} bytes is too large", frame.len()))
        })?;

        let mut record = BytesMut::with_capacity(RECORD_HEADER_SIZE + frame.len());
        record.put_u32(size);
        record.extend_from_slice(frame.header());
        record.extend_from_slice(frame.payload());

        let _guard = self.append_lock.lock();
        let offset = self.channel.position();
        self.channel.write(&record)?;

        trace!(offset, size, "added entry");
        Ok(offset)
    }

    /// Read the frame stored at `offset`
    pub fn read_entry(&self, offset: u64) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(RECORD_HEADER_SIZE);
        self.channel.read(&mut buf, offset, RECORD_HEADER_SIZE)?;
        let size = buf.get_u32() as usize;

        buf.clear();
        self.channel
            .read(&mut buf, offset + RECORD_HEADER_SIZE as u64, size)?;
        Ok(buf.freeze())
    }

    /// Iterate over every record from the start of the log
    ///
    /// Buffered records are included. A truncated trailing record is
    /// reported once as an error, after which iteration stops.
    pub fn scan(&self) -> EntryLogScanner<'_, S> {
        EntryLogScanner {
            log: self,
            offset: 0,
            done: false,
        }
    }

    /// Flush buffered records and sync them to disk
    pub fn flush(&self) -> Result<()> {
        self.channel.flush_and_force_write(false)?;
        Ok(())
    }

    /// Logical end of the log
    pub fn position(&self) -> u64 {
        self.channel.position()
    }

    pub fn channel(&self) -> &BufferedChannel<S> {
        &self.channel
    }

    /// Close without flushing; returns the number of bytes discarded
    pub fn close(self) -> usize {
        self.channel.close()
    }
}

/// Iterator over `(offset, frame)` records of an entry log
pub struct EntryLogScanner<'a, S: LogStore> {
    log: &'a EntryLog<S>,
    offset: u64,
    done: bool,
}

impl<'a, S: LogStore> Iterator for EntryLogScanner<'a, S> {
    type Item = Result<(u64, Bytes)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.log.position() {
            return None;
        }

        let offset = self.offset;
        match self.log.read_entry(offset) {
            Ok(frame) => {
                self.offset = offset + (RECORD_HEADER_SIZE + frame.len()) as u64;
                Some(Ok((offset, frame)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
