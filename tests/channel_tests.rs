//! Tests for BufferedChannel
//!
//! These tests verify:
//! - Durable size only grows at capacity spills, threshold trips and flushes
//! - Reads across flushed and buffered bytes
//! - End-of-data handling (all-or-nothing reads)
//! - Close policy (no implicit flush)
//! - Failure atomicity and retry
//! - Concurrent readers against a single writer

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use bookie_io::channel::{BufferedChannel, FileStore, LogStore, MemoryStore};
use bookie_io::config::MAX_BUFFER_CAPACITY;
use bookie_io::{BookieError, Config};
use bytes::{BufMut, BytesMut};
use rand::{Rng, RngCore};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const HEADER_SIZE: usize = 32;

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("test.log");
    (temp_dir, log_path)
}

fn open_channel(path: &PathBuf, capacity: usize, bound: u64) -> BufferedChannel<FileStore> {
    BufferedChannel::new(FileStore::open(path).unwrap(), capacity, bound).unwrap()
}

/// 32-byte entry header followed by `length` random bytes
fn generate_entry(length: usize) -> Vec<u8> {
    let mut data = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut data);

    let mut entry = BytesMut::with_capacity(HEADER_SIZE + length);
    entry.put_i64(0);
    entry.put_i64(1);
    entry.put_i64(2);
    entry.put_i64(length as i64);
    entry.extend_from_slice(&data);
    entry.to_vec()
}

fn read_vec<S: LogStore>(channel: &BufferedChannel<S>, position: u64, length: usize) -> Vec<u8> {
    let mut dest = BytesMut::new();
    let n = channel.read(&mut dest, position, length).unwrap();
    assert_eq!(n, length);
    dest.to_vec()
}

/// Store whose writes and syncs can be made to fail on demand
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_syncs: AtomicBool,
    write_calls: AtomicUsize,
    syncs: AtomicUsize,
}

impl FailingStore {
    fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn set_failing_syncs(&self, failing: bool) {
        self.fail_syncs.store(failing, Ordering::SeqCst);
    }

    fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }
}

impl LogStore for FailingStore {
    fn write_all_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        self.inner.write_all_at(offset, data)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        self.inner.size()
    }

    fn sync(&self, force_metadata: bool) -> io::Result<()> {
        if self.fail_syncs.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sync failure"));
        }
        self.syncs.fetch_add(1, Ordering::SeqCst);
        self.inner.sync(force_metadata)
    }
}

// =============================================================================
// Write / Flush Threshold Tests
// =============================================================================

#[test]
fn test_write_below_thresholds_stays_buffered() {
    let (_temp, path) = setup_temp_log();
    let channel = open_channel(&path, 40, 1 + HEADER_SIZE as u64);

    channel.write(&generate_entry(0)).unwrap();

    assert_eq!(channel.file_size().unwrap(), 0);
    assert_eq!(channel.num_bytes_in_write_buffer(), 32);
    assert_eq!(channel.position(), 32);
}

#[test]
fn test_write_reaching_bound_flushes() {
    let (_temp, path) = setup_temp_log();
    let channel = open_channel(&path, 40, 1 + HEADER_SIZE as u64);

    channel.write(&generate_entry(1)).unwrap();

    assert_eq!(channel.file_size().unwrap(), 33);
    assert_eq!(channel.num_bytes_in_write_buffer(), 0);
    assert_eq!(channel.unpersisted_bytes(), 0);
    assert_eq!(channel.write_buffer_start_position(), 33);
}

#[test]
fn test_zero_bound_disables_threshold_flush() {
    let (_temp, path) = setup_temp_log();
    let channel = open_channel(&path, 40, 0);

    channel.write(&generate_entry(1)).unwrap();

    assert_eq!(channel.file_size().unwrap(), 0);
    assert_eq!(channel.unpersisted_bytes(), 33);
}

#[test]
fn test_write_larger_than_capacity_spills_full_buffers() {
    let (_temp, path) = setup_temp_log();
    let channel = open_channel(&path, 40, 0);

    channel.write(&generate_entry(12)).unwrap();

    assert_eq!(channel.file_size().unwrap(), 40);
    assert_eq!(channel.num_bytes_in_write_buffer(), 4);
    assert_eq!(channel.write_buffer_start_position(), 40);
    assert_eq!(channel.position(), 44);
}

#[test]
fn test_spill_then_bound_flushes_everything() {
    let (_temp, path) = setup_temp_log();
    let channel = open_channel(&path, 40, 12 + HEADER_SIZE as u64);

    channel.write(&generate_entry(12)).unwrap();

    assert_eq!(channel.file_size().unwrap(), 44);
    assert_eq!(channel.num_bytes_in_write_buffer(), 0);
}

#[test]
fn test_spill_does_not_reset_unpersisted_counter() {
    let channel = BufferedChannel::new(MemoryStore::new(), 8, 100).unwrap();

    channel.write(&[7u8; 20]).unwrap();

    assert_eq!(channel.file_size().unwrap(), 16);
    assert_eq!(channel.num_bytes_in_write_buffer(), 4);
    assert_eq!(channel.unpersisted_bytes(), 20);

    channel.flush().unwrap();
    assert_eq!(channel.unpersisted_bytes(), 0);
    assert_eq!(channel.file_size().unwrap(), 20);
}

#[test]
fn test_aligned_spill_keeps_unpersisted_counter() {
    let channel = BufferedChannel::new(MemoryStore::new(), 8, 0).unwrap();

    channel.write(&[5u8; 8]).unwrap();

    assert_eq!(channel.file_size().unwrap(), 8);
    assert_eq!(channel.num_bytes_in_write_buffer(), 0);
    assert_eq!(channel.unpersisted_bytes(), 8);
}

#[test]
fn test_sync_count_independent_of_write_chunking() {
    let data = [9u8; 64];

    for chunk in [4usize, 8, 16, 32] {
        let channel = BufferedChannel::new(FailingStore::default(), 8, 32).unwrap();
        for piece in data.chunks(chunk) {
            channel.write(piece).unwrap();
        }

        assert_eq!(channel.store().syncs(), 2, "chunk size {}", chunk);
        assert_eq!(channel.position(), 64);
    }
}

#[test]
fn test_bound_accumulates_across_writes() {
    let channel = BufferedChannel::new(MemoryStore::new(), 1024, 10).unwrap();

    channel.write(&[1u8; 4]).unwrap();
    channel.write(&[2u8; 4]).unwrap();
    assert_eq!(channel.file_size().unwrap(), 0);
    assert_eq!(channel.unpersisted_bytes(), 8);

    channel.write(&[3u8; 2]).unwrap();
    assert_eq!(channel.file_size().unwrap(), 10);
    assert_eq!(channel.unpersisted_bytes(), 0);
}

#[test]
fn test_zero_capacity_writes_through() {
    let channel = BufferedChannel::new(MemoryStore::new(), 0, 0).unwrap();

    channel.write(b"hello").unwrap();
    assert_eq!(channel.file_size().unwrap(), 5);
    assert_eq!(channel.num_bytes_in_write_buffer(), 0);

    channel.write(b" world").unwrap();
    assert_eq!(channel.store().contents(), b"hello world");
    assert_eq!(channel.unpersisted_bytes(), 0);
}

#[test]
fn test_empty_write_is_noop() {
    let channel = BufferedChannel::new(MemoryStore::new(), 0, 1).unwrap();

    channel.write(&[]).unwrap();

    assert_eq!(channel.position(), 0);
    assert_eq!(channel.file_size().unwrap(), 0);
}

#[test]
fn test_flush_empty_buffer_is_noop() {
    let channel = BufferedChannel::new(MemoryStore::new(), 16, 0).unwrap();

    channel.flush().unwrap();
    channel.flush().unwrap();

    assert_eq!(channel.file_size().unwrap(), 0);
    assert_eq!(channel.position(), 0);
}

#[test]
fn test_flush_and_force_write_returns_durable_position() {
    let (_temp, path) = setup_temp_log();
    let channel = open_channel(&path, 64, 0);

    channel.write(b"abcdef").unwrap();
    let synced = channel.flush_and_force_write(true).unwrap();

    assert_eq!(synced, 6);
    assert_eq!(channel.file_position(), 6);
    assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
}

#[test]
fn test_channel_starts_after_existing_content() {
    let channel = BufferedChannel::new(MemoryStore::with_contents(vec![9u8; 8]), 64, 0).unwrap();

    assert_eq!(channel.write_buffer_start_position(), 8);
    assert_eq!(channel.position(), 8);

    channel.write(b"new").unwrap();
    channel.flush().unwrap();

    let mut expected = vec![9u8; 8];
    expected.extend_from_slice(b"new");
    assert_eq!(channel.store().contents(), expected);
}

#[test]
fn test_from_config_uses_channel_settings() {
    let config = Config::builder()
        .write_capacity(128)
        .read_capacity(16)
        .unpersisted_bytes_bound(64)
        .build();

    let channel = BufferedChannel::from_config(MemoryStore::new(), &config).unwrap();

    assert_eq!(channel.write_capacity(), 128);
    assert_eq!(channel.read_capacity(), 16);
    assert_eq!(channel.unpersisted_bytes_bound(), 64);
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_after_threshold_trip() {
    let (_temp, path) = setup_temp_log();
    let channel = open_channel(&path, 8, 10);
    let entry = generate_entry(8);

    assert_eq!(channel.file_size().unwrap(), 0);
    channel.write(&entry).unwrap();
    assert_eq!(channel.file_size().unwrap(), 40);

    assert_eq!(read_vec(&channel, 0, 40), entry);

    let mut dest = BytesMut::new();
    let err = channel.read(&mut dest, 41, 1).unwrap_err();
    assert!(matches!(err, BookieError::EndOfData { available: 40, .. }));
}

#[test]
fn test_read_from_write_buffer_only() {
    let channel = BufferedChannel::new(MemoryStore::new(), 100, 0).unwrap();
    channel.write(b"0123456789").unwrap();

    assert_eq!(channel.file_size().unwrap(), 0);
    assert_eq!(read_vec(&channel, 2, 5), b"23456");
}

#[test]
fn test_read_spanning_disk_and_buffer() {
    let channel = BufferedChannel::new(MemoryStore::new(), 16, 0).unwrap();
    let data: Vec<u8> = (0..40u8).collect();
    channel.write(&data).unwrap();

    assert_eq!(channel.file_size().unwrap(), 32);
    assert_eq!(channel.num_bytes_in_write_buffer(), 8);

    assert_eq!(read_vec(&channel, 28, 8), &data[28..36]);
    assert_eq!(read_vec(&channel, 0, 40), data);
}

#[test]
fn test_read_small_capacities() {
    // Capacity / position / length combinations over one 40-byte entry
    let cases = [(1, 0, 1), (1, 2, 2), (10, 0, 1), (8, 1, 1), (11, 0, 1), (11, 20, 20)];

    for (capacity, position, length) in cases {
        let channel = BufferedChannel::new(MemoryStore::new(), capacity, 10).unwrap();
        let entry = generate_entry(8);
        channel.write(&entry).unwrap();

        let got = read_vec(&channel, position, length);
        assert_eq!(
            got,
            &entry[position as usize..position as usize + length],
            "capacity {} position {} length {}",
            capacity,
            position,
            length
        );
    }
}

#[test]
fn test_read_after_existing_prefix() {
    let channel = BufferedChannel::new(MemoryStore::with_contents(vec![0u8; 8]), 11, 10).unwrap();
    let data = [5u8, 6, 7, 8, 9, 10, 11, 12];
    channel.write(&data).unwrap();

    assert_eq!(channel.num_bytes_in_write_buffer(), 8);
    assert_eq!(read_vec(&channel, 8, 1), vec![5]);
    assert_eq!(read_vec(&channel, 6, 4), vec![0, 0, 5, 6]);

    let mut dest = BytesMut::new();
    assert!(matches!(
        channel.read(&mut dest, 16, 1),
        Err(BookieError::EndOfData { .. })
    ));
}

#[test]
fn test_read_past_end_is_all_or_nothing() {
    let channel = BufferedChannel::new(MemoryStore::new(), 4, 0).unwrap();
    channel.write(b"abcdefgh").unwrap();
    channel.write(b"ij").unwrap();

    let mut dest = BytesMut::from(&b"keep"[..]);
    let err = channel.read(&mut dest, 5, 6).unwrap_err();

    assert!(matches!(
        err,
        BookieError::EndOfData {
            position: 5,
            length: 6,
            available: 10
        }
    ));
    assert_eq!(&dest[..], b"keep");
}

#[test]
fn test_read_zero_length() {
    let channel = BufferedChannel::new(MemoryStore::new(), 4, 0).unwrap();
    channel.write(b"abcdef").unwrap();

    let mut dest = BytesMut::new();
    assert_eq!(channel.read(&mut dest, 0, 0).unwrap(), 0);
    assert_eq!(channel.read(&mut dest, 6, 0).unwrap(), 0);
    assert!(dest.is_empty());

    assert!(matches!(
        channel.read(&mut dest, 7, 0),
        Err(BookieError::EndOfData { .. })
    ));
}

#[test]
fn test_read_on_empty_channel() {
    let channel = BufferedChannel::new(MemoryStore::new(), 0, 0).unwrap();

    let mut dest = BytesMut::new();
    assert_eq!(channel.read(&mut dest, 0, 0).unwrap(), 0);
    assert!(matches!(
        channel.read(&mut dest, 0, 1),
        Err(BookieError::EndOfData { available: 0, .. })
    ));
}

#[test]
fn test_read_overflowing_range_is_invalid() {
    let channel = BufferedChannel::new(MemoryStore::new(), 4, 0).unwrap();

    let mut dest = BytesMut::new();
    assert!(matches!(
        channel.read(&mut dest, u64::MAX, 1),
        Err(BookieError::InvalidArgument(_))
    ));
}

#[test]
fn test_read_appends_to_destination() {
    let channel = BufferedChannel::new(MemoryStore::new(), 4, 0).unwrap();
    channel.write(b"abcdef").unwrap();

    let mut dest = BytesMut::from(&b">>"[..]);
    channel.read(&mut dest, 1, 3).unwrap();
    assert_eq!(&dest[..], b">>bcd");
}

#[test]
fn test_read_does_not_mutate_channel_state() {
    let channel = BufferedChannel::new(MemoryStore::new(), 8, 0).unwrap();
    channel.write(&[1u8; 12]).unwrap();

    let before = (
        channel.position(),
        channel.file_position(),
        channel.num_bytes_in_write_buffer(),
        channel.unpersisted_bytes(),
    );
    read_vec(&channel, 0, 12);
    let after = (
        channel.position(),
        channel.file_position(),
        channel.num_bytes_in_write_buffer(),
        channel.unpersisted_bytes(),
    );

    assert_eq!(before, after);
}

#[test]
fn test_read_ahead_refreshes_after_new_flushes() {
    let channel = BufferedChannel::with_capacities(MemoryStore::new(), 8, 16, 0).unwrap();

    channel.write(b"AAAAAAAA").unwrap();
    assert_eq!(read_vec(&channel, 0, 2), b"AA");

    channel.write(b"BBBBBBBB").unwrap();
    assert_eq!(channel.file_size().unwrap(), 16);
    assert_eq!(read_vec(&channel, 6, 4), b"AABB");
    assert_eq!(read_vec(&channel, 0, 16), b"AAAAAAAABBBBBBBB");
}

#[test]
fn test_read_without_read_ahead() {
    let channel = BufferedChannel::with_capacities(MemoryStore::new(), 4, 0, 0).unwrap();
    let data: Vec<u8> = (0..30u8).collect();
    channel.write(&data).unwrap();

    for position in 0..30u64 {
        assert_eq!(read_vec(&channel, position, 1), vec![position as u8]);
    }
}

#[test]
fn test_random_split_round_trip() {
    let mut rng = rand::thread_rng();

    for capacity in [0usize, 1, 7, 64, 4096] {
        for bound in [0u64, 5, 100] {
            let channel = BufferedChannel::new(MemoryStore::new(), capacity, bound).unwrap();
            let mut data = vec![0u8; 500];
            rng.fill_bytes(&mut data);

            let mut written = 0;
            while written < data.len() {
                let n = rng.gen_range(0..=17).min(data.len() - written);
                channel.write(&data[written..written + n]).unwrap();
                written += n;
            }

            assert_eq!(channel.position(), 500);
            for _ in 0..50 {
                let position = rng.gen_range(0..=500usize);
                let length = rng.gen_range(0..=500 - position);
                assert_eq!(
                    read_vec(&channel, position as u64, length),
                    &data[position..position + length],
                    "capacity {} bound {}",
                    capacity,
                    bound
                );
            }
        }
    }
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_discards_unflushed_bytes() {
    let (_temp, path) = setup_temp_log();

    let channel = open_channel(&path, 100, 0);
    channel.write(&generate_entry(2)).unwrap();
    assert_eq!(channel.close(), 34);

    let reopened = open_channel(&path, 100, 0);
    assert_eq!(reopened.file_size().unwrap(), 0);
    assert_eq!(reopened.position(), 0);
}

#[test]
fn test_close_after_flush_keeps_bytes() {
    let (_temp, path) = setup_temp_log();
    let entry = generate_entry(2);

    let channel = open_channel(&path, 100, 0);
    channel.write(&entry).unwrap();
    channel.flush().unwrap();
    assert_eq!(channel.close(), 0);

    let reopened = open_channel(&path, 100, 0);
    assert_eq!(reopened.position(), 34);
    assert_eq!(read_vec(&reopened, 0, 34), entry);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_spill_leaves_state_for_retry() {
    let channel = BufferedChannel::new(FailingStore::default(), 4, 0).unwrap();
    channel.write(b"xy").unwrap();

    channel.store().set_failing(true);
    let err = channel.write(b"0123456789").unwrap_err();
    assert!(matches!(err, BookieError::Io(_)));

    assert_eq!(channel.position(), 2);
    assert_eq!(channel.num_bytes_in_write_buffer(), 2);
    assert_eq!(channel.unpersisted_bytes(), 2);
    assert_eq!(read_vec(&channel, 0, 2), b"xy");

    channel.store().set_failing(false);
    channel.write(b"0123456789").unwrap();

    assert_eq!(channel.file_size().unwrap(), 12);
    assert_eq!(read_vec(&channel, 0, 12), b"xy0123456789");
}

#[test]
fn test_spill_writes_store_once() {
    let channel = BufferedChannel::new(FailingStore::default(), 4, 0).unwrap();
    channel.write(b"xy").unwrap();
    assert_eq!(channel.store().write_calls(), 0);

    channel.write(b"0123456789").unwrap();

    assert_eq!(channel.store().write_calls(), 1);
    assert_eq!(channel.store().inner.contents(), b"xy0123456789");
}

#[test]
fn test_failed_spill_leaves_no_tail_in_store() {
    let channel = BufferedChannel::new(FailingStore::default(), 4, 0).unwrap();
    channel.write(b"xy").unwrap();

    channel.store().set_failing(true);
    assert!(channel.write(b"0123456789").is_err());
    channel.store().set_failing(false);

    assert!(channel.store().inner.contents().is_empty());
    assert_eq!(channel.close(), 2);
}

#[test]
fn test_failed_threshold_sync_leaves_state_for_retry() {
    let channel = BufferedChannel::new(FailingStore::default(), 64, 4).unwrap();

    channel.store().set_failing_syncs(true);
    let err = channel.write(b"abcd").unwrap_err();
    assert!(matches!(err, BookieError::Io(_)));

    assert_eq!(channel.position(), 0);
    assert_eq!(channel.file_position(), 0);
    assert_eq!(channel.num_bytes_in_write_buffer(), 0);
    assert_eq!(channel.unpersisted_bytes(), 0);

    channel.store().set_failing_syncs(false);
    channel.write(b"abcd").unwrap();

    assert_eq!(channel.position(), 4);
    assert_eq!(channel.file_position(), 4);
    assert_eq!(channel.store().syncs(), 1);
    assert_eq!(channel.store().inner.contents(), b"abcd");
    assert_eq!(read_vec(&channel, 0, 4), b"abcd");
}

#[test]
fn test_failed_threshold_sync_keeps_buffered_bytes() {
    let channel = BufferedChannel::new(FailingStore::default(), 64, 10).unwrap();
    channel.write(b"12345").unwrap();

    channel.store().set_failing_syncs(true);
    assert!(channel.write(b"67890").is_err());

    assert_eq!(channel.position(), 5);
    assert_eq!(channel.num_bytes_in_write_buffer(), 5);
    assert_eq!(channel.unpersisted_bytes(), 5);

    channel.store().set_failing_syncs(false);
    channel.write(b"67890").unwrap();

    assert_eq!(channel.file_position(), 10);
    assert_eq!(read_vec(&channel, 0, 10), b"1234567890");
}

// =============================================================================
// Capacity Validation Tests
// =============================================================================

#[test]
fn test_oversized_capacity_rejected() {
    let result = BufferedChannel::new(MemoryStore::new(), MAX_BUFFER_CAPACITY + 1, 0);
    assert!(matches!(result, Err(BookieError::Config(_))));

    let result = BufferedChannel::with_capacities(MemoryStore::new(), 64, MAX_BUFFER_CAPACITY + 1, 0);
    assert!(matches!(result, Err(BookieError::Config(_))));
}

#[test]
fn test_config_validate() {
    assert!(Config::default().validate().is_ok());

    let config = Config::builder().write_capacity(MAX_BUFFER_CAPACITY + 1).build();
    assert!(matches!(config.validate(), Err(BookieError::Config(_))));
}

#[test]
fn test_failed_flush_keeps_buffer() {
    let channel = BufferedChannel::new(FailingStore::default(), 64, 0).unwrap();
    channel.write(b"pending").unwrap();

    channel.store().set_failing(true);
    assert!(matches!(channel.flush(), Err(BookieError::Io(_))));
    assert_eq!(channel.num_bytes_in_write_buffer(), 7);
    assert_eq!(channel.unpersisted_bytes(), 7);

    channel.store().set_failing(false);
    channel.flush().unwrap();
    assert_eq!(channel.store().inner.contents(), b"pending");
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_reads_see_consistent_bytes() {
    let channel = Arc::new(BufferedChannel::with_capacities(MemoryStore::new(), 64, 32, 100).unwrap());
    let byte_at = |offset: usize| (offset % 251) as u8;

    let writer = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            let mut offset = 0usize;
            for _ in 0..2000 {
                let chunk: Vec<u8> = (offset..offset + 13).map(byte_at).collect();
                channel.write(&chunk).unwrap();
                offset += 13;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for _ in 0..200 {
                    let end = channel.position() as usize;
                    let start = end.saturating_sub(300);
                    let mut dest = BytesMut::new();
                    channel
                        .read(&mut dest, start as u64, end - start)
                        .unwrap();
                    for (i, byte) in dest.iter().enumerate() {
                        assert_eq!(*byte, byte_at(start + i));
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(channel.position(), 2000 * 13);
}
