//! bookie-io Shell
//!
//! Appends digest-framed entries to an entry log and verifies existing logs.

use std::path::PathBuf;

use bookie_io::checksum::METADATA_LENGTH;
use bookie_io::{BookieError, Config, DigestManager, DigestType, EntryLog};
use bytes::{Buf, Bytes};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// bookie-io Shell
#[derive(Parser, Debug)]
#[command(name = "bookie-shell")]
#[command(about = "Write and inspect digest-framed entry logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug)]
struct LedgerArgs {
    /// Entry log file
    #[arg(short, long)]
    log: PathBuf,

    /// Ledger the entries belong to
    #[arg(short = 'i', long, default_value = "0")]
    ledger: i64,

    /// Digest type: crc32, crc32c, hmac or dummy
    #[arg(short, long, default_value = "crc32c")]
    digest: DigestType,

    /// Ledger password (keys the hmac digest)
    #[arg(short, long, default_value = "")]
    password: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Frame payloads as consecutive entries and append them to the log
    Append {
        #[command(flatten)]
        ledger: LedgerArgs,

        /// Entry id of the first payload
        #[arg(short, long, default_value = "0")]
        first_entry: i64,

        /// Frame for the v2 wire protocol
        #[arg(long)]
        v2: bool,

        /// Write buffer capacity in KB
        #[arg(short = 'c', long, default_value = "64")]
        capacity_kb: usize,

        /// Payloads, one entry each
        #[arg(required = true)]
        payloads: Vec<String>,
    },

    /// Scan the log and verify every entry
    ReadLog {
        #[command(flatten)]
        ledger: LedgerArgs,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bookie_io=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Append {
            ledger,
            first_entry,
            v2,
            capacity_kb,
            payloads,
        } => append(&ledger, first_entry, v2, capacity_kb, &payloads),
        Commands::ReadLog { ledger } => read_log(&ledger),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

fn append(
    args: &LedgerArgs,
    first_entry: i64,
    v2: bool,
    capacity_kb: usize,
    payloads: &[String],
) -> bookie_io::Result<()> {
    let config = Config::builder()
        .write_capacity(kib_to_bytes(capacity_kb)?)
        .digest_type(args.digest)
        .use_v2_protocol(v2)
        .build();

    let manager = DigestManager::from_config(args.ledger, args.password.as_bytes(), &config)?;
    let log = EntryLog::open(&args.log, &config)?;

    tracing::info!("Appending {} entries to {}", payloads.len(), args.log.display());

    for (entry_id, payload) in (first_entry..).zip(payloads) {
        let payload = Bytes::copy_from_slice(payload.as_bytes());
        let frame = manager.compute_digest_and_package_for_sending(
            entry_id,
            entry_id - 1,
            payload.len() as u64,
            payload,
        )?;
        let offset = log.add_entry(&frame)?;
        println!("entry {} -> offset {} ({} bytes)", entry_id, offset, frame.len());
    }

    log.flush()?;
    Ok(())
}

fn kib_to_bytes(kib: usize) -> bookie_io::Result<usize> {
    kib.checked_mul(1024).ok_or_else(|| {
        BookieError::InvalidArgument(format!("capacity of {} KB is too large", kib))
    })
}

fn read_log(args: &LedgerArgs) -> bookie_io::Result<()> {
    let config = Config::builder().digest_type(args.digest).build();
    let manager = DigestManager::from_config(args.ledger, args.password.as_bytes(), &config)?;
    let log = EntryLog::open(&args.log, &config)?;

    let mut verified = 0u64;
    let mut failed = 0u64;

    for record in log.scan() {
        let (offset, frame) = record?;

        match verify_record(&manager, &frame) {
            Ok((entry_id, lac, payload)) => {
                verified += 1;
                println!(
                    "offset {}: entry {} lac {} length {} ok: {}",
                    offset,
                    entry_id,
                    lac,
                    payload.len(),
                    String::from_utf8_lossy(&payload)
                );
            }
            Err(e) => {
                failed += 1;
                println!("offset {}: FAILED: {}", offset, e);
            }
        }
    }

    tracing::info!("Verified {} entries, {} failed", verified, failed);
    Ok(())
}

/// Returns (entry id, lac, payload) of a verified frame
fn verify_record(manager: &DigestManager, frame: &Bytes) -> bookie_io::Result<(i64, i64, Bytes)> {
    let recovery = manager.verify_digest_and_return_last_confirmed(frame)?;

    // Recovery verification guarantees a full metadata block.
    let mut metadata = &frame[8..METADATA_LENGTH];
    let entry_id = metadata.get_i64();

    let payload = manager.verify_digest_and_return_data(entry_id, frame)?;
    Ok((entry_id, recovery.last_add_confirmed(), payload))
}
