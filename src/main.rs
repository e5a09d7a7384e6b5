use anyhow::{Context, Result, bail};
use clap::Parser;
use dotenvy::dotenv;
use log::{debug, info};
use mpp_feed::{MmMode, MmState, ParticipantPosition, PositionWriter};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about = "Encode a Market Participant Position record")]
struct Args {
    /// Stock locate code
    #[arg(long, env = "STOCK_LOCATE")]
    stock_locate: u16,

    /// Tracking number
    #[arg(long, env = "TRACKING_NUMBER", default_value_t = 0)]
    tracking_number: u16,

    /// Nanoseconds since midnight (only the low 48 bits are kept)
    #[arg(long, env = "TIMESTAMP_NS")]
    timestamp_ns: u64,

    /// Market participant id (up to 4 chars)
    #[arg(long, env = "MPID")]
    mpid: String,

    /// Stock symbol (up to 8 chars)
    #[arg(long, env = "STOCK")]
    stock: String,

    /// Mark the participant as primary market maker
    #[arg(long, env = "PRIMARY_MM", default_value_t = false)]
    primary: bool,

    /// Mode tag: N, P, S, R or L
    #[arg(long, env = "MM_MODE", default_value_t = 'N')]
    mode: char,

    /// State tag: A, E, W, S or D
    #[arg(long, env = "MM_STATE", default_value_t = 'A')]
    state: char,

    /// Append the record to this file instead of printing hex
    #[arg(long, env = "OUT_FILE")]
    out: Option<PathBuf>,
}

fn tag_byte(name: &str, c: char) -> Result<u8> {
    if !c.is_ascii() {
        bail!("{name} tag must be a single ASCII character, got {c:?}");
    }
    Ok(c as u8)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    env_logger::init();
    let args = Args::parse();

    // One wire byte per character, so count chars rather than UTF-8 bytes.
    if args.mpid.chars().count() > 4 || args.stock.chars().count() > 8 {
        bail!("mpid is limited to 4 characters and stock to 8, got {:?} / {:?}", args.mpid, args.stock);
    }
    if args.timestamp_ns >> 48 != 0 {
        log::warn!("timestamp {}ns does not fit in 48 bits and will be truncated", args.timestamp_ns);
    }

    let position = ParticipantPosition {
        timestamp: Duration::from_nanos(args.timestamp_ns),
        mpid: args.mpid,
        stock: args.stock,
        stock_locate: args.stock_locate,
        tracking_number: args.tracking_number,
        primary_mm: args.primary,
        mode: MmMode(tag_byte("mode", args.mode)?),
        state: MmState(tag_byte("state", args.state)?),
    };
    debug!("encoding {position:?}");

    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| format!("create {parent:?}"))?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&out)
                .with_context(|| format!("open {out:?}"))?;
            let mut w = PositionWriter::new(BufWriter::new(file));
            w.write(&position)?;
            w.flush()?;
            info!("appended {} {} ({}, {}) to {:?}", position.mpid, position.stock, position.mode, position.state, out);
        }
        None => println!("{}", to_hex(&position.encode())),
    }
    Ok(())
}
