use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::bounded;
use log::{debug, error, info};
use mpp_feed::{ParticipantPosition, ParticipantRegistry, PositionReader, PositionRegistry};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::macros::format_description;

#[derive(Debug, Parser)]
#[command(about = "Decode Market Participant Position record files and summarize participants")]
struct Args {
    /// Input files of back-to-back 26-byte records; each is read on its own thread
    #[arg(long, short = 'i', required = true)]
    input: Vec<PathBuf>,

    /// Print every decoded record
    #[arg(long, default_value_t = false)]
    dump: bool,

    /// Only print records for this MPID
    #[arg(long)]
    mpid: Option<String>,

    /// Skip the per-participant summary at the end
    #[arg(long, default_value_t = false)]
    no_summary: bool,
}

enum Event {
    Position(usize, ParticipantPosition),
    Failed(usize, mpp_feed::Error),
}

/// Render a time-since-midnight as wall clock, falling back to the raw
/// duration past 24h.
fn clock(ts: Duration) -> String {
    let fmt = format_description!("[hour]:[minute]:[second].[subsecond digits:9]");
    let secs = ts.as_secs();
    if secs < 86_400 {
        let formatted = time::Time::from_hms_nano(
            (secs / 3600) as u8,
            (secs / 60 % 60) as u8,
            (secs % 60) as u8,
            ts.subsec_nanos(),
        )
        .ok()
        .and_then(|t| t.format(fmt).ok());
        if let Some(s) = formatted {
            return s;
        }
    }
    format!("{ts:?}")
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let registry = Arc::new(ParticipantRegistry::new());
    let (tx, rx) = bounded::<Event>(8192);

    let mut readers = Vec::with_capacity(args.input.len());
    for (idx, path) in args.input.iter().enumerate() {
        let file = File::open(path).with_context(|| format!("open {path:?}"))?;
        let tx = tx.clone();
        let registry = Arc::clone(&registry);
        readers.push(std::thread::spawn(move || {
            for item in PositionReader::new(BufReader::new(file), &*registry) {
                let ev = match item {
                    Ok(p) => Event::Position(idx, p),
                    Err(e) => Event::Failed(idx, e),
                };
                if tx.send(ev).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let mut decoded = 0usize;
    let mut failures = 0usize;
    for ev in rx {
        match ev {
            Event::Position(idx, p) => {
                decoded += 1;
                let wanted = args.mpid.as_deref().is_none_or(|m| m == p.mpid);
                if args.dump && wanted {
                    println!("# {:?}", args.input[idx]);
                    print!("{p}");
                }
            }
            Event::Failed(idx, e) => {
                failures += 1;
                error!("{:?}: {e}", args.input[idx]);
            }
        }
    }
    for r in readers {
        if r.join().is_err() {
            bail!("reader thread panicked");
        }
    }
    info!("decoded {decoded} records from {} file(s)", args.input.len());

    if !args.no_summary {
        for id in registry.participants() {
            let history = registry.history(&id);
            let Some(last) = history.last() else { continue };
            debug!("{id}: {} positions", history.len());
            println!(
                "{:<4} positions={:<6} last={} stock={} mode={} state={} primary={}",
                id,
                history.len(),
                clock(last.timestamp),
                last.stock,
                last.mode,
                last.state,
                last.primary_mm
            );
        }
    }
    eprintln!("Read {} records, {} errors, {} participants.", decoded, failures, registry.len());
    if failures > 0 {
        bail!("{failures} record(s) failed to decode");
    }
    Ok(())
}
