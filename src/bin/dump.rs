//! SegKV Dump
//!
//! Lists the segments of a data directory in replay order and, optionally,
//! every record they contain. Read-only: it never modifies the directory.

use std::path::PathBuf;

use clap::Parser;
use segkv::recovery::Recovery;
use segkv::segment::{SealedSegment, SegmentId, ACTIVE_SEGMENT_NAME};
use segkv::Command;
use tracing_subscriber::{fmt, EnvFilter};

/// SegKV segment inspector
#[derive(Parser, Debug)]
#[command(name = "segkv-dump")]
#[command(about = "Inspect the segments of a SegKV data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./segkv_data")]
    data_dir: PathBuf,

    /// Print every record, not only the summary
    #[arg(short, long)]
    records: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,segkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        tracing::error!("dump failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> segkv::Result<()> {
    tracing::info!("SegKV dump v{}", segkv::VERSION);

    for segment in SealedSegment::list(&args.data_dir)? {
        println!(
            "{:<40} {:>12} bytes{}",
            segment.path().display(),
            segment.file_size()?,
            if segment.is_compressed() { " (gzip)" } else { "" }
        );
    }
    let active = args.data_dir.join(ACTIVE_SEGMENT_NAME);
    if active.exists() {
        println!(
            "{:<40} {:>12} bytes (active)",
            active.display(),
            std::fs::metadata(&active)?.len()
        );
    }

    let report = if args.records {
        Recovery::walk(&args.data_dir, |segment, record| {
            let location = record.location;
            print_record(segment, location.offset, location.len, &record.command)
        })?
    } else {
        Recovery::verify(&args.data_dir)?
    };

    println!();
    println!("segments replayed: {}", report.segments_replayed);
    println!("segments skipped:  {}", report.segments_skipped);
    println!("corrupt segments:  {}", report.corrupt_segments);
    println!("records:           {}", report.records_recovered);
    if let Some(offset) = report.active_corrupt_at {
        println!("active segment is corrupt from offset {}", offset);
    }

    Ok(())
}

fn print_record(segment: SegmentId, offset: u64, len: u32, command: &Command) {
    let location = format!("{:<20} {:>10} {:>6}", segment.to_string(), offset, len);
    match command {
        Command::Set { key, value } => println!("{}  SET {:?} = {:?}", location, key, value),
        Command::Remove { key } => println!("{}  RM  {:?}", location, key),
    }
}
