//! Update Search Marker - OpenSOC Alert Forwarding
//!
//! Shows or overwrites `lastSearchTime` in `<homeDir>/searcherState.properties`.
//!
//! The marker is the lower bound of the next alerts search. Moving it back
//! replays alerts from that point; moving it forward skips them. Without
//! `--at` the marker is set to the current time. An unreadable marker is
//! reported and then replaced, so this also repairs a corrupt state file.
//!
//! Stop the scheduled searcher before changing the marker, since the next
//! run overwrites it.

use alerts_searcher::StateFile;
use chrono::{DateTime, Utc};
use clap::Parser;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "update_search_marker")]
#[command(about = "Show or set the alerts searcher's last search time")]
struct Args {
    /// Directory holding searcherState.properties (the searcher's homeDir)
    #[arg(long, default_value = ".")]
    home_dir: String,

    /// Marker to write, in epoch milliseconds
    #[arg(long, conflicts_with = "show")]
    at: Option<i64>,

    /// Print the current marker without changing it
    #[arg(long)]
    show: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    run(Args::parse()).await?;
    Ok(())
}

/// Returns the marker written, or `None` for `--show`.
async fn run(args: Args) -> Result<Option<i64>> {
    let state = StateFile::in_home_dir(&args.home_dir);

    match state.load().await {
        Ok(Some(marker)) => println!("Current marker: {}", describe(marker)),
        Ok(None) => println!("No marker stored yet (searcher starts from epoch)"),
        Err(e) if args.show => return Err(e.into()),
        Err(e) => println!("Current marker unreadable, replacing it: {}", e),
    }

    if args.show {
        return Ok(None);
    }

    let marker = args.at.unwrap_or_else(|| Utc::now().timestamp_millis());
    state.store(marker).await?;

    println!("Updated marker to: {}", describe(marker));
    println!("File: {}", state.path().display());

    Ok(Some(marker))
}

fn describe(marker: i64) -> String {
    match DateTime::from_timestamp_millis(marker) {
        Some(dt) => format!("{} ({})", marker, dt.format("%Y-%m-%d %H:%M:%S%.3f UTC")),
        None => marker.to_string(),
    }
}
