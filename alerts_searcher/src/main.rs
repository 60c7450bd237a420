//! Alerts Searcher - OpenSOC Alert Forwarding
//!
//! Searches the alerts index for documents added since the last run and
//! forwards each one to a Kafka topic.
//!
//! Runs once by default, or every `--interval-secs` until interrupted.
//!
//! Exit codes:
//! - 0: Finished (individual run failures are logged, not fatal)
//! - 2: Configuration could not be loaded

use std::path::PathBuf;
use std::time::Duration;

use alerts_searcher::{AlertsSearcher, Config, LiveConnector, Properties};
use clap::Parser;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "alerts_searcher")]
#[command(about = "Forward new alerts from the search index to Kafka")]
struct Args {
    /// Properties file holding homeDir, elasticSearch* and kafka* settings
    #[arg(long, default_value = "alerts-searcher.properties")]
    config: PathBuf,

    /// Repeat the search on this interval instead of running once
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("alerts_searcher=info")),
        )
        .init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let props = Properties::load(&args.config)
        .await
        .map_err(|e| format!("loading {}: {}", args.config.display(), e))?;
    let config = Config::from_properties(&props)?;

    info!(
        config = %args.config.display(),
        search = %config.search.base_url(),
        broker = %config.kafka.broker(),
        topic = %config.kafka.topic,
        "configuration loaded"
    );

    let searcher = AlertsSearcher::new(config, LiveConnector);

    match args.interval_secs {
        None => {
            searcher.run().await;
        }
        Some(secs) => {
            let mut ticker = time::interval(Duration::from_secs(secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        searcher.run().await;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("interrupted, stopping");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_defaults_to_single_run() {
        let args = Args::try_parse_from(["alerts_searcher", "--config", "a.properties"]).unwrap();
        assert_eq!(args.config, PathBuf::from("a.properties"));
        assert_eq!(args.interval_secs, None);
    }

    #[test]
    fn interval_accepts_positive_seconds() {
        let args = Args::try_parse_from(["alerts_searcher", "--interval-secs", "60"]).unwrap();
        assert_eq!(args.interval_secs, Some(60));
    }

    #[test]
    fn interval_rejects_zero() {
        assert!(Args::try_parse_from(["alerts_searcher", "--interval-secs", "0"]).is_err());
    }
}
