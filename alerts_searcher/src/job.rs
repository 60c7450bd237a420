//! The poll-and-forward run.
//!
//! One run reads the marker, searches `[marker, now)`, forwards every hit to
//! the configured topic and stores `now` as the new marker. The marker only
//! moves once the search itself succeeded; individual publish failures are
//! logged and do not hold it back.
//!
//! The run deadline covers loading, searching and opening the producer as a
//! whole. While forwarding it is checked before every send, because a
//! blocking producer never yields to a timer. A run cut off mid-forward
//! stores the timestamp of the first alert it did not send, so the next run
//! picks up from there. The marker write itself is never cancelled.

use std::future::Future;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::connector::Connector;
use crate::error::{Error, Result};
use crate::publish::AlertSink;
use crate::search::{AlertIndex, SearchHit, SearchWindow};
use crate::state::StateFile;

/// Outcome of a run that got as far as searching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub window: SearchWindow,
    pub hits: usize,
    pub forwarded: usize,
    pub failed: usize,
    /// Hits left unsent because the deadline passed
    pub skipped: usize,
    /// Value written as the new marker
    pub marker: i64,
    /// False when writing the new marker failed
    pub marker_advanced: bool,
}

pub struct AlertsSearcher<C> {
    config: Config,
    connector: C,
    state: StateFile,
}

impl<C: Connector> AlertsSearcher<C> {
    pub fn new(config: Config, connector: C) -> Self {
        let state = StateFile::in_home_dir(&config.home_dir);
        Self {
            config,
            connector,
            state,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state_file(&self) -> &StateFile {
        &self.state
    }

    /// Runs once with the current wall-clock time. Never fails; errors are
    /// logged and reported as `None`.
    pub async fn run(&self) -> Option<RunReport> {
        self.run_at(Utc::now().timestamp_millis()).await
    }

    /// Runs once as if the clock read `now` (epoch milliseconds).
    pub async fn run_at(&self, now: i64) -> Option<RunReport> {
        match self.try_run_at(now).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "alerts search run aborted");
                None
            }
        }
    }

    /// Runs once, surfacing the error that aborted the run.
    pub async fn try_run_at(&self, now: i64) -> Result<RunReport> {
        let deadline = Instant::now() + self.config.run_timeout;
        info!(home_dir = %self.config.home_dir.display(), "starting alerts search");

        let last_search_time = self.within(deadline, self.load_marker()).await?;
        let window = if last_search_time > now {
            warn!(
                marker = last_search_time,
                now, "stored marker is ahead of the clock, keeping it and searching nothing"
            );
            SearchWindow::new(last_search_time, last_search_time)
        } else {
            SearchWindow::new(last_search_time, now)
        };

        self.search_and_forward(window, deadline)
            .instrument(info_span!("alerts_search", from = window.from, to = window.to))
            .await
    }

    async fn within<T>(&self, deadline: Instant, work: impl Future<Output = T>) -> Result<T> {
        timeout_at(deadline, work)
            .await
            .map_err(|_| Error::Timeout(self.config.run_timeout))
    }

    async fn load_marker(&self) -> i64 {
        match self.state.load().await {
            Ok(Some(marker)) => {
                info!(path = %self.state.path().display(), marker, "found existing search state");
                marker
            }
            Ok(None) => {
                info!(path = %self.state.path().display(), "no existing search state, searching from epoch");
                0
            }
            Err(e) => {
                error!(error = %e, "could not read last search time, searching from epoch");
                0
            }
        }
    }

    async fn search_and_forward(
        &self,
        window: SearchWindow,
        deadline: Instant,
    ) -> Result<RunReport> {
        let mut hits = self
            .within(deadline, async {
                let index = self.connector.connect_index(&self.config).await?;
                index.search(window).await
            })
            .await??;
        debug!(hits = hits.len(), "search complete");

        // Oldest first, so a cut-off run can resume from the first unsent hit
        hits.sort_by_key(|hit| hit_time(hit, window));

        let topic = self.config.kafka.topic.as_str();
        let mut forwarded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut marker = window.to;

        if !hits.is_empty() {
            let mut sink = self
                .within(deadline, self.connector.connect_sink(&self.config))
                .await??;
            for (i, hit) in hits.iter().enumerate() {
                if Instant::now() >= deadline {
                    skipped = hits.len() - i;
                    marker = hit_time(hit, window);
                    warn!(
                        skipped,
                        marker, "run deadline reached, leaving remaining alerts for the next run"
                    );
                    break;
                }

                debug!(id = %hit.id, source = hit.source_str(), "forwarding alert");
                match sink.publish(topic, hit.source_str()).await {
                    Ok(()) => forwarded += 1,
                    Err(e) => {
                        failed += 1;
                        warn!(id = %hit.id, %topic, error = %e, "failed to forward alert");
                    }
                }
            }
        }

        let marker_advanced = match self.state.store(marker).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, marker, "error saving last search time");
                false
            }
        };

        info!(hits = hits.len(), forwarded, failed, skipped, marker, "done with alerts search");

        Ok(RunReport {
            window,
            hits: hits.len(),
            forwarded,
            failed,
            skipped,
            marker,
            marker_advanced,
        })
    }
}

// Hits without a readable timestamp count as the start of the window
fn hit_time(hit: &SearchHit, window: SearchWindow) -> i64 {
    hit.timestamp
        .map_or(window.from, |ts| ts.clamp(window.from, window.to))
}
