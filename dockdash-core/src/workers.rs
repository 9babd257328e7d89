//! Background pollers
//!
//! `RefreshWorker` re-lists units and `StatsWorker` samples the focused
//! unit, each on its own interval. Both stop promptly on cancellation and
//! never let a failed poll wipe the last good state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::model::{UnitId, UnitSnapshot, UnitStats};
use crate::runtime::{RuntimeClient, RuntimeError};
use crate::state::DashboardState;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(2);

/// List units once and swap them into `state`. Returns the unit count.
pub async fn refresh_once(
    client: &dyn RuntimeClient,
    state: &DashboardState,
) -> Result<usize, RuntimeError> {
    let list = client.list_units().await?;
    let count = list.len();
    state.replace_units(list);
    Ok(count)
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

pub struct RefreshWorker {
    client: Arc<dyn RuntimeClient>,
    state: Arc<DashboardState>,
    interval: Duration,
}

impl RefreshWorker {
    pub fn new(client: Arc<dyn RuntimeClient>, state: Arc<DashboardState>, interval: Duration) -> Self {
        Self {
            client,
            state,
            interval,
        }
    }

    /// One refresh cycle. Returns the unit count.
    pub async fn tick(&self) -> Result<usize, RuntimeError> {
        let listing = self.client.list_units().await;
        self.apply(listing)
    }

    /// A failed listing keeps the previous list
    fn apply(&self, listing: Result<Vec<UnitSnapshot>, RuntimeError>) -> Result<usize, RuntimeError> {
        match listing {
            Ok(list) => {
                let count = list.len();
                tracing::debug!(units = count, "refresh tick");
                self.state.replace_units(list);
                self.state.request_redraw();
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "periodic refresh failed");
                Err(e)
            }
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = ticker(self.interval);
        interval.tick().await; // the dashboard lists once before starting workers

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let listing = self.client.list_units().await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    let _ = self.apply(listing);
                }
            }
        }
        tracing::debug!("refresh worker stopped");
    }
}

pub struct StatsWorker {
    client: Arc<dyn RuntimeClient>,
    state: Arc<DashboardState>,
    interval: Duration,
}

impl StatsWorker {
    pub fn new(client: Arc<dyn RuntimeClient>, state: Arc<DashboardState>, interval: Duration) -> Self {
        Self {
            client,
            state,
            interval,
        }
    }

    /// One sampling cycle. `Ok(false)` when there was nothing to sample or
    /// the result went stale before it arrived.
    pub async fn tick(&self) -> Result<bool, RuntimeError> {
        match self.sample().await {
            Some((id, sample)) => self.apply(&id, sample),
            None => Ok(false),
        }
    }

    /// Fetch stats for the focused unit; `None` when paused or unfocused
    async fn sample(&self) -> Option<(UnitId, Result<UnitStats, RuntimeError>)> {
        if self.state.stats_paused() {
            return None;
        }
        let id = self.state.focused_id()?;
        let sample = self.client.get_stats(&id).await;
        Some((id, sample))
    }

    fn apply(&self, id: &str, sample: Result<UnitStats, RuntimeError>) -> Result<bool, RuntimeError> {
        match sample {
            Ok(stats) => {
                tracing::debug!(unit = %id, cpu = stats.cpu_percent, "stats tick");
                let recorded = self.state.record_stats(id, stats);
                if recorded {
                    self.state.request_redraw();
                }
                Ok(recorded)
            }
            Err(e) => {
                tracing::warn!(unit = %id, error = %e, "stats poll failed");
                Err(e)
            }
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = ticker(self.interval);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let Some((id, sample)) = self.sample().await else {
                        continue;
                    };
                    if cancel.is_cancelled() {
                        break;
                    }
                    let _ = self.apply(&id, sample);
                }
            }
        }
        tracing::debug!("stats worker stopped");
    }
}
