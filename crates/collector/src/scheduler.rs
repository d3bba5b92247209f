use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use rdd_logger_domain::config::RefreshInterval;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fires a task on the configured period. The first tick comes one full
/// period after start. Ticks run inline, so a slow task delays the next one
/// and ticks missed meanwhile are skipped rather than replayed.
pub struct Scheduler {
    interval: RefreshInterval,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(interval: RefreshInterval, shutdown: CancellationToken) -> Self {
        Self { interval, shutdown }
    }

    /// Runs until shutdown is requested and returns the number of ticks fired.
    pub async fn run<F, Fut>(&self, mut task: F) -> u64
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut fired = 0;
        match &self.interval {
            RefreshInterval::Every(period) => {
                info!(period_secs = period.as_secs(), "executing fixed interval");
                let mut ticker = interval_at(Instant::now() + *period, *period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    fired += 1;
                    task().await;
                }
            }
            RefreshInterval::Cron(schedule) => {
                info!(%schedule, "executing cron");
                let mut cursor = Utc::now();
                loop {
                    let Some((next, wait)) = next_cron_fire(schedule, cursor, Utc::now()) else {
                        warn!("cron schedule has no upcoming fire time");
                        break;
                    };
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        _ = sleep(wait) => {}
                    }
                    fired += 1;
                    task().await;
                    cursor = next.max(Utc::now());
                }
            }
        }
        info!(ticks = fired, "scheduler stopped");
        fired
    }
}

/// Next fire time strictly after `cursor` and how long to wait for it from
/// `now`. Fire times already in the past yield a zero wait.
pub(crate) fn next_cron_fire(
    schedule: &Schedule,
    cursor: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, Duration)> {
    let next = schedule.after(&cursor).next()?;
    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
    Some((next, wait))
}
