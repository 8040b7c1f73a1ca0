//! The agent's scheduling loop.
//!
//! Two independent triggers share one cooperative loop: collection every
//! configured interval, retention once per day at local midnight. The loop
//! wakes at a coarse fixed resolution, compares the clock against both
//! next-due times, and runs due work inline, so collection and retention
//! never overlap and a termination signal is only ever observed between
//! units of work.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::alerts::AlertDispatcher;
use crate::config::Config;
use crate::sampler::MetricSampler;
use crate::storage::SqliteStore;
use crate::thresholds::BreachDecision;

/// Wake-up resolution of the loop. Both triggers are checked on every wake.
const LOOP_RESOLUTION: Duration = Duration::from_secs(1);

pub struct Scheduler {
    config: Config,
    sampler: MetricSampler,
    store: SqliteStore,
    dispatcher: AlertDispatcher,
    cadence: chrono::Duration,
    next_collection: DateTime<Utc>,
    next_retention: DateTime<Local>,
}

impl Scheduler {
    pub fn new(config: Config, store: SqliteStore) -> Self {
        let dispatcher = AlertDispatcher::new(config.channels.clone(), config.host_label.clone());
        let cadence = chrono::Duration::seconds(config.check_interval.duration().as_secs() as i64);

        Self {
            sampler: MetricSampler::new(),
            store,
            dispatcher,
            cadence,
            // The first sample lands immediately rather than one interval in.
            next_collection: Utc::now(),
            next_retention: next_daily_sweep(Local::now()),
            config,
        }
    }

    /// Drive both triggers until a termination signal arrives, then close
    /// the store and return.
    pub async fn run(mut self) {
        info!(
            "monitoring started: collecting every {:?}, retention sweep daily at 00:00 ({} day window)",
            self.config.check_interval.duration(),
            self.config.retention_days
        );

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let mut resolution = interval(LOOP_RESOLUTION);
        // A slow tick must not be followed by a burst of catch-up wakes.
        resolution.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = resolution.tick() => {
                    if Utc::now() >= self.next_collection {
                        self.collection_tick().await;
                        self.next_collection = Utc::now() + self.cadence;
                    }

                    if Local::now() >= self.next_retention {
                        self.retention_sweep().await;
                        self.next_retention = next_daily_sweep(Local::now());
                    }
                }

                _ = &mut shutdown => {
                    warn!("termination signal received, shutting down");
                    break;
                }
            }
        }

        self.store.close().await;
        info!("monitoring stopped");
    }

    /// One collection tick: sample → persist → evaluate → dispatch, in
    /// that order. Every failure is contained to this tick.
    async fn collection_tick(&mut self) {
        let sample = match self.sampler.sample().await {
            Ok(sample) => sample,
            Err(e) => {
                error!("skipping tick, {e}");
                return;
            }
        };

        info!(
            "🩺 CPU: {:.2}% | RAM: {:.2}% | DISK: {:.2}%",
            sample.cpu_percent, sample.ram_percent, sample.disk_percent
        );

        if let Err(e) = self.store.insert(&sample).await {
            error!("failed to persist sample: {e}");
            return;
        }

        let thresholds = &self.config.thresholds;
        debug!(
            "threshold check: CPU {:.2}/{} RAM {:.2}/{} DISK {:.2}/{}",
            sample.cpu_percent,
            thresholds.cpu,
            sample.ram_percent,
            thresholds.ram,
            sample.disk_percent,
            thresholds.disk
        );

        let decision = BreachDecision::evaluate(&sample, thresholds, &self.config.host_label);
        if !decision.triggered {
            debug!("no alert triggered, all metrics below thresholds");
            return;
        }

        let report = self.dispatcher.dispatch(&decision.message).await;
        if report.attempts.is_empty() {
            warn!("thresholds breached but no alert channel is enabled");
        } else {
            info!(
                "alert dispatched: {} delivered, {} failed",
                report.delivered(),
                report.failed()
            );
        }
    }

    /// Drop samples older than the retention window. A failed sweep is
    /// retried at the next daily alignment.
    async fn retention_sweep(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(self.config.retention_days as i64);

        match self.store.delete_older_than(cutoff).await {
            Ok(deleted) => info!(
                "🧹 retention sweep removed {deleted} sample(s) older than {} days",
                self.config.retention_days
            ),
            Err(e) => error!("retention sweep failed: {e}"),
        }
    }
}

/// The next local-midnight sweep time strictly after `after`.
///
/// DST gaps around midnight map via `earliest()`, with a flat +24 h
/// fallback so the sweep can never stall.
pub fn next_daily_sweep(after: DateTime<Local>) -> DateTime<Local> {
    after
        .date_naive()
        .succ_opt()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .unwrap_or_else(|| after + chrono::Duration::days(1))
}

/// Resolves when the process is asked to terminate (ctrl-c, and SIGTERM on
/// unix).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
