//! Collector loop: refresh, harvest, persist, sleep, until interrupted.
//!
//! The loop owns its render session and sink for the whole run. Record and
//! tick failures are logged and never stop it; only the shutdown signal
//! does, and the render session is closed exactly once on the way out.

mod clock;
pub mod shutdown;

use std::time::Duration;

use chrono::{Local, Utc};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::harvest::harvest;
use crate::models::{Layout, Observation, ROW_TIME_FORMAT};
use crate::render::{ListingContainer, RenderError, RenderSource};
use crate::sink::{ListingSink, SinkError};

pub use clock::ObservationClock;
pub use shutdown::{Shutdown, ShutdownTrigger};

/// Everything the loop needs to know about one run.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub url: String,
    pub table: String,
    pub layout: Layout,
    pub ready_timeout: Duration,
    pub settle: Duration,
    pub interval: Duration,
    /// Cap for exponential backoff after failed ticks; `None` keeps the interval fixed.
    pub backoff_cap: Option<Duration>,
    /// Stop after this many ticks (used by `collect --once`).
    pub max_ticks: Option<u64>,
}

impl CollectorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.target.url.clone(),
            table: config.sink.table.clone(),
            layout: config.target.layout,
            ready_timeout: config.collector.ready_timeout(),
            settle: config.collector.settle(),
            interval: config.collector.interval(),
            backoff_cap: config.collector.backoff_cap(),
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Polling,
    Stopped,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub ticks: u64,
    /// Ticks that produced no snapshot.
    pub render_failures: u64,
    pub extracted: u64,
    pub extract_failures: u64,
    pub persisted: u64,
    pub rejected: u64,
    /// Ticks whose persistence was cut short by an unavailable sink.
    pub sink_outages: u64,
}

/// Sleep before the next tick.
///
/// After `failures` consecutive failed ticks the delay is
/// `min(interval * 2^failures, cap)`, never shorter than `interval`.
pub fn backoff_delay(interval: Duration, cap: Option<Duration>, failures: u32) -> Duration {
    match cap {
        Some(cap) if failures > 0 => {
            let factor = 2u32.checked_pow(failures).unwrap_or(u32::MAX);
            let cap = cap.max(interval);
            interval.checked_mul(factor).unwrap_or(cap).min(cap)
        }
        _ => interval,
    }
}

pub struct Collector<R, S> {
    render: R,
    sink: S,
    settings: CollectorSettings,
    shutdown: Shutdown,
    clock: ObservationClock,
    state: CollectorState,
    stats: CollectorStats,
    consecutive_failures: u32,
}

impl<R: RenderSource, S: ListingSink> Collector<R, S> {
    pub fn new(render: R, sink: S, settings: CollectorSettings, shutdown: Shutdown) -> Self {
        Self {
            render,
            sink,
            settings,
            shutdown,
            clock: ObservationClock::new(),
            state: CollectorState::Polling,
            stats: CollectorStats::default(),
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    /// Run until shutdown (or `max_ticks`), then release the render session.
    ///
    /// Only a failed initial navigation is returned as an error.
    pub async fn run(mut self) -> Result<CollectorStats, RenderError> {
        info!(
            "Collecting {} into {} every {}s",
            self.settings.url,
            self.settings.table,
            self.settings.interval.as_secs()
        );

        if let Err(e) = self.render.navigate(&self.settings.url).await {
            error!("Failed to open {}: {}", self.settings.url, e);
            self.stop().await;
            return Err(e);
        }

        if let Err(e) = self
            .sink
            .ensure_table(&self.settings.table, self.settings.layout)
            .await
        {
            warn!("Could not ensure table {}: {}", self.settings.table, e);
        }

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            self.tick().await;

            if self.shutdown.is_triggered() {
                break;
            }
            if let Some(max) = self.settings.max_ticks {
                if self.stats.ticks >= max {
                    break;
                }
            }

            let delay = backoff_delay(
                self.settings.interval,
                self.settings.backoff_cap,
                self.consecutive_failures,
            );
            debug!("Sleeping {}s", delay.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.wait() => break,
            }

            if let Err(e) = self.render.refresh().await {
                warn!("Refresh failed: {}", e);
            }
        }

        self.stop().await;
        let s = &self.stats;
        info!(
            "Stopped after {} ticks: {} extracted, {} failed, {} persisted, {} rejected, {} render failures",
            s.ticks, s.extracted, s.extract_failures, s.persisted, s.rejected, s.render_failures
        );
        Ok(self.stats)
    }

    async fn stop(&mut self) {
        self.state = CollectorState::Stopped;
        self.render.close().await;
    }

    /// Wait for the page, load lazy content, settle, and read the containers.
    async fn capture(&mut self) -> Result<Vec<ListingContainer>, RenderError> {
        self.render.wait_for_ready(self.settings.ready_timeout).await?;
        self.render.trigger_lazy_load().await?;
        self.render.settle(self.settings.settle).await;
        self.render.snapshot().await
    }

    async fn tick(&mut self) {
        self.stats.ticks += 1;
        let tick = self.stats.ticks;
        info!("Tick {} at {}", tick, Utc::now().format(ROW_TIME_FORMAT));

        let containers = match self.capture().await {
            Ok(containers) => {
                self.consecutive_failures = 0;
                containers
            }
            Err(e) => {
                self.stats.render_failures += 1;
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!("Tick {} produced no snapshot: {}", tick, e);
                return;
            }
        };

        let report = harvest(&containers, self.settings.layout, Local::now().date_naive());
        self.stats.extracted += report.records.len() as u64;
        self.stats.extract_failures += report.failures.len() as u64;

        let total = report.records.len();
        let mut persisted = 0u64;
        for (i, record) in report.records.into_iter().enumerate() {
            if self.shutdown.is_triggered() {
                info!("Shutdown requested, {} records not persisted", total - i);
                break;
            }

            let observation = Observation::new(record, self.clock.stamp());
            match self.sink.append(&self.settings.table, &observation).await {
                Ok(()) => persisted += 1,
                Err(SinkError::Rejected(reason)) => {
                    self.stats.rejected += 1;
                    warn!("Lot {} rejected: {}", observation.record.lot, reason);
                }
                Err(e) => {
                    self.stats.sink_outages += 1;
                    error!("{}; skipping {} remaining records this tick", e, total - i);
                    break;
                }
            }
        }
        self.stats.persisted += persisted;

        info!(
            "Tick {}: {} extracted, {} failed, {} persisted",
            tick,
            total,
            report.failures.len(),
            persisted
        );
    }
}
