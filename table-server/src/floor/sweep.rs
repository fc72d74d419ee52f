//! 预订过期扫描
//!
//! Registered as `TaskKind::Periodic`. Every sweep is a set of conditional
//! commits, so several terminals sweeping the same store at once only
//! produce skipped batches.

use std::sync::Arc;

use serde::Serialize;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::coordinator::FloorCoordinator;

/// Outcome of one `expire_stale_reservations` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Reservations moved to `no_show`
    pub expired: usize,
    /// Tables moved from `reserved` back to `available`
    pub released_tables: usize,
    /// Reservations left for the next tick after losing a race
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired == 0 && self.skipped == 0 && self.failed == 0
    }
}

pub struct ReservationSweeper {
    coordinator: Arc<FloorCoordinator>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ReservationSweeper {
    pub fn new(coordinator: Arc<FloorCoordinator>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            coordinator,
            interval,
            shutdown,
        }
    }

    pub async fn run(self) {
        let store_id = self.coordinator.store_id();
        tracing::info!(store_id, interval_secs = self.interval.as_secs(), "Reservation sweeper started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.sweep_once().await,
            }
        }

        tracing::info!(store_id, "Reservation sweeper stopped");
    }

    async fn sweep_once(&self) {
        match self.coordinator.expire_stale_reservations().await {
            Ok(report) if report.is_empty() => {}
            Ok(report) => tracing::info!(
                expired = report.expired,
                released_tables = report.released_tables,
                skipped = report.skipped,
                failed = report.failed,
                "Reservation sweep finished"
            ),
            // 下一个周期重试
            Err(e) => tracing::error!(error = %e, "Reservation sweep failed"),
        }
    }
}
