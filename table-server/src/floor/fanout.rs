//! Change Fan-out - 变更通知扇出
//!
//! Subscribes to the gateway's notification stream for one store, coalesces
//! bursts per table id, refreshes the local replica once per table and
//! republishes typed [`FloorEvent`]s to UI subscribers.
//!
//! A Table+Session commit arrives as two raw notices; both land in the same
//! debounce window under the same table id, so the registry re-reads that
//! table once.

use std::collections::HashMap;
use std::sync::Arc;

use shared::message::{ChangeNotice, ChangeOperation, Entity, FloorEvent};
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::coordinator::FloorCoordinator;

/// Default coalescing window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Failed table refreshes are requeued this many times before the bucket is
/// published from the last known replica state
const MAX_REFRESH_ATTEMPTS: u32 = 5;

/// Notices waiting for the window to close: table id (None for areas) ->
/// (entity, id) -> notice
type Pending = HashMap<Option<i64>, HashMap<(Entity, i64), ChangeNotice>>;

pub struct ChangeFanout {
    coordinator: Arc<FloorCoordinator>,
    debounce: Duration,
    shutdown: CancellationToken,
}

impl ChangeFanout {
    pub fn new(
        coordinator: Arc<FloorCoordinator>,
        debounce: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            debounce,
            shutdown,
        }
    }

    pub async fn run(self) {
        let store_id = self.coordinator.store_id();
        let mut rx = self.coordinator.gateway().subscribe(store_id);
        tracing::info!(store_id, debounce_ms = self.debounce.as_millis() as u64, "Change fan-out started");

        let mut pending: Pending = HashMap::new();
        let mut failures: HashMap<i64, u32> = HashMap::new();
        let mut deadline: Option<Instant> = None;

        loop {
            let sleep_until = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if !pending.is_empty() {
                        self.flush(&mut pending, &mut failures).await;
                    }
                    break;
                }

                _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                    self.flush(&mut pending, &mut failures).await;
                    // requeued buckets get a fresh window
                    deadline = (!pending.is_empty()).then(|| Instant::now() + self.debounce);
                }

                result = rx.recv() => {
                    match result {
                        Ok(notice) => {
                            coalesce(&mut pending, notice);
                            // window opens at the first notice and does not slide
                            deadline.get_or_insert_with(|| Instant::now() + self.debounce);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(store_id, skipped = n, "Change notices lagged, reloading floor");
                            pending.clear();
                            failures.clear();
                            deadline = None;
                            match self.coordinator.reload().await {
                                Ok(()) => self.coordinator.publish(FloorEvent::Resynced),
                                Err(e) => tracing::error!(store_id, error = %e, "Floor reload failed"),
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!(store_id, "Change notice channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(store_id, "Change fan-out stopped");
    }

    /// Refresh once per table, then publish one event per distinct record.
    ///
    /// A bucket whose refresh fails goes back into `pending`.
    async fn flush(&self, pending: &mut Pending, failures: &mut HashMap<i64, u32>) {
        let buckets: Vec<_> = pending.drain().collect();
        for (table_id, notices) in buckets {
            match table_id {
                Some(table_id) => match self.coordinator.refresh_table(table_id).await {
                    Ok(_) => {
                        failures.remove(&table_id);
                    }
                    Err(e) => {
                        let attempts = failures.entry(table_id).or_insert(0);
                        *attempts += 1;
                        if *attempts < MAX_REFRESH_ATTEMPTS {
                            tracing::warn!(table_id, attempts = *attempts, error = %e, "Table refresh failed, requeued");
                            pending.insert(Some(table_id), notices);
                            continue;
                        }
                        tracing::error!(table_id, error = %e, "Table refresh kept failing, publishing last known state");
                        failures.remove(&table_id);
                    }
                },
                None => {
                    for notice in notices.values().filter(|n| n.entity == Entity::Area) {
                        if let Err(e) = self.coordinator.refresh_area(notice.id).await {
                            tracing::warn!(area_id = notice.id, error = %e, "Area refresh failed");
                        }
                    }
                }
            }

            for notice in notices.into_values() {
                match self.coordinator.event_for(&notice).await {
                    Ok(event) => self.coordinator.publish(event),
                    Err(e) => tracing::warn!(
                        entity = %notice.entity,
                        id = notice.id,
                        error = %e,
                        "Dropping change notice"
                    ),
                }
            }
        }
    }
}

fn coalesce(pending: &mut Pending, notice: ChangeNotice) {
    let key = match notice.entity {
        Entity::Table => Some(notice.id),
        Entity::Area => None,
        Entity::Session | Entity::Reservation => notice.table_id,
    };
    pending
        .entry(key)
        .or_default()
        .entry((notice.entity, notice.id))
        .and_modify(|existing| existing.operation = merge(existing.operation, notice.operation))
        .or_insert(notice);
}

/// Delete wins; an insert followed by updates is still an insert
fn merge(existing: ChangeOperation, incoming: ChangeOperation) -> ChangeOperation {
    use ChangeOperation::*;
    match (existing, incoming) {
        (Delete, _) | (_, Delete) => Delete,
        (Insert, _) => Insert,
        (Update, op) => op,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(entity: Entity, id: i64, table_id: Option<i64>, operation: ChangeOperation) -> ChangeNotice {
        ChangeNotice {
            store_id: 1,
            entity,
            id,
            table_id,
            operation,
        }
    }

    #[test]
    fn table_and_session_share_one_bucket() {
        let mut pending = Pending::new();
        coalesce(&mut pending, notice(Entity::Table, 5, Some(5), ChangeOperation::Update));
        coalesce(&mut pending, notice(Entity::Session, 9, Some(5), ChangeOperation::Insert));
        coalesce(&mut pending, notice(Entity::Table, 5, Some(5), ChangeOperation::Update));

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[&Some(5)].len(), 2);
    }

    #[test]
    fn delete_wins_and_insert_survives_updates() {
        assert_eq!(merge(ChangeOperation::Insert, ChangeOperation::Update), ChangeOperation::Insert);
        assert_eq!(merge(ChangeOperation::Update, ChangeOperation::Delete), ChangeOperation::Delete);
        assert_eq!(merge(ChangeOperation::Delete, ChangeOperation::Insert), ChangeOperation::Delete);
        assert_eq!(merge(ChangeOperation::Update, ChangeOperation::Update), ChangeOperation::Update);
    }
}
