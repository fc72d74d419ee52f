//! Table Registry - 本终端的桌台/区域副本
//!
//! An owned projection of one store's areas and tables. It is only ever
//! refreshed explicitly: by the coordinator after its own commits, and by the
//! change fan-out when notices arrive. Stale replicas are harmless because
//! every write is conditional on the cached version.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use shared::message::Entity;
use shared::models::{Area, DiningTable, TableFilter, TableStats, TableStatus};

use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway, RecordFilter, Versioned};

#[derive(Default)]
struct RegistryState {
    areas: BTreeMap<i64, Versioned<Area>>,
    tables: BTreeMap<i64, Versioned<DiningTable>>,
}

pub struct TableRegistry {
    store_id: i64,
    gateway: Arc<dyn PersistenceGateway>,
    state: RwLock<RegistryState>,
}

impl TableRegistry {
    pub fn new(store_id: i64, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            store_id,
            gateway,
            state: RwLock::new(RegistryState::default()),
        }
    }

    // ========== Refresh ==========

    /// Replace the whole projection with what the gateway holds now
    pub async fn reload(&self) -> GatewayResult<()> {
        let filter = RecordFilter::store(self.store_id);
        let areas = self.gateway.query(Entity::Area, &filter).await?;
        let tables = self.gateway.query(Entity::Table, &filter).await?;

        let mut fresh = RegistryState::default();
        for area in areas.into_iter().filter_map(|v| v.try_map(|r| r.into_area())) {
            fresh.areas.insert(area.record.id, area);
        }
        for table in tables.into_iter().filter_map(|v| v.try_map(|r| r.into_table())) {
            fresh.tables.insert(table.record.id, table);
        }

        tracing::debug!(
            store_id = self.store_id,
            areas = fresh.areas.len(),
            tables = fresh.tables.len(),
            "Table registry reloaded"
        );
        *self.state.write() = fresh;
        Ok(())
    }

    /// Re-read one table. Returns the fresh copy, `None` if it is gone.
    pub async fn refresh_table(&self, table_id: i64) -> GatewayResult<Option<Versioned<DiningTable>>> {
        match self.gateway.read(Entity::Table, table_id).await {
            Ok(v) => {
                let Some(table) = v.try_map(|r| r.into_table()) else {
                    return Ok(None);
                };
                self.upsert_table(table.clone());
                Ok(Some(table))
            }
            Err(GatewayError::NotFound { .. }) => {
                self.state.write().tables.remove(&table_id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn refresh_area(&self, area_id: i64) -> GatewayResult<Option<Versioned<Area>>> {
        match self.gateway.read(Entity::Area, area_id).await {
            Ok(v) => {
                let Some(area) = v.try_map(|r| r.into_area()) else {
                    return Ok(None);
                };
                self.upsert_area(area.clone());
                Ok(Some(area))
            }
            Err(GatewayError::NotFound { .. }) => {
                self.state.write().areas.remove(&area_id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Store a copy unless an equal-or-newer version is already cached
    pub fn upsert_table(&self, table: Versioned<DiningTable>) {
        let mut state = self.state.write();
        match state.tables.get(&table.record.id) {
            Some(cached) if cached.version >= table.version => {}
            _ => {
                state.tables.insert(table.record.id, table);
            }
        }
    }

    pub fn upsert_area(&self, area: Versioned<Area>) {
        let mut state = self.state.write();
        match state.areas.get(&area.record.id) {
            Some(cached) if cached.version >= area.version => {}
            _ => {
                state.areas.insert(area.record.id, area);
            }
        }
    }

    // ========== Reads ==========

    pub fn table(&self, table_id: i64) -> Option<Versioned<DiningTable>> {
        self.state.read().tables.get(&table_id).cloned()
    }

    pub fn area(&self, area_id: i64) -> Option<Versioned<Area>> {
        self.state.read().areas.get(&area_id).cloned()
    }

    pub fn list_tables(&self, filter: &TableFilter) -> Vec<DiningTable> {
        self.state
            .read()
            .tables
            .values()
            .filter(|t| filter.matches(&t.record))
            .map(|t| t.record.clone())
            .collect()
    }

    /// Areas by sort order, then name
    pub fn list_areas(&self, include_inactive: bool) -> Vec<Area> {
        let mut areas: Vec<Area> = self
            .state
            .read()
            .areas
            .values()
            .filter(|a| include_inactive || a.record.is_active)
            .map(|a| a.record.clone())
            .collect();
        areas.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        areas
    }

    /// Available tables that fit the party, tightest fit first
    /// (seats ascending, then label ascending)
    pub fn available_for_party(&self, party_size: i32) -> Vec<DiningTable> {
        let mut tables: Vec<DiningTable> = self
            .state
            .read()
            .tables
            .values()
            .map(|t| &t.record)
            .filter(|t| t.status == TableStatus::Available && t.fits_party(party_size))
            .cloned()
            .collect();
        tables.sort_by(|a, b| {
            a.seats
                .cmp(&b.seats)
                .then_with(|| a.table_number.cmp(&b.table_number))
        });
        tables
    }

    pub fn stats(&self) -> TableStats {
        self.state.read().tables.values().map(|t| &t.record).collect()
    }

    /// Every cached table (used by label generation)
    pub fn all_tables(&self) -> Vec<DiningTable> {
        self.list_tables(&TableFilter::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RedbGateway;

    fn table(id: i64, label: &str, seats: i32, min: i32, max: Option<i32>) -> DiningTable {
        DiningTable {
            id,
            store_id: 1,
            table_number: label.to_string(),
            seats,
            min_party_size: min,
            max_party_size: max,
            status: TableStatus::Available,
            notes: None,
            area_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn registry() -> TableRegistry {
        let gateway = Arc::new(RedbGateway::open_in_memory().unwrap());
        TableRegistry::new(1, gateway)
    }

    #[test]
    fn tightest_fit_first() {
        let reg = registry();
        reg.upsert_table(Versioned::new(1, table(1, "A", 2, 1, Some(2))));
        reg.upsert_table(Versioned::new(1, table(2, "B", 6, 4, None)));
        reg.upsert_table(Versioned::new(1, table(3, "C", 4, 2, Some(6))));

        let seats: Vec<i32> = reg.available_for_party(4).iter().map(|t| t.seats).collect();
        assert_eq!(seats, vec![4, 6]);
    }

    #[test]
    fn label_breaks_seat_ties() {
        let reg = registry();
        reg.upsert_table(Versioned::new(1, table(1, "T2", 4, 1, None)));
        reg.upsert_table(Versioned::new(1, table(2, "T1", 4, 1, None)));
        let mut busy = table(3, "T0", 4, 1, None);
        busy.status = TableStatus::Occupied;
        reg.upsert_table(Versioned::new(1, busy));

        let labels: Vec<String> = reg
            .available_for_party(2)
            .into_iter()
            .map(|t| t.table_number)
            .collect();
        assert_eq!(labels, vec!["T1", "T2"]);
    }

    #[test]
    fn older_versions_never_overwrite_newer() {
        let reg = registry();
        let mut newer = table(1, "1", 4, 1, None);
        newer.status = TableStatus::Cleaning;
        reg.upsert_table(Versioned::new(3, newer));
        reg.upsert_table(Versioned::new(2, table(1, "1", 4, 1, None)));

        let cached = reg.table(1).unwrap();
        assert_eq!(cached.version, 3);
        assert_eq!(cached.record.status, TableStatus::Cleaning);
        assert_eq!(reg.stats().cleaning, 1);
    }
}
