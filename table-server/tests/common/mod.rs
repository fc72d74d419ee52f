//! Shared fixtures: one in-memory gateway, one manual clock, any number of
//! terminals on top of them.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use shared::message::{ChangeNotice, Entity};
use shared::models::{
    DiningTable, DiningTableCreate, ReservationCreate, SeatRequest, SessionStatus, TableStatus,
};
use table_server::FloorCoordinator;
use table_server::floor::{ReservationLookahead, StoreSettings};
use table_server::gateway::{
    ConditionalWrite, GatewayError, GatewayResult, PersistenceGateway, RecordFilter, Record, RedbGateway,
    Versioned, WritePrecondition,
};
use table_server::utils::time::{ManualClock, date_hms_to_millis};
use tokio::sync::broadcast;

pub const STORE_ID: i64 = 1;

/// 2026-03-14 hh:mm in the store timezone
pub fn at(hour: u32, min: u32) -> i64 {
    let date = NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date");
    date_hms_to_millis(date, hour, min, 0, settings().timezone)
}

pub fn settings() -> StoreSettings {
    StoreSettings {
        store_id: STORE_ID,
        lookahead: ReservationLookahead::SameDay,
        ..StoreSettings::default()
    }
}

/// A store floor: shared durable state plus a wall clock every terminal reads
pub struct Floor {
    pub gateway: Arc<RedbGateway>,
    pub clock: Arc<ManualClock>,
}

impl Floor {
    /// Clock starts at 12:00
    pub fn new() -> Self {
        Self::with_gateway(RedbGateway::open_in_memory().expect("in-memory redb"))
    }

    pub fn with_gateway(gateway: RedbGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            clock: Arc::new(ManualClock::new(at(12, 0))),
        }
    }

    /// A freshly loaded terminal
    pub async fn terminal(&self) -> Arc<FloorCoordinator> {
        self.terminal_with(settings()).await
    }

    pub async fn terminal_with(&self, settings: StoreSettings) -> Arc<FloorCoordinator> {
        let coordinator = FloorCoordinator::new(settings, self.gateway.clone(), self.clock.clone());
        coordinator.load().await.expect("load floor");
        Arc::new(coordinator)
    }

    pub fn set_time(&self, hour: u32, min: u32) {
        self.clock.set(at(hour, min));
    }
}

pub async fn table(
    terminal: &FloorCoordinator,
    seats: i32,
    min: i32,
    max: Option<i32>,
) -> DiningTable {
    terminal
        .create_table(DiningTableCreate {
            table_number: None,
            seats,
            min_party_size: Some(min),
            max_party_size: max,
            notes: None,
            area_id: None,
        })
        .await
        .expect("create table")
}

pub fn party(size: i32) -> SeatRequest {
    SeatRequest {
        party_size: size,
        ..SeatRequest::default()
    }
}

pub fn booking(table_id: i64, start: i64, duration_minutes: i32) -> ReservationCreate {
    ReservationCreate {
        table_id,
        party_size: 2,
        customer_name: "Marta".to_string(),
        phone: None,
        reservation_time: start,
        duration_minutes,
        notes: None,
    }
}

/// `occupied` iff exactly one active session, read from durable state
pub async fn assert_floor_consistent(gateway: &dyn PersistenceGateway) {
    let filter = RecordFilter::store(STORE_ID);
    let tables = gateway.query(Entity::Table, &filter).await.expect("tables");
    let sessions = gateway.query(Entity::Session, &filter).await.expect("sessions");

    let mut active: HashMap<i64, usize> = HashMap::new();
    for session in sessions.into_iter().filter_map(|v| v.record.into_session()) {
        if session.status == SessionStatus::Active {
            *active.entry(session.table_id).or_default() += 1;
        }
    }
    for table in tables.into_iter().filter_map(|v| v.record.into_table()) {
        let count = active.get(&table.id).copied().unwrap_or(0);
        if table.status == TableStatus::Occupied {
            assert_eq!(count, 1, "occupied table {} has {} active sessions", table.id, count);
        } else {
            assert_eq!(count, 0, "{} table {} has active sessions", table.status, table.id);
        }
    }
}

/// Gateway wrapper that counts point reads per record and can be told to
/// fail the next few reads of one record
pub struct CountingGateway {
    inner: Arc<RedbGateway>,
    reads: Mutex<HashMap<(Entity, i64), usize>>,
    failing: Mutex<HashMap<(Entity, i64), usize>>,
}

impl CountingGateway {
    pub fn new(inner: Arc<RedbGateway>) -> Self {
        Self {
            inner,
            reads: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_next_reads(&self, entity: Entity, id: i64, times: usize) {
        self.failing.lock().insert((entity, id), times);
    }

    pub fn reads(&self, entity: Entity, id: i64) -> usize {
        self.reads.lock().get(&(entity, id)).copied().unwrap_or(0)
    }

    pub fn reset(&self) {
        self.reads.lock().clear();
    }
}

#[async_trait]
impl PersistenceGateway for CountingGateway {
    async fn read(&self, entity: Entity, id: i64) -> GatewayResult<Versioned<Record>> {
        *self.reads.lock().entry((entity, id)).or_default() += 1;
        if let Some(left) = self.failing.lock().get_mut(&(entity, id)).filter(|n| **n > 0) {
            *left -= 1;
            let broken = serde_json::from_str::<u64>("corrupt").unwrap_err();
            return Err(GatewayError::Serialization(broken));
        }
        self.inner.read(entity, id).await
    }

    async fn query(
        &self,
        entity: Entity,
        filter: &RecordFilter,
    ) -> GatewayResult<Vec<Versioned<Record>>> {
        self.inner.query(entity, filter).await
    }

    async fn commit(&self, writes: Vec<ConditionalWrite>) -> GatewayResult<Vec<u64>> {
        self.inner.commit(writes).await
    }

    async fn delete(
        &self,
        entity: Entity,
        id: i64,
        precondition: WritePrecondition,
    ) -> GatewayResult<()> {
        self.inner.delete(entity, id, precondition).await
    }

    fn subscribe(&self, store_id: i64) -> broadcast::Receiver<ChangeNotice> {
        self.inner.subscribe(store_id)
    }
}
