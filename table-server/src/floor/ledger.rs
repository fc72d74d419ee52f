//! Session Ledger
//!
//! Keeps the `table_id -> active session` index for O(1) lookups, backed by
//! durable queries against the gateway. The ledger is the only place that
//! builds session records; table status changes that go with them are
//! decided by the coordinator and committed in the same batch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use shared::message::Entity;
use shared::models::{DiningSession, SeatRequest, SessionStatus};

use crate::gateway::{GatewayResult, PersistenceGateway, RecordFilter, Versioned};

#[derive(Default)]
struct LedgerState {
    /// table_id -> active session
    active: HashMap<i64, Versioned<DiningSession>>,
    /// Sessions seen closed; closed sessions never reopen
    closed: HashSet<i64>,
}

pub struct SessionLedger {
    store_id: i64,
    gateway: Arc<dyn PersistenceGateway>,
    state: RwLock<LedgerState>,
}

impl SessionLedger {
    pub fn new(store_id: i64, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            store_id,
            gateway,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Rebuild the index from every active session in the store
    pub async fn reload(&self) -> GatewayResult<()> {
        let filter = RecordFilter::store(self.store_id).status(SessionStatus::Active.as_str());
        let sessions = self.gateway.query(Entity::Session, &filter).await?;

        let mut index = HashMap::new();
        for session in sessions.into_iter().filter_map(|v| v.try_map(|r| r.into_session())) {
            if let Some(previous) = index.insert(session.record.table_id, session) {
                tracing::error!(
                    table_id = previous.record.table_id,
                    session_id = previous.record.id,
                    "More than one active session on a table"
                );
            }
        }
        *self.state.write() = LedgerState {
            active: index,
            closed: HashSet::new(),
        };
        Ok(())
    }

    /// In-memory lookup
    pub fn active_session(&self, table_id: i64) -> Option<Versioned<DiningSession>> {
        self.state.read().active.get(&table_id).cloned()
    }

    /// Durable lookup; also corrects the in-memory index
    pub async fn fetch_active_session(
        &self,
        table_id: i64,
    ) -> GatewayResult<Option<Versioned<DiningSession>>> {
        let filter = RecordFilter::store(self.store_id)
            .table(table_id)
            .status(SessionStatus::Active.as_str());
        let found = self
            .gateway
            .query(Entity::Session, &filter)
            .await?
            .into_iter()
            .filter_map(|v| v.try_map(|r| r.into_session()))
            .max_by_key(|s| s.record.seated_at);

        let mut state = self.state.write();
        match &found {
            Some(session) => {
                state.active.insert(table_id, session.clone());
            }
            None => {
                state.active.remove(&table_id);
            }
        }
        Ok(found)
    }

    /// Apply a session we just wrote or were told about
    pub fn apply(&self, session: Versioned<DiningSession>) {
        let mut state = self.state.write();
        let table_id = session.record.table_id;
        let session_id = session.record.id;

        if !session.record.is_active() {
            state.closed.insert(session_id);
            if state
                .active
                .get(&table_id)
                .is_some_and(|cached| cached.record.id == session_id)
            {
                state.active.remove(&table_id);
            }
            return;
        }

        // late echo of an insert we already saw closed
        if state.closed.contains(&session_id) {
            return;
        }
        match state.active.get(&table_id) {
            Some(cached) if cached.record.id == session_id && cached.version >= session.version => {}
            _ => {
                state.active.insert(table_id, session);
            }
        }
    }

    pub async fn read(&self, session_id: i64) -> GatewayResult<Option<Versioned<DiningSession>>> {
        Ok(self
            .gateway
            .read(Entity::Session, session_id)
            .await?
            .try_map(|r| r.into_session()))
    }

    /// Session history for a table, newest first
    pub async fn history(&self, table_id: i64) -> GatewayResult<Vec<DiningSession>> {
        let filter = RecordFilter::store(self.store_id).table(table_id);
        let mut sessions: Vec<DiningSession> = self
            .gateway
            .query(Entity::Session, &filter)
            .await?
            .into_iter()
            .filter_map(|v| v.record.into_session())
            .collect();
        sessions.sort_by(|a, b| b.seated_at.cmp(&a.seated_at));
        Ok(sessions)
    }

    /// A fresh active session for a seating request
    pub fn open(&self, id: i64, table_id: i64, request: &SeatRequest, now: i64) -> DiningSession {
        DiningSession {
            id,
            store_id: self.store_id,
            table_id,
            party_size: request.party_size,
            customer_name: request.customer_name.clone(),
            notes: request.notes.clone(),
            seated_at: now,
            status: SessionStatus::Active,
            ended_at: None,
            reservation_id: request.reservation_id,
        }
    }
}
