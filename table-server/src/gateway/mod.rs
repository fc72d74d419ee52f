//! Persistence Gateway - 持久层契约
//!
//! The coordinator never talks to a database directly. Everything goes
//! through [`PersistenceGateway`]: read, query, conditional write, atomic
//! multi-record commit and a per-store change notification stream.
//!
//! Every record carries a `version` starting at 1; conditional writes compare
//! against it. A failed precondition is [`GatewayError::VersionConflict`].

mod redb_gateway;

pub use redb_gateway::RedbGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::message::{ChangeNotice, Entity};
use shared::models::{Area, DiningSession, DiningTable, Reservation};
use thiserror::Error;
use tokio::sync::broadcast;

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("{entity} {id}: expected version {expected:?}, found {actual:?}")]
    VersionConflict {
        entity: Entity,
        id: i64,
        expected: Option<u64>,
        actual: Option<u64>,
    },
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Any record the gateway stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "data", rename_all = "snake_case")]
pub enum Record {
    Area(Area),
    Table(DiningTable),
    Session(DiningSession),
    Reservation(Reservation),
}

impl Record {
    pub fn entity(&self) -> Entity {
        match self {
            Record::Area(_) => Entity::Area,
            Record::Table(_) => Entity::Table,
            Record::Session(_) => Entity::Session,
            Record::Reservation(_) => Entity::Reservation,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Area(a) => a.id,
            Record::Table(t) => t.id,
            Record::Session(s) => s.id,
            Record::Reservation(r) => r.id,
        }
    }

    pub fn store_id(&self) -> i64 {
        match self {
            Record::Area(a) => a.store_id,
            Record::Table(t) => t.store_id,
            Record::Session(s) => s.store_id,
            Record::Reservation(r) => r.store_id,
        }
    }

    /// Table the record hangs off (`None` for areas)
    pub fn table_id(&self) -> Option<i64> {
        match self {
            Record::Area(_) => None,
            Record::Table(t) => Some(t.id),
            Record::Session(s) => Some(s.table_id),
            Record::Reservation(r) => Some(r.table_id),
        }
    }

    /// Status label used by [`RecordFilter::status`]
    pub fn status(&self) -> &'static str {
        match self {
            Record::Area(a) if a.is_active => "active",
            Record::Area(_) => "inactive",
            Record::Table(t) => t.status.as_str(),
            Record::Session(s) => s.status.as_str(),
            Record::Reservation(r) => r.status.as_str(),
        }
    }

    pub fn into_area(self) -> Option<Area> {
        match self {
            Record::Area(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<DiningTable> {
        match self {
            Record::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_session(self) -> Option<DiningSession> {
        match self {
            Record::Session(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_reservation(self) -> Option<Reservation> {
        match self {
            Record::Reservation(r) => Some(r),
            _ => None,
        }
    }
}

/// A record together with the version it was read at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, record: T) -> Self {
        Self { version, record }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            version: self.version,
            record: f(self.record),
        }
    }

    /// Keep the version, swap the record if the conversion succeeds
    pub fn try_map<U>(self, f: impl FnOnce(T) -> Option<U>) -> Option<Versioned<U>> {
        let version = self.version;
        f(self.record).map(|record| Versioned { version, record })
    }
}

/// Query filter: store scope plus optional table and status narrowing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub store_id: i64,
    pub table_id: Option<i64>,
    pub status: Option<&'static str>,
}

impl RecordFilter {
    pub fn store(store_id: i64) -> Self {
        Self {
            store_id,
            table_id: None,
            status: None,
        }
    }

    pub fn table(mut self, table_id: i64) -> Self {
        self.table_id = Some(table_id);
        self
    }

    pub fn status(mut self, status: &'static str) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.store_id() == self.store_id
            && self.table_id.is_none_or(|id| record.table_id() == Some(id))
            && self.status.is_none_or(|s| record.status() == s)
    }
}

/// Precondition for conditional writes (CAS)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Write only if the record does not exist yet
    DoesNotExist,
    /// Write only if the stored version equals this one
    MatchesVersion(u64),
    /// Write unconditionally
    None,
}

impl WritePrecondition {
    /// Check against the currently stored version (`None` = absent)
    pub fn holds(&self, current: Option<u64>) -> bool {
        match self {
            WritePrecondition::DoesNotExist => current.is_none(),
            WritePrecondition::MatchesVersion(v) => current == Some(*v),
            WritePrecondition::None => true,
        }
    }

    pub fn expected(&self) -> Option<u64> {
        match self {
            WritePrecondition::MatchesVersion(v) => Some(*v),
            _ => None,
        }
    }
}

/// One record write guarded by a precondition
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalWrite {
    pub record: Record,
    pub precondition: WritePrecondition,
}

impl ConditionalWrite {
    pub fn insert(record: Record) -> Self {
        Self {
            record,
            precondition: WritePrecondition::DoesNotExist,
        }
    }

    pub fn update(record: Record, version: u64) -> Self {
        Self {
            record,
            precondition: WritePrecondition::MatchesVersion(version),
        }
    }
}

/// Durable storage + change notification for floor records
///
/// Implementations must publish a [`ChangeNotice`] for every record written,
/// after the write is durable. Delivery is at-least-once.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn read(&self, entity: Entity, id: i64) -> GatewayResult<Versioned<Record>>;

    async fn query(
        &self,
        entity: Entity,
        filter: &RecordFilter,
    ) -> GatewayResult<Vec<Versioned<Record>>>;

    /// Write a single record. Returns the new version.
    async fn write_conditional(&self, write: ConditionalWrite) -> GatewayResult<u64> {
        let entity = write.record.entity();
        let id = write.record.id();
        self.commit(vec![write])
            .await?
            .into_iter()
            .next()
            .ok_or(GatewayError::NotFound { entity, id })
    }

    /// Write all records in one transaction, or none of them.
    /// Returns the new versions in input order.
    async fn commit(&self, writes: Vec<ConditionalWrite>) -> GatewayResult<Vec<u64>>;

    async fn delete(
        &self,
        entity: Entity,
        id: i64,
        precondition: WritePrecondition,
    ) -> GatewayResult<()>;

    fn subscribe(&self, store_id: i64) -> broadcast::Receiver<ChangeNotice>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_semantics() {
        assert!(WritePrecondition::DoesNotExist.holds(None));
        assert!(!WritePrecondition::DoesNotExist.holds(Some(1)));
        assert!(WritePrecondition::MatchesVersion(3).holds(Some(3)));
        assert!(!WritePrecondition::MatchesVersion(3).holds(Some(4)));
        assert!(!WritePrecondition::MatchesVersion(3).holds(None));
        assert!(WritePrecondition::None.holds(None));
        assert!(WritePrecondition::None.holds(Some(9)));
    }
}
