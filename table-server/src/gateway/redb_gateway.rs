//! redb-backed persistence gateway
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `records` | `(entity, id)` | `Versioned<Record>` | Areas, tables, sessions, reservations |
//!
//! A multi-record commit is one redb write transaction: every precondition
//! is checked inside it and any failure aborts the whole batch. Change
//! notices go out only after `commit()` returns.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::message::{ChangeNotice, ChangeOperation, Entity};
use tokio::sync::broadcast;

use super::{
    ConditionalWrite, GatewayError, GatewayResult, PersistenceGateway, Record, RecordFilter,
    Versioned, WritePrecondition,
};

/// key = (entity, id), value = JSON-serialized `Versioned<Record>`
const RECORDS_TABLE: TableDefinition<(&str, i64), &[u8]> = TableDefinition::new("records");

/// Default notification channel capacity per store
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Persistence gateway backed by redb
#[derive(Clone)]
pub struct RedbGateway {
    db: Arc<Database>,
    channels: Arc<Mutex<HashMap<i64, broadcast::Sender<ChangeNotice>>>>,
    channel_capacity: usize,
}

impl RedbGateway {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`, so a record is on disk as
    /// soon as `commit()` returns. Table status and session rows written in
    /// the same batch survive a power loss together or not at all.
    pub fn open(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, single-process terminals)
    pub fn open_in_memory() -> GatewayResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> GatewayResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            channels: Arc::new(Mutex::new(HashMap::new())),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    /// Override the per-store notification buffer (before anyone subscribes)
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    fn sender(&self, store_id: i64) -> broadcast::Sender<ChangeNotice> {
        self.channels
            .lock()
            .entry(store_id)
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .clone()
    }

    fn publish(&self, notices: Vec<ChangeNotice>) {
        let channels = self.channels.lock();
        for notice in notices {
            if let Some(tx) = channels.get(&notice.store_id) {
                // No receivers is fine: nobody is watching this store yet
                let _ = tx.send(notice);
            }
        }
    }

    fn decode(bytes: &[u8]) -> GatewayResult<Versioned<Record>> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn current_version(
        table: &redb::Table<'_, (&'static str, i64), &'static [u8]>,
        entity: Entity,
        id: i64,
    ) -> GatewayResult<Option<u64>> {
        match table.get((entity.as_str(), id))? {
            Some(guard) => Ok(Some(Self::decode(guard.value())?.version)),
            None => Ok(None),
        }
    }

    /// Check every precondition and stage every write. Any error leaves the
    /// transaction to be aborted by the caller.
    fn apply_writes(
        txn: &WriteTransaction,
        writes: &[ConditionalWrite],
    ) -> GatewayResult<Vec<(u64, ChangeNotice)>> {
        let mut table = txn.open_table(RECORDS_TABLE)?;
        let mut applied = Vec::with_capacity(writes.len());

        for write in writes {
            let entity = write.record.entity();
            let id = write.record.id();
            let current = Self::current_version(&table, entity, id)?;

            if !write.precondition.holds(current) {
                return Err(GatewayError::VersionConflict {
                    entity,
                    id,
                    expected: write.precondition.expected(),
                    actual: current,
                });
            }

            let version = current.map_or(1, |v| v + 1);
            let stored = Versioned::new(version, write.record.clone());
            let bytes = serde_json::to_vec(&stored)?;
            table.insert((entity.as_str(), id), bytes.as_slice())?;

            applied.push((
                version,
                ChangeNotice {
                    store_id: write.record.store_id(),
                    entity,
                    id,
                    table_id: write.record.table_id(),
                    operation: if current.is_some() {
                        ChangeOperation::Update
                    } else {
                        ChangeOperation::Insert
                    },
                },
            ));
        }

        Ok(applied)
    }

    fn remove(
        txn: &WriteTransaction,
        entity: Entity,
        id: i64,
        precondition: WritePrecondition,
    ) -> GatewayResult<ChangeNotice> {
        let mut table = txn.open_table(RECORDS_TABLE)?;
        let existing = match table.get((entity.as_str(), id))? {
            Some(guard) => Self::decode(guard.value())?,
            None => return Err(GatewayError::NotFound { entity, id }),
        };

        if !precondition.holds(Some(existing.version)) {
            return Err(GatewayError::VersionConflict {
                entity,
                id,
                expected: precondition.expected(),
                actual: Some(existing.version),
            });
        }

        table.remove((entity.as_str(), id))?;
        Ok(ChangeNotice {
            store_id: existing.record.store_id(),
            entity,
            id,
            table_id: existing.record.table_id(),
            operation: ChangeOperation::Delete,
        })
    }
}

#[async_trait]
impl PersistenceGateway for RedbGateway {
    async fn read(&self, entity: Entity, id: i64) -> GatewayResult<Versioned<Record>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        match table.get((entity.as_str(), id))? {
            Some(guard) => Self::decode(guard.value()),
            None => Err(GatewayError::NotFound { entity, id }),
        }
    }

    async fn query(
        &self,
        entity: Entity,
        filter: &RecordFilter,
    ) -> GatewayResult<Vec<Versioned<Record>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        let key = entity.as_str();

        let mut records = Vec::new();
        for entry in table.range((key, i64::MIN)..=(key, i64::MAX))? {
            let (_, value) = entry?;
            let stored = Self::decode(value.value())?;
            if filter.matches(&stored.record) {
                records.push(stored);
            }
        }
        Ok(records)
    }

    async fn commit(&self, writes: Vec<ConditionalWrite>) -> GatewayResult<Vec<u64>> {
        if writes.is_empty() {
            return Ok(Vec::new());
        }

        let txn = self.db.begin_write()?;
        let applied = match Self::apply_writes(&txn, &writes) {
            Ok(applied) => applied,
            Err(e) => {
                txn.abort()?;
                return Err(e);
            }
        };
        txn.commit()?;

        let (versions, notices): (Vec<u64>, Vec<ChangeNotice>) = applied.into_iter().unzip();
        self.publish(notices);
        Ok(versions)
    }

    async fn delete(
        &self,
        entity: Entity,
        id: i64,
        precondition: WritePrecondition,
    ) -> GatewayResult<()> {
        let txn = self.db.begin_write()?;
        let notice = match Self::remove(&txn, entity, id, precondition) {
            Ok(notice) => notice,
            Err(e) => {
                txn.abort()?;
                return Err(e);
            }
        };
        txn.commit()?;

        self.publish(vec![notice]);
        Ok(())
    }

    fn subscribe(&self, store_id: i64) -> broadcast::Receiver<ChangeNotice> {
        self.sender(store_id).subscribe()
    }
}
