//! Floor Coordinator - 桌台/用餐会话/预订协调器
//!
//! Entry point for every terminal action. Each operation:
//!
//! 1. validates against the local registry + ledger replica,
//! 2. asks the state machine whether the transition is legal,
//! 3. commits every affected record in ONE conditional batch, guarded by
//!    the versions it validated against,
//! 4. applies the committed records to its own replica.
//!
//! A replica that fell behind therefore fails with `StaleState` instead of
//! overwriting someone else's transition. The coordinator never retries on
//! its own; callers wrap operations in [`super::retry::with_retry`].

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::message::{ChangeNotice, ChangeOperation, Entity, FloorEvent};
use shared::models::{
    Area, AreaCreate, AreaUpdate, DEFAULT_AREA_COLOR, DiningSession, DiningTable,
    DiningTableCreate, DiningTableUpdate, Reservation, ReservationCreate, ReservationFilter,
    ReservationStatus, SeatRequest, SessionStatus, TableFilter, TableStats, TableStatus,
    validate_envelope,
};
use shared::util::snowflake_id;
use tokio::sync::broadcast;

use super::error::{FloorError, FloorResult};
use super::ledger::SessionLedger;
use super::numbering::next_table_number;
use super::registry::TableRegistry;
use super::scheduler::ReservationScheduler;
use super::settings::StoreSettings;
use super::state_machine::{self, Trigger};
use super::sweep::SweepReport;
use crate::gateway::{
    ConditionalWrite, GatewayError, GatewayResult, PersistenceGateway, Record, Versioned,
};
use crate::utils::time::Clock;

/// Default capacity of the UI event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

pub struct FloorCoordinator {
    settings: StoreSettings,
    gateway: Arc<dyn PersistenceGateway>,
    registry: TableRegistry,
    ledger: SessionLedger,
    scheduler: ReservationScheduler,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<FloorEvent>,
}

impl FloorCoordinator {
    pub fn new(
        settings: StoreSettings,
        gateway: Arc<dyn PersistenceGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store_id = settings.store_id;
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            registry: TableRegistry::new(store_id, gateway.clone()),
            ledger: SessionLedger::new(store_id, gateway.clone()),
            scheduler: ReservationScheduler::new(settings.clone(), gateway.clone()),
            settings,
            gateway,
            clock,
            events,
        }
    }

    /// Resize the UI event channel (call before anyone subscribes)
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = broadcast::channel(capacity.max(1)).0;
        self
    }

    /// Build the local replica from the gateway
    pub async fn load(&self) -> FloorResult<()> {
        self.registry.reload().await?;
        self.ledger.reload().await?;
        tracing::info!(store_id = self.settings.store_id, "Floor replica loaded");
        Ok(())
    }

    pub fn store_id(&self) -> i64 {
        self.settings.store_id
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    /// Typed floor events for UI layers
    pub fn subscribe_events(&self) -> broadcast::Receiver<FloorEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: FloorEvent) {
        // 没有订阅者时丢弃
        let _ = self.events.send(event);
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    // ========================================================================
    // Areas
    // ========================================================================

    pub async fn create_area(&self, request: AreaCreate) -> FloorResult<Area> {
        let name = non_empty("name", &request.name)?;
        let area = Area {
            id: snowflake_id(),
            store_id: self.store_id(),
            name,
            color: request
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AREA_COLOR.to_string()),
            sort_order: request.sort_order.unwrap_or(0),
            is_active: true,
        };

        self.commit(vec![ConditionalWrite::insert(Record::Area(area.clone()))])
            .await?;
        tracing::info!(area_id = area.id, name = %area.name, "Area created");
        Ok(area)
    }

    pub async fn update_area(&self, area_id: i64, patch: AreaUpdate) -> FloorResult<Area> {
        let current = self.area_for_update(area_id).await?;
        let mut area = current.record.clone();

        if let Some(name) = patch.name {
            area.name = non_empty("name", &name)?;
        }
        if let Some(color) = patch.color {
            area.color = non_empty("color", &color)?;
        }
        if let Some(sort_order) = patch.sort_order {
            area.sort_order = sort_order;
        }
        if let Some(is_active) = patch.is_active {
            area.is_active = is_active;
        }

        self.commit(vec![ConditionalWrite::update(
            Record::Area(area.clone()),
            current.version,
        )])
        .await?;
        Ok(area)
    }

    /// Soft delete. Tables keep pointing at the area.
    pub async fn deactivate_area(&self, area_id: i64) -> FloorResult<Area> {
        let current = self.area_for_update(area_id).await?;
        if !current.record.is_active {
            return Ok(current.record);
        }
        let area = self
            .update_area(
                area_id,
                AreaUpdate {
                    is_active: Some(false),
                    ..AreaUpdate::default()
                },
            )
            .await?;
        tracing::info!(area_id, "Area deactivated");
        Ok(area)
    }

    pub fn list_areas(&self, include_inactive: bool) -> Vec<Area> {
        self.registry.list_areas(include_inactive)
    }

    // ========================================================================
    // Tables
    // ========================================================================

    pub async fn create_table(&self, request: DiningTableCreate) -> FloorResult<DiningTable> {
        let min_party_size = request.min_party_size.unwrap_or(1);
        validate_envelope(request.seats, min_party_size, request.max_party_size)
            .map_err(FloorError::Validation)?;

        let area = match request.area_id {
            Some(area_id) => Some(self.active_area(area_id).await?),
            None => None,
        };
        let table_number = match request.table_number {
            Some(label) => non_empty("table_number", &label)?,
            None => next_table_number(
                self.settings.numbering,
                area.as_ref(),
                &self.registry.all_tables(),
            ),
        };

        let now = self.now();
        let table = DiningTable {
            id: snowflake_id(),
            store_id: self.store_id(),
            table_number,
            seats: request.seats,
            min_party_size,
            max_party_size: request.max_party_size,
            status: TableStatus::Available,
            notes: request.notes,
            area_id: request.area_id,
            created_at: now,
            updated_at: now,
        };

        self.commit(vec![ConditionalWrite::insert(Record::Table(table.clone()))])
            .await?;
        tracing::info!(table_id = table.id, table_number = %table.table_number, "Table created");
        Ok(table)
    }

    /// Label, seats, envelope, notes and area. Never status.
    pub async fn update_table(
        &self,
        table_id: i64,
        patch: DiningTableUpdate,
    ) -> FloorResult<DiningTable> {
        let current = self.table_for_update(table_id).await?;
        let mut table = current.record.clone();

        if let Some(label) = patch.table_number {
            table.table_number = non_empty("table_number", &label)?;
        }
        if let Some(seats) = patch.seats {
            table.seats = seats;
        }
        if let Some(min) = patch.min_party_size {
            table.min_party_size = min;
        }
        if let Some(max) = patch.max_party_size {
            table.max_party_size = max;
        }
        if let Some(notes) = patch.notes {
            table.notes = notes;
        }
        if let Some(area_id) = patch.area_id {
            if let Some(id) = area_id
                && table.area_id != Some(id)
            {
                self.active_area(id).await?;
            }
            table.area_id = area_id;
        }
        validate_envelope(table.seats, table.min_party_size, table.max_party_size)
            .map_err(FloorError::Validation)?;
        table.updated_at = self.now();

        self.commit(vec![ConditionalWrite::update(
            Record::Table(table.clone()),
            current.version,
        )])
        .await?;
        Ok(table)
    }

    pub async fn get_table(&self, table_id: i64) -> FloorResult<DiningTable> {
        Ok(self.table_for_update(table_id).await?.record)
    }

    pub fn list_tables(&self, filter: &TableFilter) -> Vec<DiningTable> {
        self.registry.list_tables(filter)
    }

    pub fn get_available_tables_for_party(&self, party_size: i32) -> FloorResult<Vec<DiningTable>> {
        if party_size < 1 {
            return Err(FloorError::validation("party_size must be at least 1"));
        }
        Ok(self.registry.available_for_party(party_size))
    }

    pub fn get_table_stats(&self) -> TableStats {
        self.registry.stats()
    }

    // ========================================================================
    // Table state machine
    // ========================================================================

    /// Seat a party: new active session + table `occupied`, one commit.
    pub async fn seat_guests(
        &self,
        table_id: i64,
        request: SeatRequest,
    ) -> FloorResult<DiningSession> {
        if request.party_size < 1 {
            return Err(FloorError::validation("party_size must be at least 1"));
        }

        let table = self.table_for_update(table_id).await?;
        if !table.record.accepts_party(request.party_size) {
            return Err(FloorError::Capacity {
                table_id,
                party_size: request.party_size,
                min: table.record.min_party_size,
                max: table.record.max_party_size,
            });
        }
        if self.ledger.active_session(table_id).is_some() {
            return Err(FloorError::Conflict {
                table_id,
                status: table.record.status,
                reason: "an active session already exists".to_string(),
            });
        }

        let now = self.now();
        let (trigger, reservation) = match (table.record.status, request.reservation_id) {
            (TableStatus::Available, None) => (Trigger::SeatGuests, None),
            (TableStatus::Available, Some(rid)) => (
                Trigger::SeatGuests,
                Some(self.claim_reservation(rid, table_id, now).await?),
            ),
            (TableStatus::Reserved, Some(rid)) => {
                let reservation = self.claim_reservation(rid, table_id, now).await?;
                // a later booking cannot take the slot the table is held for
                if !self.scheduler.holds_table(&reservation.record, now) {
                    return Err(FloorError::Conflict {
                        table_id,
                        status: TableStatus::Reserved,
                        reason: format!("table is held for another reservation, not {}", rid),
                    });
                }
                (Trigger::SeatReservation, Some(reservation))
            }
            (TableStatus::Reserved, None) => {
                return Err(FloorError::Conflict {
                    table_id,
                    status: TableStatus::Reserved,
                    reason: "table is held for a reservation".to_string(),
                });
            }
            (status, _) => {
                return Err(FloorError::Conflict {
                    table_id,
                    status,
                    reason: "table is not available".to_string(),
                });
            }
        };
        state_machine::check(table_id, table.record.status, TableStatus::Occupied, trigger)?;

        let session = self.ledger.open(snowflake_id(), table_id, &request, now);
        let occupied = with_status(&table.record, TableStatus::Occupied, now);
        let mut writes = vec![
            ConditionalWrite::update(Record::Table(occupied), table.version),
            ConditionalWrite::insert(Record::Session(session.clone())),
        ];
        if let Some(reservation) = reservation {
            let mut seated = reservation.record;
            seated.status = ReservationStatus::Seated;
            seated.updated_at = now;
            writes.push(ConditionalWrite::update(
                Record::Reservation(seated),
                reservation.version,
            ));
        }

        self.commit(writes).await?;
        tracing::info!(
            table_id,
            session_id = session.id,
            party_size = session.party_size,
            reservation_id = ?session.reservation_id,
            "Guests seated"
        );
        Ok(session)
    }

    /// Complete the active session and move the table to `cleaning`.
    ///
    /// Clearing a table that is already in `cleaning` with no active session
    /// returns it unchanged.
    pub async fn clear_table(&self, table_id: i64) -> FloorResult<DiningTable> {
        let table = self.table_for_update(table_id).await?;
        let Some(session) = self.active_session_for(&table).await? else {
            if table.record.status == TableStatus::Cleaning {
                tracing::debug!(table_id, "Table already cleared");
                return Ok(table.record);
            }
            return Err(FloorError::NotOccupied { table_id });
        };
        state_machine::check(
            table_id,
            table.record.status,
            TableStatus::Cleaning,
            Trigger::ClearTable,
        )?;

        let now = self.now();
        let cleaning = with_status(&table.record, TableStatus::Cleaning, now);
        let mut completed = session.record;
        completed.close(SessionStatus::Completed, now);

        self.commit(vec![
            ConditionalWrite::update(Record::Table(cleaning.clone()), table.version),
            ConditionalWrite::update(Record::Session(completed.clone()), session.version),
        ])
        .await?;
        tracing::info!(table_id, session_id = completed.id, "Table cleared");
        Ok(cleaning)
    }

    pub async fn mark_ready(&self, table_id: i64) -> FloorResult<DiningTable> {
        let table = self.table_for_update(table_id).await?;
        state_machine::check(
            table_id,
            table.record.status,
            TableStatus::Available,
            Trigger::MarkReady,
        )?;

        let ready = with_status(&table.record, TableStatus::Available, self.now());
        self.commit(vec![ConditionalWrite::update(
            Record::Table(ready.clone()),
            table.version,
        )])
        .await?;
        tracing::info!(table_id, "Table ready");
        Ok(ready)
    }

    /// Manual override. Leaving `occupied` closes the active session in the
    /// same commit: completed for `cleaning`, cancelled for `out_of_service`.
    pub async fn set_status(&self, table_id: i64, to: TableStatus) -> FloorResult<DiningTable> {
        let table = self.table_for_update(table_id).await?;
        let from = table.record.status;
        if from == to {
            return Ok(table.record);
        }
        state_machine::check_override(table_id, from, to)?;

        let now = self.now();
        let updated = with_status(&table.record, to, now);
        let mut writes = vec![ConditionalWrite::update(
            Record::Table(updated.clone()),
            table.version,
        )];
        if from == TableStatus::Occupied
            && let Some(session) = self.active_session_for(&table).await?
        {
            let outcome = if to == TableStatus::Cleaning {
                SessionStatus::Completed
            } else {
                SessionStatus::Cancelled
            };
            let mut closed = session.record;
            closed.close(outcome, now);
            writes.push(ConditionalWrite::update(
                Record::Session(closed),
                session.version,
            ));
        }

        self.commit(writes).await?;
        tracing::info!(table_id, %from, %to, "Table status overridden");
        Ok(updated)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub async fn get_active_session(&self, table_id: i64) -> FloorResult<Option<DiningSession>> {
        let table = self.table_for_update(table_id).await?;
        Ok(self.active_session_for(&table).await?.map(|s| s.record))
    }

    /// Session history for a table, newest first
    pub async fn list_sessions(&self, table_id: i64) -> FloorResult<Vec<DiningSession>> {
        Ok(self.ledger.history(table_id).await?)
    }

    /// Complete a session by id. Completing a closed session is a no-op.
    pub async fn complete_session(&self, session_id: i64) -> FloorResult<DiningSession> {
        let session = self.ledger.read(session_id).await?.ok_or(FloorError::NotFound {
            entity: Entity::Session,
            id: session_id,
        })?;
        if session.record.status.is_closed() {
            return Ok(session.record);
        }

        self.clear_table(session.record.table_id).await?;
        self.ledger
            .read(session_id)
            .await?
            .map(|s| s.record)
            .ok_or(FloorError::NotFound {
                entity: Entity::Session,
                id: session_id,
            })
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    pub async fn create_reservation(&self, request: ReservationCreate) -> FloorResult<Reservation> {
        // Version read before the durable query: any reservation committed in
        // between also rewrites the table and fails our commit.
        let table = self.table_for_update(request.table_id).await?;
        let now = self.now();
        self.scheduler.validate(&table.record, &request, now)?;

        let existing = self.scheduler.confirmed_for_table(request.table_id).await?;
        let reservation = Reservation {
            id: snowflake_id(),
            store_id: self.store_id(),
            table_id: request.table_id,
            party_size: request.party_size,
            customer_name: request.customer_name.trim().to_string(),
            phone: request.phone,
            reservation_time: request.reservation_time,
            duration_minutes: request.duration_minutes,
            status: ReservationStatus::Confirmed,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };
        if let Some(conflict) = self.scheduler.find_conflict(&reservation, &existing) {
            return Err(FloorError::ReservationConflict {
                table_id: reservation.table_id,
                conflicting_id: conflict.id,
            });
        }

        let mut updated = table.record.clone();
        updated.updated_at = now;
        if table.record.status == TableStatus::Available
            && self.scheduler.holds_table(&reservation, now)
        {
            state_machine::check(
                updated.id,
                TableStatus::Available,
                TableStatus::Reserved,
                Trigger::ReservationImminent,
            )?;
            updated.status = TableStatus::Reserved;
        }

        self.commit(vec![
            ConditionalWrite::update(Record::Table(updated.clone()), table.version),
            ConditionalWrite::insert(Record::Reservation(reservation.clone())),
        ])
        .await?;
        tracing::info!(
            reservation_id = reservation.id,
            table_id = reservation.table_id,
            reservation_time = reservation.reservation_time,
            table_status = %updated.status,
            "Reservation confirmed"
        );
        Ok(reservation)
    }

    /// Cancel; releases a `reserved` table unless another reservation still
    /// holds it. Cancelling twice is a no-op.
    pub async fn cancel_reservation(&self, reservation_id: i64) -> FloorResult<Reservation> {
        let current = self
            .scheduler
            .read(reservation_id)
            .await?
            .ok_or(FloorError::NotFound {
                entity: Entity::Reservation,
                id: reservation_id,
            })?;
        match current.record.status {
            ReservationStatus::Cancelled => return Ok(current.record),
            status if !status.can_transition_to(ReservationStatus::Cancelled) => {
                return Err(FloorError::ReservationNotConfirmed {
                    reservation_id,
                    status,
                });
            }
            _ => {}
        }

        let table = self.table_for_update(current.record.table_id).await?;
        let now = self.now();
        let others = self
            .scheduler
            .confirmed_for_table(current.record.table_id)
            .await?;

        let mut cancelled = current.record.clone();
        cancelled.status = ReservationStatus::Cancelled;
        cancelled.updated_at = now;

        let mut updated = table.record.clone();
        updated.updated_at = now;
        if table.record.status == TableStatus::Reserved
            && !self
                .scheduler
                .other_holds_table(&others, &[reservation_id], now)
        {
            state_machine::check(
                updated.id,
                TableStatus::Reserved,
                TableStatus::Available,
                Trigger::ReleaseReservation,
            )?;
            updated.status = TableStatus::Available;
        }

        self.commit(vec![
            ConditionalWrite::update(Record::Reservation(cancelled.clone()), current.version),
            ConditionalWrite::update(Record::Table(updated.clone()), table.version),
        ])
        .await?;
        tracing::info!(
            reservation_id,
            table_id = updated.id,
            table_status = %updated.status,
            "Reservation cancelled"
        );
        Ok(cancelled)
    }

    pub async fn list_reservations(&self, filter: &ReservationFilter) -> FloorResult<Vec<Reservation>> {
        Ok(self.scheduler.list(filter).await?)
    }

    /// Mark every confirmed reservation whose window has elapsed as
    /// `no_show`, releasing tables they were holding. One conditional
    /// commit per table; losing a race to another terminal is not an error.
    pub async fn expire_stale_reservations(&self) -> FloorResult<SweepReport> {
        let now = self.now();
        let mut by_table: BTreeMap<i64, Vec<Versioned<Reservation>>> = BTreeMap::new();
        for reservation in self.scheduler.expired(now).await? {
            by_table
                .entry(reservation.record.table_id)
                .or_default()
                .push(reservation);
        }

        let mut report = SweepReport::default();
        for (table_id, batch) in by_table {
            let count = batch.len();
            match self.expire_for_table(table_id, batch, now).await {
                Ok(released) => {
                    report.expired += count;
                    if released {
                        report.released_tables += 1;
                    }
                }
                Err(e) if e.is_retryable() => {
                    tracing::debug!(table_id, error = %e, "Expiry lost a race, next sweep will retry");
                    report.skipped += count;
                }
                Err(e) => {
                    tracing::warn!(table_id, error = %e, "Failed to expire reservations");
                    report.failed += count;
                }
            }
        }
        Ok(report)
    }

    async fn expire_for_table(
        &self,
        table_id: i64,
        batch: Vec<Versioned<Reservation>>,
        now: i64,
    ) -> FloorResult<bool> {
        let ids: Vec<i64> = batch.iter().map(|r| r.record.id).collect();
        let mut writes: Vec<ConditionalWrite> = batch
            .into_iter()
            .map(|r| {
                let mut no_show = r.record;
                no_show.status = ReservationStatus::NoShow;
                no_show.updated_at = now;
                ConditionalWrite::update(Record::Reservation(no_show), r.version)
            })
            .collect();

        let mut released = false;
        let table = self.registry.refresh_table(table_id).await?;
        if let Some(table) = table
            && table.record.status == TableStatus::Reserved
        {
            let remaining = self.scheduler.confirmed_for_table(table_id).await?;
            if !self.scheduler.other_holds_table(&remaining, &ids, now) {
                state_machine::check(
                    table_id,
                    TableStatus::Reserved,
                    TableStatus::Available,
                    Trigger::ReleaseReservation,
                )?;
                let available = with_status(&table.record, TableStatus::Available, now);
                writes.push(ConditionalWrite::update(
                    Record::Table(available),
                    table.version,
                ));
                released = true;
            }
        }

        self.commit(writes).await?;
        for id in &ids {
            tracing::info!(reservation_id = id, table_id, "Reservation marked no-show");
        }
        Ok(released)
    }

    // ========================================================================
    // Replica maintenance (driven by the change fan-out)
    // ========================================================================

    /// Full reload after a lagged notification stream
    pub async fn reload(&self) -> FloorResult<()> {
        self.load().await
    }

    /// Re-read one table and its active session
    pub async fn refresh_table(&self, table_id: i64) -> FloorResult<Option<DiningTable>> {
        let table = self.registry.refresh_table(table_id).await?;
        self.ledger.fetch_active_session(table_id).await?;
        Ok(table.map(|t| t.record))
    }

    pub async fn refresh_area(&self, area_id: i64) -> FloorResult<Option<Area>> {
        Ok(self.registry.refresh_area(area_id).await?.map(|a| a.record))
    }

    /// Build the UI event for a notice whose table/area was just refreshed
    pub async fn event_for(&self, notice: &ChangeNotice) -> FloorResult<FloorEvent> {
        let deleted = notice.operation == ChangeOperation::Delete;
        let table_id = notice.table_id.unwrap_or(notice.id);

        let event = match notice.entity {
            Entity::Area => FloorEvent::AreaChanged {
                area_id: notice.id,
                operation: notice.operation,
                area: if deleted {
                    None
                } else {
                    self.registry.area(notice.id).map(|a| a.record)
                },
            },
            Entity::Table => FloorEvent::TableChanged {
                table_id: notice.id,
                operation: notice.operation,
                table: if deleted {
                    None
                } else {
                    self.registry.table(notice.id).map(|t| t.record)
                },
            },
            Entity::Session => {
                let session = match self.ledger.active_session(table_id) {
                    _ if deleted => None,
                    Some(active) if active.record.id == notice.id => Some(active.record),
                    _ => found(self.ledger.read(notice.id).await)?.map(|s| s.record),
                };
                FloorEvent::SessionChanged {
                    session_id: notice.id,
                    table_id,
                    operation: notice.operation,
                    session,
                }
            }
            Entity::Reservation => {
                let reservation = if deleted {
                    None
                } else {
                    found(self.scheduler.read(notice.id).await)?.map(|r| r.record)
                };
                FloorEvent::ReservationChanged {
                    reservation_id: notice.id,
                    table_id,
                    operation: notice.operation,
                    reservation,
                }
            }
        };
        Ok(event)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Cached table, falling back to the gateway for tables this replica
    /// has not heard about yet
    async fn table_for_update(&self, table_id: i64) -> FloorResult<Versioned<DiningTable>> {
        if let Some(table) = self.registry.table(table_id) {
            return Ok(table);
        }
        self.registry
            .refresh_table(table_id)
            .await?
            .ok_or(FloorError::NotFound {
                entity: Entity::Table,
                id: table_id,
            })
    }

    async fn area_for_update(&self, area_id: i64) -> FloorResult<Versioned<Area>> {
        if let Some(area) = self.registry.area(area_id) {
            return Ok(area);
        }
        self.registry
            .refresh_area(area_id)
            .await?
            .ok_or(FloorError::NotFound {
                entity: Entity::Area,
                id: area_id,
            })
    }

    async fn active_area(&self, area_id: i64) -> FloorResult<Area> {
        let area = self.area_for_update(area_id).await?.record;
        if !area.is_active {
            return Err(FloorError::AreaInactive { area_id });
        }
        Ok(area)
    }

    /// Ledger index first; an occupied table the index knows nothing about
    /// gets a durable lookup
    async fn active_session_for(
        &self,
        table: &Versioned<DiningTable>,
    ) -> FloorResult<Option<Versioned<DiningSession>>> {
        if let Some(session) = self.ledger.active_session(table.record.id) {
            return Ok(Some(session));
        }
        if table.record.status == TableStatus::Occupied {
            return Ok(self.ledger.fetch_active_session(table.record.id).await?);
        }
        Ok(None)
    }

    async fn claim_reservation(
        &self,
        reservation_id: i64,
        table_id: i64,
        now: i64,
    ) -> FloorResult<Versioned<Reservation>> {
        let reservation = self
            .scheduler
            .read(reservation_id)
            .await?
            .ok_or(FloorError::NotFound {
                entity: Entity::Reservation,
                id: reservation_id,
            })?;
        let record = &reservation.record;
        if record.table_id != table_id {
            return Err(FloorError::validation(format!(
                "Reservation {} belongs to table {}",
                reservation_id, record.table_id
            )));
        }
        if !record.is_confirmed() {
            return Err(FloorError::ReservationNotConfirmed {
                reservation_id,
                status: record.status,
            });
        }
        if self.scheduler.is_expired(record, now) {
            return Err(FloorError::ReservationExpired { reservation_id });
        }
        Ok(reservation)
    }

    /// Commit a batch and write it through to the local replica. A version
    /// conflict refreshes the affected table before surfacing `StaleState`.
    async fn commit(&self, writes: Vec<ConditionalWrite>) -> FloorResult<()> {
        let records: Vec<Record> = writes.iter().map(|w| w.record.clone()).collect();

        match self.gateway.commit(writes).await {
            Ok(versions) => {
                for (version, record) in versions.into_iter().zip(records) {
                    self.apply_local(Versioned::new(version, record));
                }
                Ok(())
            }
            Err(GatewayError::VersionConflict {
                entity,
                id,
                expected,
                actual,
            }) => {
                tracing::debug!(%entity, id, ?expected, ?actual, "Conditional write rejected");
                let table_id = records
                    .iter()
                    .find(|r| r.entity() == entity && r.id() == id)
                    .and_then(Record::table_id);
                let resync = match (entity, table_id) {
                    (Entity::Area, _) => self.refresh_area(id).await.map(|_| ()),
                    (_, Some(table_id)) => self.refresh_table(table_id).await.map(|_| ()),
                    (_, None) => Ok(()),
                };
                if let Err(e) = resync {
                    tracing::warn!(%entity, id, error = %e, "Replica refresh after conflict failed");
                }
                Err(FloorError::StaleState { entity, id })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn apply_local(&self, committed: Versioned<Record>) {
        let version = committed.version;
        match committed.record {
            Record::Area(area) => self.registry.upsert_area(Versioned::new(version, area)),
            Record::Table(table) => self.registry.upsert_table(Versioned::new(version, table)),
            Record::Session(session) => self.ledger.apply(Versioned::new(version, session)),
            Record::Reservation(_) => {}
        }
    }
}

fn with_status(table: &DiningTable, status: TableStatus, now: i64) -> DiningTable {
    DiningTable {
        status,
        updated_at: now,
        ..table.clone()
    }
}

fn non_empty(field: &str, value: &str) -> FloorResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FloorError::validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// A record deleted between notice and read is simply absent
fn found<T>(result: GatewayResult<Option<T>>) -> FloorResult<Option<T>> {
    match result {
        Ok(v) => Ok(v),
        Err(GatewayError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
