//! Reservation Scheduler
//!
//! Validation, overlap detection and the "is this reservation holding its
//! table yet" question. All reads here are durable: reservations are not
//! cached locally, so conflict checks always see every terminal's writes.

use std::sync::Arc;

use shared::message::Entity;
use shared::models::{
    DiningTable, Reservation, ReservationCreate, ReservationFilter, ReservationStatus,
    windows_overlap,
};

use super::error::{FloorError, FloorResult};
use super::settings::StoreSettings;
use crate::gateway::{GatewayResult, PersistenceGateway, RecordFilter, Versioned};

/// 最远可预订天数
pub const BOOKING_HORIZON_DAYS: i64 = 366;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub struct ReservationScheduler {
    settings: StoreSettings,
    gateway: Arc<dyn PersistenceGateway>,
}

impl ReservationScheduler {
    pub fn new(settings: StoreSettings, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { settings, gateway }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    // ========== Validation ==========

    /// Shape, envelope and time checks for a new reservation
    pub fn validate(
        &self,
        table: &DiningTable,
        request: &ReservationCreate,
        now: i64,
    ) -> FloorResult<()> {
        if request.party_size < 1 {
            return Err(FloorError::validation("party_size must be at least 1"));
        }
        if request.customer_name.trim().is_empty() {
            return Err(FloorError::validation("customer_name is required"));
        }
        if request.duration_minutes < 0 {
            return Err(FloorError::validation("duration_minutes cannot be negative"));
        }
        if !table.accepts_party(request.party_size) {
            return Err(FloorError::Capacity {
                table_id: table.id,
                party_size: request.party_size,
                min: table.min_party_size,
                max: table.max_party_size,
            });
        }
        if request.reservation_time <= now {
            return Err(FloorError::PastTime {
                reservation_time: request.reservation_time,
                now,
            });
        }
        let horizon = now.saturating_add(BOOKING_HORIZON_DAYS * MILLIS_PER_DAY);
        if request.reservation_time > horizon {
            return Err(FloorError::validation(format!(
                "reservation_time is more than {} days ahead",
                BOOKING_HORIZON_DAYS
            )));
        }
        Ok(())
    }

    /// First confirmed reservation whose window overlaps `candidate`
    pub fn find_conflict<'a>(
        &self,
        candidate: &Reservation,
        existing: &'a [Versioned<Reservation>],
    ) -> Option<&'a Reservation> {
        let default = self.settings.default_reservation_minutes;
        let window = candidate.window(default);
        existing
            .iter()
            .map(|v| &v.record)
            .filter(|r| r.id != candidate.id && r.is_confirmed())
            .find(|r| windows_overlap(window, r.window(default)))
    }

    /// Window has fully elapsed
    pub fn is_expired(&self, reservation: &Reservation, now: i64) -> bool {
        reservation.window(self.settings.default_reservation_minutes).1 <= now
    }

    /// Confirmed, not expired, and inside the lookahead
    pub fn holds_table(&self, reservation: &Reservation, now: i64) -> bool {
        reservation.is_confirmed()
            && !self.is_expired(reservation, now)
            && self.settings.is_imminent(reservation.reservation_time, now)
    }

    /// Any reservation other than `except` still holding the table
    pub fn other_holds_table(
        &self,
        reservations: &[Versioned<Reservation>],
        except: &[i64],
        now: i64,
    ) -> bool {
        reservations
            .iter()
            .map(|v| &v.record)
            .filter(|r| !except.contains(&r.id))
            .any(|r| self.holds_table(r, now))
    }

    // ========== Durable reads ==========

    pub async fn read(&self, reservation_id: i64) -> GatewayResult<Option<Versioned<Reservation>>> {
        Ok(self
            .gateway
            .read(Entity::Reservation, reservation_id)
            .await?
            .try_map(|r| r.into_reservation()))
    }

    /// Confirmed reservations on one table
    pub async fn confirmed_for_table(
        &self,
        table_id: i64,
    ) -> GatewayResult<Vec<Versioned<Reservation>>> {
        let filter = RecordFilter::store(self.settings.store_id)
            .table(table_id)
            .status(ReservationStatus::Confirmed.as_str());
        self.query(&filter).await
    }

    /// Confirmed reservations whose window has fully elapsed
    pub async fn expired(&self, now: i64) -> GatewayResult<Vec<Versioned<Reservation>>> {
        let filter = RecordFilter::store(self.settings.store_id)
            .status(ReservationStatus::Confirmed.as_str());
        let mut expired: Vec<_> = self
            .query(&filter)
            .await?
            .into_iter()
            .filter(|r| self.is_expired(&r.record, now))
            .collect();
        expired.sort_by_key(|r| (r.record.table_id, r.record.reservation_time));
        Ok(expired)
    }

    /// Reservations by start time
    pub async fn list(&self, filter: &ReservationFilter) -> GatewayResult<Vec<Reservation>> {
        let mut record_filter = RecordFilter::store(self.settings.store_id);
        if let Some(table_id) = filter.table_id {
            record_filter = record_filter.table(table_id);
        }
        if let Some(status) = filter.status {
            record_filter = record_filter.status(status.as_str());
        }

        let mut reservations: Vec<Reservation> = self
            .query(&record_filter)
            .await?
            .into_iter()
            .map(|v| v.record)
            .filter(|r| filter.matches(r))
            .collect();
        reservations.sort_by_key(|r| (r.reservation_time, r.id));
        Ok(reservations)
    }

    async fn query(&self, filter: &RecordFilter) -> GatewayResult<Vec<Versioned<Reservation>>> {
        Ok(self
            .gateway
            .query(Entity::Reservation, filter)
            .await?
            .into_iter()
            .filter_map(|v| v.try_map(|r| r.into_reservation()))
            .collect())
    }
}
