//! Floor coordinator errors
//!
//! Every operation returns either the updated entity or exactly one of
//! these. Only [`FloorError::StaleState`] is worth retrying automatically.

use shared::error::{AppError, ErrorCode};
use shared::message::Entity;
use shared::models::{ReservationStatus, TableStatus};
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum FloorError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Party of {party_size} is outside the envelope of table {table_id} (min {min}, max {max:?})")]
    Capacity {
        table_id: i64,
        party_size: i32,
        min: i32,
        max: Option<i32>,
    },

    #[error("Table {table_id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        table_id: i64,
        from: TableStatus,
        to: TableStatus,
    },

    #[error("Table {table_id} is {status}: {reason}")]
    Conflict {
        table_id: i64,
        status: TableStatus,
        reason: String,
    },

    #[error("Reservation window overlaps reservation {conflicting_id} on table {table_id}")]
    ReservationConflict { table_id: i64, conflicting_id: i64 },

    #[error("Reservation time {reservation_time} is not in the future (now {now})")]
    PastTime { reservation_time: i64, now: i64 },

    #[error("Reservation {reservation_id} is {status}")]
    ReservationNotConfirmed {
        reservation_id: i64,
        status: ReservationStatus,
    },

    #[error("Reservation {reservation_id} window has elapsed")]
    ReservationExpired { reservation_id: i64 },

    #[error("Area {area_id} is inactive")]
    AreaInactive { area_id: i64 },

    #[error("{entity} {id} changed underneath this request, re-read and retry")]
    StaleState { entity: Entity, id: i64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("Table {table_id} has no active session")]
    NotOccupied { table_id: i64 },

    #[error("Storage error: {0}")]
    Storage(GatewayError),
}

pub type FloorResult<T> = Result<T, FloorError>;

impl FloorError {
    /// Only optimistic-concurrency failures are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, FloorError::StaleState { .. })
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        FloorError::Validation(msg.into())
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            FloorError::Validation(_) => ErrorCode::ValidationFailed,
            FloorError::Capacity { .. } => ErrorCode::PartySizeOutOfRange,
            FloorError::InvalidTransition { .. } => ErrorCode::InvalidTableTransition,
            FloorError::Conflict {
                status: TableStatus::Occupied,
                ..
            } => ErrorCode::TableOccupied,
            FloorError::Conflict { .. } => ErrorCode::TableNotAvailable,
            FloorError::ReservationConflict { .. } => ErrorCode::ReservationConflict,
            FloorError::PastTime { .. } => ErrorCode::ReservationInPast,
            FloorError::ReservationNotConfirmed { .. } => ErrorCode::ReservationNotConfirmed,
            FloorError::ReservationExpired { .. } => ErrorCode::ReservationExpired,
            FloorError::AreaInactive { .. } => ErrorCode::AreaInactive,
            FloorError::StaleState { .. } => ErrorCode::TableStateStale,
            FloorError::NotFound { entity, .. } => match entity {
                Entity::Area => ErrorCode::AreaNotFound,
                Entity::Table => ErrorCode::TableNotFound,
                Entity::Session => ErrorCode::SessionNotFound,
                Entity::Reservation => ErrorCode::ReservationNotFound,
            },
            FloorError::NotOccupied { .. } => ErrorCode::TableAlreadyEmpty,
            FloorError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<GatewayError> for FloorError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::VersionConflict { entity, id, .. } => FloorError::StaleState { entity, id },
            GatewayError::NotFound { entity, id } => FloorError::NotFound { entity, id },
            other => FloorError::Storage(other),
        }
    }
}

impl From<FloorError> for AppError {
    fn from(err: FloorError) -> Self {
        let code = err.error_code();
        let app = AppError::with_message(code, err.to_string());
        match err {
            FloorError::Capacity {
                table_id,
                party_size,
                min,
                max,
            } => app
                .with_detail("table_id", table_id)
                .with_detail("party_size", party_size)
                .with_detail("min_party_size", min)
                .with_detail("max_party_size", max),
            FloorError::InvalidTransition { table_id, from, to } => app
                .with_detail("table_id", table_id)
                .with_detail("from", from.as_str())
                .with_detail("to", to.as_str()),
            FloorError::Conflict {
                table_id, status, ..
            } => app
                .with_detail("table_id", table_id)
                .with_detail("status", status.as_str()),
            FloorError::ReservationConflict {
                table_id,
                conflicting_id,
            } => app
                .with_detail("table_id", table_id)
                .with_detail("conflicting_reservation_id", conflicting_id),
            FloorError::StaleState { entity, id } | FloorError::NotFound { entity, id } => app
                .with_detail("entity", entity.as_str())
                .with_detail("id", id),
            FloorError::NotOccupied { table_id } => app.with_detail("table_id", table_id),
            FloorError::ReservationNotConfirmed {
                reservation_id,
                status,
            } => app
                .with_detail("reservation_id", reservation_id)
                .with_detail("status", status.as_str()),
            FloorError::ReservationExpired { reservation_id } => {
                app.with_detail("reservation_id", reservation_id)
            }
            FloorError::AreaInactive { area_id } => app.with_detail("area_id", area_id),
            // 存储细节不外泄
            FloorError::Storage(e) => {
                tracing::error!(error = %e, "Floor storage failure");
                AppError::database("Storage failure")
            }
            FloorError::Validation(_) | FloorError::PastTime { .. } => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn only_stale_state_is_retryable() {
        assert!(
            FloorError::StaleState {
                entity: Entity::Table,
                id: 1
            }
            .is_retryable()
        );
        assert!(!FloorError::NotOccupied { table_id: 1 }.is_retryable());
        assert!(
            !FloorError::ReservationConflict {
                table_id: 1,
                conflicting_id: 2
            }
            .is_retryable()
        );
    }

    #[test]
    fn version_conflict_becomes_stale_state() {
        let err: FloorError = GatewayError::VersionConflict {
            entity: Entity::Table,
            id: 5,
            expected: Some(1),
            actual: Some(2),
        }
        .into();
        assert!(matches!(
            err,
            FloorError::StaleState {
                entity: Entity::Table,
                id: 5
            }
        ));
    }

    #[test]
    fn maps_to_unified_codes() {
        let app: AppError = FloorError::Capacity {
            table_id: 3,
            party_size: 3,
            min: 4,
            max: None,
        }
        .into();
        assert_eq!(app.code, ErrorCode::PartySizeOutOfRange);
        assert_eq!(app.http_status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(app.details.unwrap()["min_party_size"], 4);

        let app: AppError = FloorError::Conflict {
            table_id: 3,
            status: TableStatus::Occupied,
            reason: "guests seated".into(),
        }
        .into();
        assert_eq!(app.code, ErrorCode::TableOccupied);
        assert_eq!(app.http_status(), StatusCode::CONFLICT);

        let app: AppError = FloorError::NotFound {
            entity: Entity::Reservation,
            id: 9,
        }
        .into();
        assert_eq!(app.code, ErrorCode::ReservationNotFound);
        assert_eq!(app.http_status(), StatusCode::NOT_FOUND);
    }
}
