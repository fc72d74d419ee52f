//! 错误码 - 终端只认数字码
//!
//! | 范围 | 分类 |
//! |------|------|
//! | 0-999 | 通用 |
//! | 7000-7099 | 桌台 (状态机、容量、并发) |
//! | 7100-7199 | 区域 |
//! | 7200-7299 | 用餐会话 |
//! | 7300-7399 | 预订 |
//! | 9000+ | 系统 |

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    Unknown = 1,
    ValidationFailed = 2,

    TableNotFound = 7001,
    /// An active session already holds the table
    TableOccupied = 7002,
    TableAlreadyEmpty = 7003,
    InvalidTableTransition = 7004,
    PartySizeOutOfRange = 7005,
    /// Another terminal won the race; re-read and retry
    TableStateStale = 7006,
    TableNotAvailable = 7007,

    AreaNotFound = 7101,
    AreaInactive = 7102,

    SessionNotFound = 7201,

    ReservationNotFound = 7301,
    ReservationConflict = 7302,
    ReservationInPast = 7303,
    ReservationExpired = 7304,
    ReservationNotConfirmed = 7305,

    InternalError = 9001,
    DatabaseError = 9002,
}

impl ErrorCode {
    const ALL: [ErrorCode; 20] = [
        Self::Success,
        Self::Unknown,
        Self::ValidationFailed,
        Self::TableNotFound,
        Self::TableOccupied,
        Self::TableAlreadyEmpty,
        Self::InvalidTableTransition,
        Self::PartySizeOutOfRange,
        Self::TableStateStale,
        Self::TableNotAvailable,
        Self::AreaNotFound,
        Self::AreaInactive,
        Self::SessionNotFound,
        Self::ReservationNotFound,
        Self::ReservationConflict,
        Self::ReservationInPast,
        Self::ReservationExpired,
        Self::ReservationNotConfirmed,
        Self::InternalError,
        Self::DatabaseError,
    ];

    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default English message, used when no richer context exists
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Unknown => "An unknown error occurred",
            Self::ValidationFailed => "Validation failed",
            Self::TableNotFound => "Table not found",
            Self::TableOccupied => "Table is occupied",
            Self::TableAlreadyEmpty => "Table is already empty",
            Self::InvalidTableTransition => "Table status transition is not allowed",
            Self::PartySizeOutOfRange => "Party size is outside the table's range",
            Self::TableStateStale => "Table was changed by another terminal",
            Self::TableNotAvailable => "Table is not available",
            Self::AreaNotFound => "Area not found",
            Self::AreaInactive => "Area is inactive",
            Self::SessionNotFound => "Dining session not found",
            Self::ReservationNotFound => "Reservation not found",
            Self::ReservationConflict => "Reservation overlaps an existing reservation",
            Self::ReservationInPast => "Reservation time must be in the future",
            Self::ReservationExpired => "Reservation has expired",
            Self::ReservationNotConfirmed => "Reservation is no longer confirmed",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            0..1000 => ErrorCategory::General,
            7000..7100 => ErrorCategory::Table,
            7100..7200 => ErrorCategory::Area,
            7200..7300 => ErrorCategory::Session,
            7300..7400 => ErrorCategory::Reservation,
            _ => ErrorCategory::System,
        }
    }

    /// 409 = 状态被别人占着, 422 = 业务规则拒绝
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::TableNotFound
            | Self::AreaNotFound
            | Self::SessionNotFound
            | Self::ReservationNotFound => StatusCode::NOT_FOUND,
            Self::TableOccupied
            | Self::TableNotAvailable
            | Self::TableStateStale
            | Self::ReservationConflict => StatusCode::CONFLICT,
            Self::InvalidTableTransition
            | Self::TableAlreadyEmpty
            | Self::PartySizeOutOfRange
            | Self::AreaInactive
            | Self::ReservationInPast
            | Self::ReservationExpired
            | Self::ReservationNotConfirmed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unknown | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// 错误分类 (按错误码区间)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Table,
    Area,
    Session,
    Reservation,
    System,
}

/// Numeric code with no matching [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code {0}")]
pub struct InvalidErrorCode(pub u16);

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_are_stable() {
        assert_eq!(ErrorCode::TableNotFound.code(), 7001);
        assert_eq!(ErrorCode::TableOccupied.code(), 7002);
        assert_eq!(ErrorCode::PartySizeOutOfRange.code(), 7005);
        assert_eq!(ErrorCode::TableStateStale.code(), 7006);
        assert_eq!(ErrorCode::AreaInactive.code(), 7102);
        assert_eq!(ErrorCode::ReservationConflict.code(), 7302);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
    }

    #[test]
    fn every_code_parses_back() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(7008), Err(InvalidErrorCode(7008)));
        assert_eq!(ErrorCode::try_from(3), Err(InvalidErrorCode(3)));
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::ReservationConflict).unwrap(), "7302");
        let code: ErrorCode = serde_json::from_str("7201").unwrap();
        assert_eq!(code, ErrorCode::SessionNotFound);
        assert!(serde_json::from_str::<ErrorCode>("4001").is_err());
    }

    #[test]
    fn categories_follow_ranges() {
        assert_eq!(ErrorCode::ValidationFailed.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::TableStateStale.category(), ErrorCategory::Table);
        assert_eq!(ErrorCode::AreaNotFound.category(), ErrorCategory::Area);
        assert_eq!(ErrorCode::SessionNotFound.category(), ErrorCategory::Session);
        assert_eq!(ErrorCode::ReservationExpired.category(), ErrorCategory::Reservation);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn conflicts_and_refusals_map_apart() {
        assert_eq!(ErrorCode::TableStateStale.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ReservationConflict.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InvalidTableTransition.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ErrorCode::TableNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ValidationFailed.http_status(), StatusCode::BAD_REQUEST);
    }
}
