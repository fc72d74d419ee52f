//! Dining Session Model

use serde::{Deserialize, Serialize};

/// Dining session status (用餐会话状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled sessions are frozen
    pub fn is_closed(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// One party's stay at a table, from seating until the table is cleared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningSession {
    pub id: i64,
    pub store_id: i64,
    pub table_id: i64,
    pub party_size: i32,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub seated_at: i64,
    pub status: SessionStatus,
    pub ended_at: Option<i64>,
    /// Reservation this party was seated against, if any
    #[serde(default)]
    pub reservation_id: Option<i64>,
}

impl DiningSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Close the session. Returns `false` if it was already closed.
    pub fn close(&mut self, status: SessionStatus, at: i64) -> bool {
        if self.status.is_closed() {
            return false;
        }
        self.status = status;
        self.ended_at = Some(at);
        true
    }
}

/// Seat guests payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatRequest {
    pub party_size: i32,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    /// Seat against an existing confirmed reservation
    pub reservation_id: Option<i64>,
}
