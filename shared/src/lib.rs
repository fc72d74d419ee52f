//! Shared types for the table coordination service
//!
//! Floor models (areas, tables, dining sessions, reservations), the unified
//! error system, and the change/event messages exchanged between the
//! coordinator and the terminals that render the floor plan.

pub mod error;
pub mod message;
pub mod models;
pub mod types;
pub mod util;

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{ChangeNotice, ChangeOperation, Entity, FloorEvent};
