//! Data models
//!
//! Shared between the table server and the terminals (via API and events).
//! All IDs are `i64` snowflakes, all timestamps are Unix millis.

pub mod area;
pub mod dining_session;
pub mod dining_table;
pub mod floor_stats;
pub mod reservation;
pub mod serde_helpers;

// Re-exports
pub use area::*;
pub use dining_session::*;
pub use dining_table::*;
pub use floor_stats::*;
pub use reservation::*;
