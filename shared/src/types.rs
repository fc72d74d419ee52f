//! Common types for the shared crate

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Store identifier (one coordinator replica serves one store)
pub type StoreId = i64;

/// Milliseconds per minute, used by window arithmetic on reservations
pub const MILLIS_PER_MINUTE: i64 = 60_000;
