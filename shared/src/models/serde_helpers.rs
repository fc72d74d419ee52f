//! Serde helpers for patch payloads

use serde::{Deserialize, Deserializer};

/// Distinguish "field absent" from "field explicitly null" in update payloads.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// - absent  -> `None` (leave unchanged)
/// - `null`  -> `Some(None)` (clear)
/// - value   -> `Some(Some(v))` (set)
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
