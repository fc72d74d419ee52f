//! Area Model

use serde::{Deserialize, Serialize};

/// Default display color for new areas
pub const DEFAULT_AREA_COLOR: &str = "#607D8B";

/// Area entity (区域：大厅、露台、包厢等)
///
/// Areas are never physically removed: historical tables and sessions keep
/// pointing at them, so deletion flips `is_active` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: i64,
    pub store_id: i64,
    pub name: String,
    /// Display color (hex, e.g. `#1E88E5`)
    pub color: String,
    pub sort_order: i32,
    pub is_active: bool,
}

/// Create area payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaCreate {
    pub name: String,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

/// Update area payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}
