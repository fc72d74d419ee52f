//! Dining Table Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::serde_helpers::double_option;

/// Table occupancy status (桌台状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
    Cleaning,
    OutOfService,
}

impl TableStatus {
    pub const ALL: [TableStatus; 5] = [
        TableStatus::Available,
        TableStatus::Occupied,
        TableStatus::Reserved,
        TableStatus::Cleaning,
        TableStatus::OutOfService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Reserved => "reserved",
            Self::Cleaning => "cleaning",
            Self::OutOfService => "out_of_service",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown table status: {}", s))
    }
}

/// Dining table entity (桌台)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub store_id: i64,
    /// Human label, unique within an area but not across the store
    pub table_number: String,
    pub seats: i32,
    pub min_party_size: i32,
    /// `None` = no upper bound
    pub max_party_size: Option<i32>,
    pub status: TableStatus,
    pub notes: Option<String>,
    /// Weak reference: a table may be unassigned
    pub area_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DiningTable {
    /// Party size satisfies the min/max envelope
    pub fn accepts_party(&self, party_size: i32) -> bool {
        party_size >= self.min_party_size
            && self.max_party_size.is_none_or(|max| party_size <= max)
    }

    /// Envelope check plus enough physical seats
    pub fn fits_party(&self, party_size: i32) -> bool {
        self.seats >= party_size && self.accepts_party(party_size)
    }
}

/// Validate a party-size envelope (`min >= 1`, `max >= min` when set)
pub fn validate_envelope(
    seats: i32,
    min_party_size: i32,
    max_party_size: Option<i32>,
) -> Result<(), String> {
    if seats < 1 {
        return Err(format!("seats must be at least 1 (got {})", seats));
    }
    if min_party_size < 1 {
        return Err(format!(
            "min_party_size must be at least 1 (got {})",
            min_party_size
        ));
    }
    if let Some(max) = max_party_size
        && max < min_party_size
    {
        return Err(format!(
            "max_party_size ({}) must be >= min_party_size ({})",
            max, min_party_size
        ));
    }
    Ok(())
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    /// Omit to let the store's numbering style pick the next label
    pub table_number: Option<String>,
    pub seats: i32,
    pub min_party_size: Option<i32>,
    pub max_party_size: Option<i32>,
    pub notes: Option<String>,
    pub area_id: Option<i64>,
}

/// Update dining table payload
///
/// Status is deliberately absent: it only moves through the state machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiningTableUpdate {
    pub table_number: Option<String>,
    pub seats: Option<i32>,
    pub min_party_size: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_party_size: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub area_id: Option<Option<i64>>,
}

/// Filter for listing tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableFilter {
    pub area_id: Option<i64>,
    pub status: Option<TableStatus>,
}

impl TableFilter {
    pub fn matches(&self, table: &DiningTable) -> bool {
        self.area_id.is_none_or(|area| table.area_id == Some(area))
            && self.status.is_none_or(|status| table.status == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(seats: i32, min: i32, max: Option<i32>) -> DiningTable {
        DiningTable {
            id: 1,
            store_id: 1,
            table_number: "1".to_string(),
            seats,
            min_party_size: min,
            max_party_size: max,
            status: TableStatus::Available,
            notes: None,
            area_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn envelope_bounds() {
        let t = table(4, 2, Some(6));
        assert!(!t.accepts_party(1));
        assert!(t.accepts_party(2));
        assert!(t.accepts_party(6));
        assert!(!t.accepts_party(7));

        let open = table(6, 4, None);
        assert!(open.accepts_party(40));
        assert!(!open.fits_party(40));
    }

    #[test]
    fn envelope_validation() {
        assert!(validate_envelope(4, 1, None).is_ok());
        assert!(validate_envelope(4, 2, Some(2)).is_ok());
        assert!(validate_envelope(4, 0, None).is_err());
        assert!(validate_envelope(4, 3, Some(2)).is_err());
        assert!(validate_envelope(0, 1, None).is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in TableStatus::ALL {
            assert_eq!(status.as_str().parse::<TableStatus>().unwrap(), status);
        }
        assert!("closed".parse::<TableStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&TableStatus::OutOfService).unwrap(),
            "\"out_of_service\""
        );
    }

    #[test]
    fn filter_matches_area_and_status() {
        let mut t = table(4, 1, None);
        t.area_id = Some(9);
        let filter = TableFilter {
            area_id: Some(9),
            status: Some(TableStatus::Available),
        };
        assert!(filter.matches(&t));
        t.status = TableStatus::Cleaning;
        assert!(!filter.matches(&t));
        assert!(TableFilter::default().matches(&t));
    }
}
