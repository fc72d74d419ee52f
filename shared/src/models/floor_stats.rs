//! Floor statistics

use serde::{Deserialize, Serialize};

use super::dining_table::{DiningTable, TableStatus};

/// Table counts per status (桌台统计)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub reserved: usize,
    pub cleaning: usize,
    pub out_of_service: usize,
}

impl TableStats {
    pub fn record(&mut self, status: TableStatus) {
        self.total += 1;
        match status {
            TableStatus::Available => self.available += 1,
            TableStatus::Occupied => self.occupied += 1,
            TableStatus::Reserved => self.reserved += 1,
            TableStatus::Cleaning => self.cleaning += 1,
            TableStatus::OutOfService => self.out_of_service += 1,
        }
    }
}

impl<'a> FromIterator<&'a DiningTable> for TableStats {
    fn from_iter<I: IntoIterator<Item = &'a DiningTable>>(iter: I) -> Self {
        let mut stats = TableStats::default();
        for table in iter {
            stats.record(table.status);
        }
        stats
    }
}
