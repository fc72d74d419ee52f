//! 桌号自动生成

use shared::models::{Area, DiningTable};

use super::settings::NumberingStyle;

/// Next free label for a table created without one
///
/// `AreaPrefixed` counts within the area using the first letter of the area
/// name; tables without an area (or areas with an empty name) fall back to
/// store-wide numeric labels. Labels are not unique, so a maxed-out number
/// is simply repeated.
pub fn next_table_number(style: NumberingStyle, area: Option<&Area>, tables: &[DiningTable]) -> String {
    let prefix = match (style, area) {
        (NumberingStyle::AreaPrefixed, Some(area)) => area
            .name
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect::<String>()),
        _ => None,
    };

    match (prefix, area) {
        (Some(prefix), Some(area)) => {
            let next = tables
                .iter()
                .filter(|t| t.area_id == Some(area.id))
                .filter_map(|t| t.table_number.strip_prefix(prefix.as_str()))
                .filter_map(|n| n.parse::<u64>().ok())
                .max()
                .unwrap_or(0)
                .saturating_add(1);
            format!("{}{}", prefix, next)
        }
        _ => {
            let next = tables
                .iter()
                .filter_map(|t| t.table_number.parse::<u64>().ok())
                .max()
                .unwrap_or(0)
                .saturating_add(1);
            next.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::TableStatus;

    fn area(id: i64, name: &str) -> Area {
        Area {
            id,
            store_id: 1,
            name: name.to_string(),
            color: "#000".to_string(),
            sort_order: 0,
            is_active: true,
        }
    }

    fn table(label: &str, area_id: Option<i64>) -> DiningTable {
        DiningTable {
            id: 0,
            store_id: 1,
            table_number: label.to_string(),
            seats: 4,
            min_party_size: 1,
            max_party_size: None,
            status: TableStatus::Available,
            notes: None,
            area_id,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn numeric_counts_across_the_store() {
        let tables = vec![table("1", None), table("7", Some(1)), table("T3", Some(2))];
        assert_eq!(next_table_number(NumberingStyle::Numeric, None, &tables), "8");
        assert_eq!(next_table_number(NumberingStyle::Numeric, None, &[]), "1");
    }

    #[test]
    fn area_prefixed_counts_within_the_area() {
        let terrace = area(2, "terrace");
        let tables = vec![
            table("T1", Some(2)),
            table("T4", Some(2)),
            table("T9", Some(3)),
            table("12", None),
        ];
        assert_eq!(
            next_table_number(NumberingStyle::AreaPrefixed, Some(&terrace), &tables),
            "T5"
        );
        assert_eq!(
            next_table_number(NumberingStyle::AreaPrefixed, Some(&area(4, "Bar")), &tables),
            "B1"
        );
        assert_eq!(
            next_table_number(NumberingStyle::AreaPrefixed, None, &tables),
            "13"
        );
    }

    #[test]
    fn huge_labels_do_not_overflow() {
        let max = u64::MAX.to_string();
        let tables = vec![table(&max, Some(2)), table(&format!("T{}", max), Some(2))];
        assert_eq!(next_table_number(NumberingStyle::Numeric, None, &tables), max);
        assert_eq!(
            next_table_number(NumberingStyle::AreaPrefixed, Some(&area(2, "Terrace")), &tables),
            format!("T{}", max)
        );
    }
}
