//! Types shared across crate boundaries.

use serde_json::{Map, Value};

/// One result row: column name to scalar value, in select-list order.
pub type Row = Map<String, Value>;

/// Column names that identify a coordinate on their own.
const COORDINATE_NAMES: &[&str] = &["lat", "lng", "lon"];

/// Whether a column name looks like a latitude or longitude field.
///
/// Matches any name containing `latitude` or `longitude` (so
/// `from_terminal_latitude` qualifies) plus the short forms `lat`, `lng`
/// and `lon`. Case-insensitive.
#[must_use]
pub fn is_coordinate_column(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("latitude")
        || lower.contains("longitude")
        || COORDINATE_NAMES.contains(&lower.as_str())
}

/// Whether any row carries a coordinate-like column.
#[must_use]
pub fn has_coordinates(rows: &[Row]) -> bool {
    rows.iter()
        .any(|row| row.keys().any(|key| is_coordinate_column(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_coordinate_column_names() {
        assert!(is_coordinate_column("latitude"));
        assert!(is_coordinate_column("Longitude"));
        assert!(is_coordinate_column("from_terminal_latitude"));
        assert!(is_coordinate_column("LAT"));
        assert!(is_coordinate_column("lng"));
        assert!(!is_coordinate_column("plateau"));
        assert!(!is_coordinate_column("country"));
        assert!(!is_coordinate_column("lattice"));
    }

    #[test]
    fn test_has_coordinates_checks_every_row() {
        let rows = vec![
            row(json!({"name": "Duisburg"})),
            row(json!({"name": "Rotterdam", "latitude": 51.9})),
        ];
        assert!(has_coordinates(&rows));
        assert!(!has_coordinates(&rows[..1]));
        assert!(!has_coordinates(&[]));
    }
}
