//! Field extraction from semi-structured report tables.
//!
//! Report pages carry no schema; the only usable structure is "label cell,
//! value cell". A row contributes a field only when its second cell parses as
//! an integer after stripping thousands separators. Everything else is
//! silently skipped.

use crate::api::TableRow;
use crate::models::FieldMap;

/// Extract labeled integer fields from the rows of one report page.
///
/// The last occurrence wins when a label repeats. An empty result is a valid
/// outcome; downstream code only ever checks for the absence of expected keys.
pub fn extract_fields(rows: &[TableRow]) -> FieldMap {
    let mut fields = FieldMap::default();

    for row in rows {
        if row.len() < 2 {
            continue;
        }

        let label = row[0].trim();
        let raw_value = row[1].trim().replace(',', "");
        if let Ok(value) = raw_value.parse::<i64>() {
            fields.insert(label.to_string(), value);
        }
    }

    fields
}
