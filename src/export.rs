// src/export.rs

use crate::fieldpath;
use crate::projection::FieldPath;
use serde_json::Value;

/// Render the record as one tab-separated line, fields in exactly the
/// given order. Values are expected to already be single-line text; no
/// escaping is applied.
pub fn serialize(record: &Value, order: &[FieldPath]) -> String {
    order
        .iter()
        .map(|p| fieldpath::get(record, p.as_str()))
        .collect::<Vec<_>>()
        .join("\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::DEFAULT_ORDER;
    use serde_json::json;

    #[test]
    fn tab_count_is_always_order_length_minus_one() {
        let empty = json!({});
        let full = json!({
            "loadNumber": "123",
            "shipper": { "name": "ACME", "city": "Toledo" },
            "weight": "42000"
        });
        for record in [&empty, &full] {
            let line = serialize(record, &DEFAULT_ORDER);
            assert_eq!(
                line.matches('\t').count(),
                DEFAULT_ORDER.len() - 1,
                "tab count must not depend on which fields are filled"
            );
        }
    }

    #[test]
    fn fields_follow_the_given_order() {
        let record = json!({
            "loadNumber": "123",
            "weight": "42000",
            "amount": "1500.25"
        });
        let order = [FieldPath::Weight, FieldPath::LoadNumber, FieldPath::Amount];
        assert_eq!(serialize(&record, &order), "42000\t123\t1500.25");
    }

    #[test]
    fn missing_fields_serialize_as_empty_columns() {
        let record = json!({ "loadNumber": "123" });
        let order = [FieldPath::LoadNumber, FieldPath::Weight, FieldPath::Amount];
        assert_eq!(serialize(&record, &order), "123\t\t");
    }

    #[test]
    fn empty_order_yields_an_empty_line() {
        assert_eq!(serialize(&json!({}), &[]), "");
    }
}
