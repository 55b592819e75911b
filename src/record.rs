// src/record.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// One party's address block on a rate confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressRecord {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
}

impl AddressRecord {
    /// True when every field is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|f| f.trim().is_empty())
    }

    fn fields(&self) -> [&str; 6] {
        [
            &self.name,
            &self.address,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.phone,
        ]
    }

    /// Collapse newlines and whitespace runs to single spaces and trim,
    /// in every field.
    pub fn tidy(&self) -> AddressRecord {
        AddressRecord {
            name: clean_whitespace(&self.name),
            address: clean_whitespace(&self.address),
            city: clean_whitespace(&self.city),
            state: clean_whitespace(&self.state),
            zip_code: clean_whitespace(&self.zip_code),
            phone: clean_whitespace(&self.phone),
        }
    }
}

/// All structured data extracted from one page of a rate confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipmentRecord {
    pub load_number: String,
    pub shipper: AddressRecord,
    pub consignee: AddressRecord,
    pub weight: String,
    pub amount: String,
    pub truck_number: String,
}

// ---------------------------------------------------------------------------
// Normalization over untrusted model output
// ---------------------------------------------------------------------------

/// Pull a string out of an untrusted JSON object field. Anything that is
/// not a string (missing, null, number, nested object) becomes "".
fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Shape an untrusted address value into a well-formed `AddressRecord`.
///
/// The model sometimes emits a free-text placeholder (a bare string, null,
/// or an array) where the address object was requested. Those collapse to
/// an all-empty record rather than being coerced into one field. Total:
/// never fails for any input shape.
pub fn normalize_address(raw: &Value) -> AddressRecord {
    let Value::Object(obj) = raw else {
        return AddressRecord::default();
    };
    AddressRecord {
        name: str_field(obj, "name"),
        address: str_field(obj, "address"),
        city: str_field(obj, "city"),
        state: str_field(obj, "state"),
        zip_code: str_field(obj, "zipCode"),
        phone: str_field(obj, "phone"),
    }
}

/// Shape one page's raw extraction result into a full `ShipmentRecord`.
///
/// Every scalar defaults to "" when absent/null/non-string; the two
/// address fields always pass through `normalize_address` whatever their
/// raw shape. A wholly missing payload is the caller's batch-level error,
/// not handled here.
pub fn normalize_shipment(raw: &Value) -> ShipmentRecord {
    let Value::Object(obj) = raw else {
        return ShipmentRecord::default();
    };
    ShipmentRecord {
        load_number: str_field(obj, "loadNumber"),
        shipper: normalize_address(obj.get("shipper").unwrap_or(&Value::Null)),
        consignee: normalize_address(obj.get("consignee").unwrap_or(&Value::Null)),
        weight: str_field(obj, "weight"),
        amount: str_field(obj, "amount"),
        truck_number: str_field(obj, "truckNumber"),
    }
}

// ---------------------------------------------------------------------------
// Cleaning helpers
// ---------------------------------------------------------------------------

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Collapse any run of whitespace (including newlines) to a single space
/// and trim the ends.
pub fn clean_whitespace(s: &str) -> String {
    whitespace_re().replace_all(s, " ").trim().to_string()
}

/// Strip everything that is not a digit or a decimal point, keeping only
/// the first decimal point. "1,500.25 lbs" -> "1500.25", "1.2.3" -> "1.23".
pub fn clean_numeric(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut seen_dot = false;
    for c in s.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '.' && !seen_dot {
            out.push(c);
            seen_dot = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_address() -> AddressRecord {
        AddressRecord::default()
    }

    #[test]
    fn address_from_non_object_shapes_is_all_empty() {
        for raw in [
            json!("ACME warehouse, 1 Dock Rd"),
            json!(["ACME"]),
            json!(null),
            json!(42),
            json!(true),
        ] {
            assert_eq!(normalize_address(&raw), empty_address());
        }
    }

    #[test]
    fn address_copies_known_fields_and_drops_extras() {
        let raw = json!({
            "name": "ACME",
            "address": "1 Dock Rd",
            "city": "Toledo",
            "state": "OH",
            "zipCode": "43604",
            "phone": "555-0100",
            "fax": "should be dropped"
        });
        let rec = normalize_address(&raw);
        assert_eq!(rec.name, "ACME");
        assert_eq!(rec.zip_code, "43604");
        assert_eq!(rec.phone, "555-0100");
    }

    #[test]
    fn address_defaults_missing_and_wrongly_typed_fields() {
        let raw = json!({ "name": "ACME", "city": null, "zipCode": 43604 });
        let rec = normalize_address(&raw);
        assert_eq!(rec.name, "ACME");
        assert_eq!(rec.city, "");
        assert_eq!(rec.zip_code, "");
        assert_eq!(rec.phone, "");
    }

    #[test]
    fn address_normalization_is_idempotent() {
        let raw = json!({ "name": "ACME", "address": "1 Dock Rd", "zipCode": "43604" });
        let once = normalize_address(&raw);
        let round_tripped = serde_json::to_value(&once).unwrap();
        assert_eq!(normalize_address(&round_tripped), once);
    }

    #[test]
    fn shipment_with_malformed_addresses() {
        // Model emitted a free-text shipper and a null consignee.
        let raw = json!({
            "shipper": "ACME warehouse",
            "consignee": null,
            "loadNumber": "123"
        });
        let rec = normalize_shipment(&raw);
        assert_eq!(rec.shipper, empty_address());
        assert_eq!(rec.consignee, empty_address());
        assert_eq!(rec.load_number, "123");
        assert_eq!(rec.weight, "");
    }

    #[test]
    fn shipment_from_non_object_is_all_empty() {
        let rec = normalize_shipment(&json!("not even close"));
        assert_eq!(rec, ShipmentRecord::default());
    }

    #[test]
    fn shipment_normalization_is_idempotent() {
        let raw = json!({
            "loadNumber": "123",
            "shipper": { "name": "ACME" },
            "weight": "42000"
        });
        let once = normalize_shipment(&raw);
        let round_tripped = serde_json::to_value(&once).unwrap();
        assert_eq!(normalize_shipment(&round_tripped), once);
    }

    #[test]
    fn whitespace_only_address_counts_as_empty() {
        let rec = normalize_address(&json!({ "name": "  \n\t " }));
        assert!(rec.is_empty());
    }

    #[test]
    fn tidy_collapses_newlines_and_runs() {
        let rec = AddressRecord {
            address: "1 Dock Rd\nSuite  5".to_string(),
            ..Default::default()
        };
        assert_eq!(rec.tidy().address, "1 Dock Rd Suite 5");
    }

    #[test]
    fn numeric_cleaning_keeps_first_decimal_point() {
        assert_eq!(clean_numeric("$1,500.25"), "1500.25");
        assert_eq!(clean_numeric("1.2.3"), "1.23");
        assert_eq!(clean_numeric("42000 lbs"), "42000");
        assert_eq!(clean_numeric(""), "");
    }
}
