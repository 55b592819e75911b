// src/merge.rs

use crate::record::{AddressRecord, ShipmentRecord};
use serde::{Deserialize, Serialize};

/// Whether a secondary stop is a pickup or a drop-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Pickup,
    Dropoff,
}

/// A pickup or drop-off location beyond the primary shipper/consignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub kind: StopKind,
    #[serde(flatten)]
    pub address: AddressRecord,
}

/// The reconciled view of a multi-page document batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedShipment {
    pub primary: ShipmentRecord,
    pub stops: Vec<Stop>,
}

/// Reconcile an ordered list of per-page records into one primary record
/// plus the remaining stops.
///
/// A multi-page rate confirmation lists intermediate stops between an
/// initial origin and a final destination, so the primary shipper is the
/// first pickup in page order and the primary consignee is the *last*
/// drop-off. Non-address scalars come from the first page only; later
/// pages never fill blanks.
pub fn merge(pages: &[ShipmentRecord]) -> MergedShipment {
    // Flat candidate list: shipper-then-consignee within a page, pages in
    // capture order. Addresses that are empty after trimming are skipped.
    let mut entries: Vec<Stop> = Vec::new();
    for page in pages {
        if !page.shipper.is_empty() {
            entries.push(Stop {
                kind: StopKind::Pickup,
                address: page.shipper.clone(),
            });
        }
        if !page.consignee.is_empty() {
            entries.push(Stop {
                kind: StopKind::Dropoff,
                address: page.consignee.clone(),
            });
        }
    }

    let shipper_idx = entries.iter().position(|e| e.kind == StopKind::Pickup);
    let consignee_idx = entries.iter().rposition(|e| e.kind == StopKind::Dropoff);

    let shipper = shipper_idx
        .map(|i| entries[i].address.clone())
        .unwrap_or_default();
    let consignee = consignee_idx
        .map(|i| entries[i].address.clone())
        .unwrap_or_default();

    let stops: Vec<Stop> = entries
        .into_iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != shipper_idx && Some(*i) != consignee_idx)
        .map(|(_, stop)| Stop {
            kind: stop.kind,
            address: stop.address.tidy(),
        })
        .collect();

    let first = pages.first().cloned().unwrap_or_default();
    let primary = ShipmentRecord {
        load_number: first.load_number,
        shipper: shipper.tidy(),
        consignee: consignee.tidy(),
        weight: first.weight,
        amount: first.amount,
        truck_number: first.truck_number,
    };

    MergedShipment { primary, stops }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(name: &str) -> AddressRecord {
        AddressRecord {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn page(shipper: &str, consignee: &str) -> ShipmentRecord {
        ShipmentRecord {
            shipper: if shipper.is_empty() {
                AddressRecord::default()
            } else {
                addr(shipper)
            },
            consignee: if consignee.is_empty() {
                AddressRecord::default()
            } else {
                addr(consignee)
            },
            ..Default::default()
        }
    }

    fn stop_names(stops: &[Stop]) -> Vec<&str> {
        stops.iter().map(|s| s.address.name.as_str()).collect()
    }

    #[test]
    fn three_pages_first_pickup_and_last_dropoff_win() {
        let pages = [page("A", "X"), page("B", "Y"), page("C", "Z")];
        let merged = merge(&pages);
        assert_eq!(merged.primary.shipper.name, "A");
        assert_eq!(merged.primary.consignee.name, "Z");
        // Flat list is [A, X, B, Y, C, Z]; removing the primaries leaves
        // the rest in flat-list order.
        assert_eq!(stop_names(&merged.stops), vec!["X", "B", "Y", "C"]);
        assert_eq!(merged.stops[0].kind, StopKind::Dropoff);
        assert_eq!(merged.stops[1].kind, StopKind::Pickup);
    }

    #[test]
    fn empty_middle_page_contributes_nothing() {
        let pages = [page("A", "X"), page("", ""), page("C", "Z")];
        let merged = merge(&pages);
        assert_eq!(merged.primary.shipper.name, "A");
        assert_eq!(merged.primary.consignee.name, "Z");
        assert_eq!(stop_names(&merged.stops), vec!["X", "C"]);
    }

    #[test]
    fn whitespace_only_address_is_treated_as_empty() {
        let mut p = page("A", "X");
        p.shipper = AddressRecord {
            name: "  \n ".to_string(),
            ..Default::default()
        };
        let merged = merge(&[p, page("B", "Y")]);
        assert_eq!(merged.primary.shipper.name, "B");
    }

    #[test]
    fn single_page_has_no_stops() {
        let merged = merge(&[page("A", "X")]);
        assert_eq!(merged.primary.shipper.name, "A");
        assert_eq!(merged.primary.consignee.name, "X");
        assert!(merged.stops.is_empty());
    }

    #[test]
    fn zero_pages_yield_an_all_empty_record() {
        let merged = merge(&[]);
        assert_eq!(merged.primary, ShipmentRecord::default());
        assert!(merged.stops.is_empty());
    }

    #[test]
    fn lone_pickup_is_excluded_from_stops_exactly_once() {
        // A single pickup entry: it becomes the primary shipper, the
        // consignee stays empty, and the stop list must not re-list it.
        let merged = merge(&[page("A", "")]);
        assert_eq!(merged.primary.shipper.name, "A");
        assert!(merged.primary.consignee.is_empty());
        assert!(merged.stops.is_empty());
    }

    #[test]
    fn scalars_come_from_the_first_page_only() {
        let mut first = page("A", "X");
        first.load_number = "123".to_string();
        first.weight = "42000".to_string();
        let mut second = page("B", "Y");
        second.load_number = "999".to_string();
        second.amount = "1500".to_string();

        let merged = merge(&[first, second]);
        assert_eq!(merged.primary.load_number, "123");
        assert_eq!(merged.primary.weight, "42000");
        // Second page's amount does not backfill the first page's blank.
        assert_eq!(merged.primary.amount, "");
    }

    #[test]
    fn first_page_scalars_survive_even_when_its_addresses_are_empty() {
        let mut first = page("", "");
        first.load_number = "123".to_string();
        let merged = merge(&[first, page("B", "Y")]);
        assert_eq!(merged.primary.load_number, "123");
        assert_eq!(merged.primary.shipper.name, "B");
    }

    #[test]
    fn addresses_are_whitespace_cleaned_on_the_way_out() {
        let mut p = page("", "");
        p.shipper = AddressRecord {
            name: "ACME\nCorp".to_string(),
            address: "1  Dock Rd".to_string(),
            ..Default::default()
        };
        p.consignee = addr("X");
        let merged = merge(&[p, page("B", "Z")]);
        assert_eq!(merged.primary.shipper.name, "ACME Corp");
        assert_eq!(merged.primary.shipper.address, "1 Dock Rd");
        // X and B are stops; both tidied.
        assert_eq!(stop_names(&merged.stops), vec!["X", "B"]);
    }
}
