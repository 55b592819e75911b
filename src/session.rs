// src/session.rs

use crate::error::ScanError;
use crate::export;
use crate::fieldpath;
use crate::merge::{self, Stop};
use crate::projection::{FieldOrder, FieldPath};
use crate::record::{self, ShipmentRecord};
use serde_json::Value;
use tracing::{info, warn};

/// The one mutable session behind the API: the current reconciled record,
/// its secondary stops, and the user's field order.
///
/// The field order is created once per session and survives re-extraction;
/// only the record and stops are replaced when a new batch lands.
#[derive(Debug, Default)]
pub struct Session {
    batch: u64,
    order: FieldOrder,
    current: Option<Loaded>,
}

#[derive(Debug)]
struct Loaded {
    record: Value,
    stops: Vec<Stop>,
}

impl Session {
    /// Start a new upload batch, invalidating any batch still in flight.
    /// The returned id must accompany the batch's eventual results.
    pub fn begin_batch(&mut self) -> u64 {
        self.batch += 1;
        self.batch
    }

    /// Install the ordered raw extraction results for `batch_id`.
    ///
    /// A stale id (the user started a newer upload meanwhile) is discarded
    /// without touching current state; returns whether the batch applied.
    pub fn apply_batch(&mut self, batch_id: u64, raw_pages: &[Value]) -> bool {
        if batch_id != self.batch {
            warn!(
                stale = batch_id,
                current = self.batch,
                "Discarding results from a superseded batch"
            );
            return false;
        }

        let pages: Vec<ShipmentRecord> = raw_pages.iter().map(record::normalize_shipment).collect();
        let merged = merge::merge(&pages);

        let mut primary = merged.primary;
        primary.weight = record::clean_numeric(&primary.weight);
        primary.amount = record::clean_numeric(&primary.amount);

        info!(
            batch = batch_id,
            pages = pages.len(),
            stops = merged.stops.len(),
            load_number = %primary.load_number,
            "Batch reconciled"
        );

        self.current = Some(Loaded {
            record: serde_json::to_value(&primary).expect("record serializes"),
            stops: merged.stops,
        });
        true
    }

    pub fn record(&self) -> Option<&Value> {
        self.current.as_ref().map(|c| &c.record)
    }

    pub fn stops(&self) -> &[Stop] {
        self.current.as_ref().map(|c| c.stops.as_slice()).unwrap_or(&[])
    }

    /// Write a user edit at `path`. Copy-on-write: the record is wholly
    /// replaced by the updated value.
    pub fn edit(&mut self, path: FieldPath, value: &str) -> Result<(), ScanError> {
        let current = self.current.as_mut().ok_or(ScanError::NoRecord)?;
        current.record = fieldpath::set(&current.record, path.as_str(), value);
        Ok(())
    }

    pub fn order(&self) -> &[FieldPath] {
        self.order.order()
    }

    pub fn drag_start(&mut self, index: usize) {
        self.order.drag_start(index);
    }

    pub fn drag_over(&mut self, index: usize) {
        self.order.drag_over(index);
    }

    pub fn drop_dragged(&mut self) -> Option<(usize, usize)> {
        self.order.drop_dragged()
    }

    /// The ordered tab-separated export line for the current record.
    pub fn export(&self) -> Result<String, ScanError> {
        let current = self.current.as_ref().ok_or(ScanError::NoRecord)?;
        Ok(export::serialize(&current.record, self.order.order()))
    }
}
