// src/projection.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every editable leaf of a `ShipmentRecord`, addressed by its dotted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldPath {
    LoadNumber,
    ShipperName,
    ShipperAddress,
    ShipperCity,
    ShipperState,
    ShipperZipCode,
    ShipperPhone,
    ConsigneeName,
    ConsigneeAddress,
    ConsigneeCity,
    ConsigneeState,
    ConsigneeZipCode,
    ConsigneePhone,
    Weight,
    Amount,
    TruckNumber,
}

/// Default export order: load number, shipper block, consignee block,
/// then the remaining scalars.
pub const DEFAULT_ORDER: [FieldPath; 16] = [
    FieldPath::LoadNumber,
    FieldPath::ShipperName,
    FieldPath::ShipperAddress,
    FieldPath::ShipperCity,
    FieldPath::ShipperState,
    FieldPath::ShipperZipCode,
    FieldPath::ShipperPhone,
    FieldPath::ConsigneeName,
    FieldPath::ConsigneeAddress,
    FieldPath::ConsigneeCity,
    FieldPath::ConsigneeState,
    FieldPath::ConsigneeZipCode,
    FieldPath::ConsigneePhone,
    FieldPath::Weight,
    FieldPath::Amount,
    FieldPath::TruckNumber,
];

impl FieldPath {
    /// The dotted path this field occupies in the record JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldPath::LoadNumber => "loadNumber",
            FieldPath::ShipperName => "shipper.name",
            FieldPath::ShipperAddress => "shipper.address",
            FieldPath::ShipperCity => "shipper.city",
            FieldPath::ShipperState => "shipper.state",
            FieldPath::ShipperZipCode => "shipper.zipCode",
            FieldPath::ShipperPhone => "shipper.phone",
            FieldPath::ConsigneeName => "consignee.name",
            FieldPath::ConsigneeAddress => "consignee.address",
            FieldPath::ConsigneeCity => "consignee.city",
            FieldPath::ConsigneeState => "consignee.state",
            FieldPath::ConsigneeZipCode => "consignee.zipCode",
            FieldPath::ConsigneePhone => "consignee.phone",
            FieldPath::Weight => "weight",
            FieldPath::Amount => "amount",
            FieldPath::TruckNumber => "truckNumber",
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DEFAULT_ORDER
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown field path: {s}"))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldPath> for String {
    fn from(p: FieldPath) -> String {
        p.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Drag-and-drop reorder model
// ---------------------------------------------------------------------------

/// Where a drag gesture currently stands. A reorder is committed only by a
/// drop out of `Hovering`, so a stray drop can never corrupt the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        source: usize,
    },
    Hovering {
        source: usize,
        target: usize,
    },
}

/// The user-controlled ordering of field paths. Created once per session;
/// a fresh extraction replaces the record but never this order.
#[derive(Debug, Clone)]
pub struct FieldOrder {
    order: Vec<FieldPath>,
    drag: DragState,
}

impl Default for FieldOrder {
    fn default() -> Self {
        FieldOrder {
            order: DEFAULT_ORDER.to_vec(),
            drag: DragState::Idle,
        }
    }
}

impl FieldOrder {
    pub fn order(&self) -> &[FieldPath] {
        &self.order
    }

    /// Move the element at `from` so it sits at `to`. Out-of-range indices
    /// and `from == to` are no-ops; the sequence is never corrupted.
    pub fn reorder(&mut self, from: usize, to: usize) {
        let len = self.order.len();
        if from >= len || to >= len || from == to {
            return;
        }
        let field = self.order.remove(from);
        self.order.insert(to, field);
    }

    /// A drag gesture began on the row at `source`.
    pub fn drag_start(&mut self, source: usize) {
        self.drag = if source < self.order.len() {
            DragState::Dragging { source }
        } else {
            DragState::Idle
        };
    }

    /// The dragged row is hovering over `target`. Ignored unless a drag is
    /// in progress.
    pub fn drag_over(&mut self, target: usize) {
        if target >= self.order.len() {
            return;
        }
        self.drag = match self.drag {
            DragState::Dragging { source } | DragState::Hovering { source, .. } => {
                DragState::Hovering { source, target }
            }
            DragState::Idle => DragState::Idle,
        };
    }

    /// Commit the gesture. Only a well-formed start → over → drop sequence
    /// reorders; anything else resets to idle and reports nothing.
    pub fn drop_dragged(&mut self) -> Option<(usize, usize)> {
        let committed = match self.drag {
            DragState::Hovering { source, target } if source != target => Some((source, target)),
            _ => None,
        };
        self.drag = DragState::Idle;
        if let Some((from, to)) = committed {
            self.reorder(from, to);
        }
        committed
    }
}
