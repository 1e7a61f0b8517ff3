// 🚦 Shipment Status - closed set of logistics states
//
// Any status may follow any status: there is no transition graph.
// Wire labels ("Picked Up", "Out for Delivery", ...) are what gets persisted.

use crate::error::DraftError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShipmentStatus {
    #[serde(rename = "Created")]
    Created,

    #[serde(rename = "Picked Up")]
    PickedUp,

    #[serde(rename = "In Transit")]
    InTransit,

    #[serde(rename = "Out for Delivery")]
    OutForDelivery,

    #[serde(rename = "Delivered")]
    Delivered,

    #[serde(rename = "Exception")]
    Exception,
}

impl ShipmentStatus {
    /// All statuses in logistics order (used for filter pickers)
    pub const ALL: [ShipmentStatus; 6] = [
        ShipmentStatus::Created,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Created => "Created",
            ShipmentStatus::PickedUp => "Picked Up",
            ShipmentStatus::InTransit => "In Transit",
            ShipmentStatus::OutForDelivery => "Out for Delivery",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Exception => "Exception",
        }
    }

    /// Display descriptor for badges and timeline markers
    pub fn display(&self) -> StatusDisplay {
        match self {
            ShipmentStatus::Created => StatusDisplay {
                label: self.as_str(),
                tone: Tone::Slate,
                marker: Tone::Slate,
                icon: Icon::Package,
            },
            ShipmentStatus::PickedUp => StatusDisplay {
                label: self.as_str(),
                tone: Tone::Amber,
                marker: Tone::Slate,
                icon: Icon::Package,
            },
            ShipmentStatus::InTransit => StatusDisplay {
                label: self.as_str(),
                tone: Tone::Indigo,
                marker: Tone::Blue,
                icon: Icon::Truck,
            },
            ShipmentStatus::OutForDelivery => StatusDisplay {
                label: self.as_str(),
                tone: Tone::Blue,
                marker: Tone::Slate,
                icon: Icon::Package,
            },
            ShipmentStatus::Delivered => StatusDisplay {
                label: self.as_str(),
                tone: Tone::Emerald,
                marker: Tone::Emerald,
                icon: Icon::CheckCircle,
            },
            ShipmentStatus::Exception => StatusDisplay {
                label: self.as_str(),
                tone: Tone::Red,
                marker: Tone::Red,
                icon: Icon::Alert,
            },
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = DraftError;

    /// Accepts the wire label ("Out for Delivery") or the variant name in
    /// any case, with spaces/underscores/hyphens ignored ("out_for_delivery")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        ShipmentStatus::ALL
            .into_iter()
            .find(|status| {
                let label: String = status
                    .as_str()
                    .chars()
                    .filter(|c| *c != ' ')
                    .flat_map(char::to_lowercase)
                    .collect();
                label == folded
            })
            .ok_or_else(|| DraftError::UnknownStatus(s.to_string()))
    }
}

// ============================================================================
// DISPLAY DESCRIPTOR
// ============================================================================

/// Colour family of a badge or timeline marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Slate,
    Amber,
    Indigo,
    Blue,
    Emerald,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Icon {
    Package,
    Truck,
    CheckCircle,
    Alert,
}

impl Icon {
    /// Single-cell glyph for terminal rendering
    pub fn glyph(&self) -> &'static str {
        match self {
            Icon::Package => "■",
            Icon::Truck => "»",
            Icon::CheckCircle => "✔",
            Icon::Alert => "✖",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub label: &'static str,
    /// Badge colour
    pub tone: Tone,
    /// Timeline dot colour
    pub marker: Tone,
    pub icon: Icon,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_labels() {
        let json = serde_json::to_string(&ShipmentStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");

        let parsed: ShipmentStatus = serde_json::from_str("\"Picked Up\"").unwrap();
        assert_eq!(parsed, ShipmentStatus::PickedUp);
    }

    #[test]
    fn test_status_from_str_is_lenient() {
        assert_eq!("In Transit".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::InTransit);
        assert_eq!("in_transit".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::InTransit);
        assert_eq!("IN-TRANSIT".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::InTransit);
        assert_eq!(
            "out for delivery".parse::<ShipmentStatus>().unwrap(),
            ShipmentStatus::OutForDelivery
        );
        assert_eq!(
            "Lost".parse::<ShipmentStatus>(),
            Err(DraftError::UnknownStatus("Lost".to_string()))
        );
    }

    #[test]
    fn test_display_mapping_is_total() {
        for status in ShipmentStatus::ALL {
            let display = status.display();
            assert_eq!(display.label, status.as_str());
        }

        assert_eq!(ShipmentStatus::Delivered.display().icon, Icon::CheckCircle);
        assert_eq!(ShipmentStatus::Exception.display().tone, Tone::Red);
        assert_eq!(ShipmentStatus::InTransit.display().marker, Tone::Blue);
        assert_eq!(ShipmentStatus::Created.display().icon, Icon::Package);
    }
}
