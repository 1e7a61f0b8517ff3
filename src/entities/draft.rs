// 📝 Drafts - partially filled forms, validated into entities at submission
//
// ShipmentDraft  → Shipment          (admin "new shipment")
// EventDraft     → TrackingEvent     (admin "update status")
// ManifestRecord → Shipment          (AI manifest import, lenient defaults)

use super::shipment::{start_of_day, Shipment, TrackingEvent};
use super::status::ShipmentStatus;
use crate::error::DraftError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// ETA used when a draft does not give one
pub const DEFAULT_DELIVERY_DAYS: i64 = 5;

/// Fallback for party/route fields the manifest parser could not extract
const UNKNOWN: &str = "Unknown";

/// Generate a placeholder tracking number (`TRK-<0..1_000_000>`)
pub fn generate_tracking_number() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("TRK-{}", n)
}

/// Parse a form date (`YYYY-MM-DD`)
pub fn parse_date(input: &str) -> Result<NaiveDate, DraftError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| DraftError::InvalidDate(input.to_string()))
}

fn required(value: &str, field: &'static str) -> Result<String, DraftError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DraftError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// SHIPMENT DRAFT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDraft {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,

    /// Blank or absent → generated
    #[serde(default)]
    pub tracking_number: Option<String>,

    /// Absent → now + 5 days
    #[serde(default)]
    pub estimated_delivery: Option<NaiveDate>,
}

impl ShipmentDraft {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        ShipmentDraft {
            sender: sender.into(),
            recipient: recipient.into(),
            origin: origin.into(),
            destination: destination.into(),
            tracking_number: None,
            estimated_delivery: None,
        }
    }

    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }

    pub fn with_estimated_delivery(mut self, date: NaiveDate) -> Self {
        self.estimated_delivery = Some(date);
        self
    }

    /// Validating constructor: all four party/route fields are required
    pub fn into_shipment(
        self,
        id: String,
        event_id: String,
        now: DateTime<Utc>,
    ) -> Result<Shipment, DraftError> {
        let sender = required(&self.sender, "sender")?;
        let recipient = required(&self.recipient, "recipient")?;
        let origin = required(&self.origin, "origin")?;
        let destination = required(&self.destination, "destination")?;

        let tracking_number = non_blank(self.tracking_number.as_deref())
            .unwrap_or_else(generate_tracking_number);

        let estimated_delivery = match self.estimated_delivery {
            Some(date) => start_of_day(date),
            None => now + Duration::days(DEFAULT_DELIVERY_DAYS),
        };

        let created = TrackingEvent::new(
            event_id,
            now,
            origin.clone(),
            ShipmentStatus::Created,
            "Shipment information received",
        );

        Ok(Shipment {
            id,
            tracking_number,
            sender,
            recipient,
            origin,
            destination,
            current_status: ShipmentStatus::Created,
            estimated_delivery,
            last_updated: now,
            events: vec![created],
        })
    }
}

// ============================================================================
// EVENT DRAFT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub status: ShipmentStatus,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Replaces the shipment ETA when the schedule changed
    #[serde(default)]
    pub estimated_delivery: Option<NaiveDate>,
}

impl EventDraft {
    pub fn new(status: ShipmentStatus, location: impl Into<String>) -> Self {
        EventDraft {
            status,
            location: location.into(),
            description: String::new(),
            estimated_delivery: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_estimated_delivery(mut self, date: NaiveDate) -> Self {
        self.estimated_delivery = Some(date);
        self
    }

    /// Location is the only required free-text field
    pub fn validate(self) -> Result<Self, DraftError> {
        let location = required(&self.location, "location")?;
        Ok(EventDraft { location, ..self })
    }
}

// ============================================================================
// MANIFEST RECORD
// ============================================================================

/// One shipment as extracted from free text by the AI gateway
///
/// Every field is optional: the model fills in what it can find.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Inferred by the model; imports always start as Created
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub estimated_delivery_days: Option<f64>,
}

impl ManifestRecord {
    /// Lenient conversion: missing fields become "Unknown", never an error
    pub fn into_shipment(self, id: String, event_id: String, now: DateTime<Utc>) -> Shipment {
        let origin = non_blank(self.origin.as_deref());
        let event_location = origin.clone().unwrap_or_else(|| "Origin".to_string());

        let eta = self
            .estimated_delivery_days
            .filter(|days| days.is_finite() && *days > 0.0)
            .and_then(|days| Duration::try_milliseconds((days * 86_400_000.0).round() as i64))
            .and_then(|offset| now.checked_add_signed(offset))
            .unwrap_or_else(|| now + Duration::days(DEFAULT_DELIVERY_DAYS));

        Shipment {
            id,
            tracking_number: non_blank(self.tracking_number.as_deref())
                .unwrap_or_else(generate_tracking_number),
            sender: non_blank(self.sender.as_deref()).unwrap_or_else(|| UNKNOWN.to_string()),
            recipient: non_blank(self.recipient.as_deref()).unwrap_or_else(|| UNKNOWN.to_string()),
            origin: origin.unwrap_or_else(|| UNKNOWN.to_string()),
            destination: non_blank(self.destination.as_deref())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            current_status: ShipmentStatus::Created,
            estimated_delivery: eta,
            last_updated: now,
            events: vec![TrackingEvent::new(
                event_id,
                now,
                event_location,
                ShipmentStatus::Created,
                "Imported from manifest",
            )],
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_draft_requires_route_fields() {
        let now = Utc::now();
        let draft = ShipmentDraft::new("Acme", "  ", "NYC", "Austin");

        let err = draft
            .into_shipment("id".to_string(), "ev".to_string(), now)
            .unwrap_err();
        assert_eq!(err, DraftError::MissingField("recipient"));
    }

    #[test]
    fn test_shipment_draft_defaults() {
        let now = Utc::now();
        let shipment = ShipmentDraft::new("Acme", "Jane", "New York, NY", "Austin, TX")
            .with_tracking_number("   ")
            .into_shipment("id".to_string(), "ev".to_string(), now)
            .unwrap();

        assert!(shipment.tracking_number.starts_with("TRK-"));
        assert_eq!(shipment.estimated_delivery, now + Duration::days(5));
        assert_eq!(shipment.current_status, ShipmentStatus::Created);
        assert_eq!(shipment.events.len(), 1);
        assert_eq!(shipment.events[0].location, "New York, NY");
        assert_eq!(shipment.events[0].description, "Shipment information received");
        assert!(shipment.check_invariants().is_ok());
    }

    #[test]
    fn test_shipment_draft_explicit_values() {
        let now = Utc::now();
        let date = NaiveDate::from_ymd_opt(2031, 3, 9).unwrap();
        let shipment = ShipmentDraft::new(" Acme ", "Jane", "NYC", "LA")
            .with_tracking_number("TRK-777")
            .with_estimated_delivery(date)
            .into_shipment("id".to_string(), "ev".to_string(), now)
            .unwrap();

        assert_eq!(shipment.sender, "Acme");
        assert_eq!(shipment.tracking_number, "TRK-777");
        assert_eq!(shipment.estimated_delivery, start_of_day(date));
    }

    #[test]
    fn test_event_draft_requires_location() {
        let draft = EventDraft::new(ShipmentStatus::InTransit, "");
        assert_eq!(draft.validate(), Err(DraftError::MissingField("location")));

        let ok = EventDraft::new(ShipmentStatus::InTransit, " Dallas, TX ").validate().unwrap();
        assert_eq!(ok.location, "Dallas, TX");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert!(matches!(parse_date("28/02/2025"), Err(DraftError::InvalidDate(_))));
    }

    #[test]
    fn test_manifest_record_lenient_defaults() {
        let now = Utc::now();
        let record = ManifestRecord {
            recipient: Some("Sarah Smith".to_string()),
            estimated_delivery_days: Some(2.0),
            ..Default::default()
        };

        let shipment = record.into_shipment("id".to_string(), "ev".to_string(), now);
        assert_eq!(shipment.sender, "Unknown");
        assert_eq!(shipment.recipient, "Sarah Smith");
        assert_eq!(shipment.origin, "Unknown");
        assert_eq!(shipment.events[0].location, "Origin");
        assert_eq!(shipment.events[0].description, "Imported from manifest");
        assert_eq!(shipment.estimated_delivery, now + Duration::days(2));
        assert!(shipment.tracking_number.starts_with("TRK-"));
    }

    #[test]
    fn test_manifest_record_zero_days_falls_back() {
        let now = Utc::now();
        let record = ManifestRecord {
            estimated_delivery_days: Some(0.0),
            status: Some("Delivered".to_string()),
            ..Default::default()
        };

        let shipment = record.into_shipment("id".to_string(), "ev".to_string(), now);
        assert_eq!(shipment.estimated_delivery, now + Duration::days(5));
        assert_eq!(shipment.current_status, ShipmentStatus::Created);
    }

    #[test]
    fn test_manifest_record_unusable_days_fall_back() {
        let now = Utc::now();
        for days in [-3.0, f64::NAN, 1e9, 1e300, f64::MAX] {
            let record = ManifestRecord {
                estimated_delivery_days: Some(days),
                ..Default::default()
            };
            let shipment = record.into_shipment("id".to_string(), "ev".to_string(), now);
            assert_eq!(shipment.estimated_delivery, now + Duration::days(5), "days = {}", days);
        }
    }

    #[test]
    fn test_manifest_record_decodes_model_json() {
        let json = r#"[{"sender":"Acme","recipient":"Bo","trackingNumber":"TRK-9","estimatedDeliveryDays":3}]"#;
        let records: Vec<ManifestRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tracking_number.as_deref(), Some("TRK-9"));
        assert_eq!(records[0].estimated_delivery_days, Some(3.0));
        assert_eq!(records[0].origin, None);
    }
}
