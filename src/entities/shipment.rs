// 📦 Shipment Entity - identity + route + event log
//
// id is IDENTITY (never changes), everything else is a value that the
// writer overwrites when a new event is recorded.
// The event log is append-only: insertion order is history order.

use super::draft::EventDraft;
use super::status::ShipmentStatus;
use crate::error::StoreError;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// TRACKING EVENT
// ============================================================================

/// One immutable history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub status: ShipmentStatus,
    pub description: String,
}

impl TrackingEvent {
    pub fn new(
        id: String,
        timestamp: DateTime<Utc>,
        location: impl Into<String>,
        status: ShipmentStatus,
        description: impl Into<String>,
    ) -> Self {
        TrackingEvent {
            id,
            timestamp,
            location: location.into(),
            status,
            description: description.into(),
        }
    }
}

// ============================================================================
// SHIPMENT
// ============================================================================

/// Persisted shape matches the stored JSON blob (camelCase keys)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    /// Stable identity - NEVER changes
    pub id: String,

    /// Unique by convention only; compared case-insensitively
    pub tracking_number: String,

    pub sender: String,
    pub recipient: String,
    pub origin: String,
    pub destination: String,

    /// Must equal the status of the last event in `events`
    pub current_status: ShipmentStatus,

    pub estimated_delivery: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    /// Append-only, oldest first
    pub events: Vec<TrackingEvent>,
}

impl Shipment {
    /// Most recently added event (not necessarily the newest timestamp)
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.events.last()
    }

    /// Case-insensitive exact tracking number comparison
    pub fn has_tracking_number(&self, tracking_number: &str) -> bool {
        self.tracking_number.to_uppercase() == tracking_number.to_uppercase()
    }

    /// Append a status update and overwrite the derived fields
    ///
    /// This is the only writer path that changes `current_status`, so the
    /// status/event invariant holds by construction.
    pub fn record_event(
        &mut self,
        draft: EventDraft,
        event_id: String,
        now: DateTime<Utc>,
    ) -> &TrackingEvent {
        if let Some(date) = draft.estimated_delivery {
            self.estimated_delivery = start_of_day(date);
        }

        self.current_status = draft.status;
        self.last_updated = now;
        self.events.push(TrackingEvent::new(
            event_id,
            now,
            draft.location,
            draft.status,
            draft.description,
        ));

        // just pushed
        &self.events[self.events.len() - 1]
    }

    /// Events newest-first by timestamp, for timeline rendering
    ///
    /// Stable: events sharing a timestamp keep their log order reversed, so
    /// the later-recorded one is shown first.
    pub fn timeline(&self) -> Vec<&TrackingEvent> {
        let mut events: Vec<&TrackingEvent> = self.events.iter().rev().collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events
    }

    /// Check the two structural invariants
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        let last = self.latest_event().ok_or_else(|| StoreError::Invariant {
            id: self.id.clone(),
            reason: "shipment has no tracking events".to_string(),
        })?;

        if last.status != self.current_status {
            return Err(StoreError::Invariant {
                id: self.id.clone(),
                reason: format!(
                    "current status '{}' does not match latest event status '{}'",
                    self.current_status, last.status
                ),
            });
        }

        Ok(())
    }
}

/// Midnight UTC of a calendar day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_shipment(now: DateTime<Utc>) -> Shipment {
        Shipment {
            id: "s1".to_string(),
            tracking_number: "TRK-42".to_string(),
            sender: "Acme Corp".to_string(),
            recipient: "John Doe".to_string(),
            origin: "New York, NY".to_string(),
            destination: "Austin, TX".to_string(),
            current_status: ShipmentStatus::Created,
            estimated_delivery: now + Duration::days(5),
            last_updated: now,
            events: vec![TrackingEvent::new(
                "e1".to_string(),
                now,
                "New York, NY",
                ShipmentStatus::Created,
                "Shipment information received",
            )],
        }
    }

    #[test]
    fn test_record_event_keeps_status_in_sync() {
        let now = Utc::now();
        let mut shipment = test_shipment(now);

        let later = now + Duration::hours(3);
        let draft = EventDraft::new(ShipmentStatus::InTransit, "Philadelphia, PA")
            .with_description("Arrived at distribution center.");
        shipment.record_event(draft, "e2".to_string(), later);

        assert_eq!(shipment.events.len(), 2);
        assert_eq!(shipment.current_status, ShipmentStatus::InTransit);
        assert_eq!(shipment.last_updated, later);
        assert_eq!(shipment.latest_event().unwrap().id, "e2");
        assert!(shipment.check_invariants().is_ok());
    }

    #[test]
    fn test_record_event_replaces_eta_when_given() {
        let now = Utc::now();
        let mut shipment = test_shipment(now);
        let original_eta = shipment.estimated_delivery;

        shipment.record_event(
            EventDraft::new(ShipmentStatus::PickedUp, "New York, NY"),
            "e2".to_string(),
            now,
        );
        assert_eq!(shipment.estimated_delivery, original_eta);

        let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        shipment.record_event(
            EventDraft::new(ShipmentStatus::Exception, "Memphis, TN").with_estimated_delivery(date),
            "e3".to_string(),
            now,
        );
        assert_eq!(shipment.estimated_delivery, start_of_day(date));
    }

    #[test]
    fn test_timeline_is_newest_first() {
        let now = Utc::now();
        let mut shipment = test_shipment(now);
        // Backdated event appended last
        shipment.events.push(TrackingEvent::new(
            "old".to_string(),
            now - Duration::days(1),
            "Nowhere",
            ShipmentStatus::Created,
            "late import",
        ));
        shipment.events.push(TrackingEvent::new(
            "new".to_string(),
            now + Duration::days(1),
            "Austin, TX",
            ShipmentStatus::Created,
            "",
        ));

        let ids: Vec<&str> = shipment.timeline().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "e1", "old"]);
        // Stored order untouched
        assert_eq!(shipment.events[1].id, "old");
    }

    #[test]
    fn test_invariant_violations() {
        let now = Utc::now();

        let mut mismatched = test_shipment(now);
        mismatched.current_status = ShipmentStatus::Delivered;
        assert!(matches!(
            mismatched.check_invariants(),
            Err(StoreError::Invariant { .. })
        ));

        let mut empty = test_shipment(now);
        empty.events.clear();
        assert!(matches!(empty.check_invariants(), Err(StoreError::Invariant { .. })));
    }

    #[test]
    fn test_tracking_number_compare_ignores_case() {
        let shipment = test_shipment(Utc::now());
        assert!(shipment.has_tracking_number("trk-42"));
        assert!(!shipment.has_tracking_number("TRK-4"));
    }

    #[test]
    fn test_persisted_shape_is_camel_case() {
        let shipment = test_shipment(Utc::now());
        let json = serde_json::to_value(&shipment).unwrap();

        assert_eq!(json["trackingNumber"], "TRK-42");
        assert_eq!(json["currentStatus"], "Created");
        assert!(json.get("estimatedDelivery").is_some());
        assert!(json.get("lastUpdated").is_some());
        assert_eq!(json["events"][0]["status"], "Created");
    }
}
