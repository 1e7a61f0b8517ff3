// 📚 Shipment Store - the durable shipment collection
//
// The whole collection lives as ONE JSON array under ONE storage key.
// Every write rewrites the full array: O(n) per mutation, fine for a single
// profile's worth of data. Callers needing concurrent writers must serialize
// access themselves (the API server wraps the store in a Mutex).

use crate::db::KeyValueStorage;
use crate::entities::{
    EventDraft, ManifestRecord, Shipment, ShipmentDraft, ShipmentStatus, TrackingEvent,
};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// Well-known key holding the serialized collection
pub const STORAGE_KEY: &str = "dispatch_logistics_data";

// ============================================================================
// SEED DATA
// ============================================================================

/// Fixture shipments written on first use, dated relative to `now`
pub fn seed_shipments(now: DateTime<Utc>) -> Vec<Shipment> {
    let day = Duration::days(1);
    let half_day = Duration::hours(12);

    vec![
        Shipment {
            id: "1".to_string(),
            tracking_number: "TRK-8859201".to_string(),
            sender: "Acme Corp".to_string(),
            recipient: "John Doe".to_string(),
            origin: "New York, NY".to_string(),
            destination: "Austin, TX".to_string(),
            current_status: ShipmentStatus::InTransit,
            estimated_delivery: now + day * 2,
            last_updated: now,
            events: vec![
                TrackingEvent::new(
                    "e1".to_string(),
                    now - day * 2,
                    "New York, NY",
                    ShipmentStatus::Created,
                    "Shipment label created.",
                ),
                TrackingEvent::new(
                    "e2".to_string(),
                    now - day,
                    "New York, NY",
                    ShipmentStatus::PickedUp,
                    "Package received by carrier.",
                ),
                TrackingEvent::new(
                    "e3".to_string(),
                    now,
                    "Philadelphia, PA",
                    ShipmentStatus::InTransit,
                    "Arrived at distribution center.",
                ),
            ],
        },
        Shipment {
            id: "2".to_string(),
            tracking_number: "TRK-1123581".to_string(),
            sender: "Tech Solutions Ltd".to_string(),
            recipient: "Sarah Smith".to_string(),
            origin: "San Francisco, CA".to_string(),
            destination: "Seattle, WA".to_string(),
            current_status: ShipmentStatus::Delivered,
            estimated_delivery: now - half_day,
            last_updated: now,
            events: vec![
                TrackingEvent::new(
                    "e4".to_string(),
                    now - day * 3,
                    "San Francisco, CA",
                    ShipmentStatus::PickedUp,
                    "Picked up by courier.",
                ),
                TrackingEvent::new(
                    "e5".to_string(),
                    now - half_day,
                    "Seattle, WA",
                    ShipmentStatus::Delivered,
                    "Delivered to front porch.",
                ),
            ],
        },
    ]
}

// ============================================================================
// STORE
// ============================================================================

pub struct ShipmentStore<S: KeyValueStorage> {
    storage: S,
}

impl<S: KeyValueStorage> ShipmentStore<S> {
    /// Wrap an opened storage backend
    pub fn open(storage: S) -> Self {
        ShipmentStore { storage }
    }

    /// Close the underlying backend
    pub fn close(self) -> StoreResult<()> {
        self.storage.close()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Opaque random identifier, no collision detection
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Read the whole collection, seeding fixtures when the key is absent
    ///
    /// A blob that fails to decode is reported as `StoreError::Corrupt`;
    /// recovery is an explicit `reset()`, never a silent reseed.
    pub fn list_all(&mut self) -> StoreResult<Vec<Shipment>> {
        match self.storage.get(STORAGE_KEY)? {
            Some(data) => serde_json::from_str(&data).map_err(|source| {
                tracing::error!(key = STORAGE_KEY, error = %source, "stored shipments are corrupt");
                StoreError::Corrupt {
                    key: STORAGE_KEY.to_string(),
                    source,
                }
            }),
            None => {
                let seed = seed_shipments(Utc::now());
                self.persist(&seed)?;
                tracing::info!(count = seed.len(), "seeded shipment store with fixtures");
                Ok(seed)
            }
        }
    }

    /// Overwrite storage with the fixture set
    pub fn reset(&mut self) -> StoreResult<Vec<Shipment>> {
        let seed = seed_shipments(Utc::now());
        self.persist(&seed)?;
        tracing::warn!(count = seed.len(), "shipment store reset to fixtures");
        Ok(seed)
    }

    /// Case-insensitive exact match, first hit in list order
    pub fn find_by_tracking_number(&mut self, input: &str) -> StoreResult<Option<Shipment>> {
        let wanted = input.trim();
        Ok(self
            .list_all()?
            .into_iter()
            .find(|s| s.has_tracking_number(wanted)))
    }

    pub fn find_by_id(&mut self, id: &str) -> StoreResult<Option<Shipment>> {
        Ok(self.list_all()?.into_iter().find(|s| s.id == id))
    }

    /// Replace in place when the id exists, otherwise insert at the front
    pub fn upsert(&mut self, shipment: Shipment) -> StoreResult<()> {
        shipment.check_invariants()?;

        let mut shipments = self.list_all()?;
        match shipments.iter().position(|s| s.id == shipment.id) {
            Some(index) => {
                tracing::debug!(id = %shipment.id, "replacing shipment");
                shipments[index] = shipment;
            }
            None => {
                tracing::debug!(id = %shipment.id, "inserting shipment");
                shipments.insert(0, shipment);
            }
        }

        self.persist(&shipments)
    }

    /// Remove by id; a missing id is a no-op
    pub fn remove(&mut self, id: &str) -> StoreResult<()> {
        let mut shipments = self.list_all()?;
        shipments.retain(|s| s.id != id);
        self.persist(&shipments)
    }

    /// Bulk remove (selection delete) in a single write
    ///
    /// Returns how many records were actually removed.
    pub fn remove_many<I, T>(&mut self, ids: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let ids: HashSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        let mut shipments = self.list_all()?;
        let before = shipments.len();
        shipments.retain(|s| !ids.contains(&s.id));
        let removed = before - shipments.len();

        self.persist(&shipments)?;
        tracing::info!(removed, requested = ids.len(), "bulk delete");
        Ok(removed)
    }

    /// Validate a draft, assign identifiers, and insert it
    pub fn create(&mut self, draft: ShipmentDraft) -> StoreResult<Shipment> {
        let shipment = draft.into_shipment(Self::new_id(), Self::new_id(), Utc::now())?;

        // Uniqueness is advisory: warn, still insert
        if self
            .find_by_tracking_number(&shipment.tracking_number)?
            .is_some()
        {
            tracing::warn!(
                tracking_number = %shipment.tracking_number,
                "tracking number already in use; lookups return the first match"
            );
        }

        self.upsert(shipment.clone())?;
        tracing::info!(id = %shipment.id, tracking_number = %shipment.tracking_number, "shipment created");
        Ok(shipment)
    }

    /// Append a status event to an existing shipment
    pub fn record_event(&mut self, id: &str, draft: EventDraft) -> StoreResult<Shipment> {
        let draft = draft.validate()?;
        let mut shipment = self
            .find_by_id(id)?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        shipment.record_event(draft, Self::new_id(), Utc::now());
        self.upsert(shipment.clone())?;
        tracing::info!(id = %shipment.id, status = %shipment.current_status, "status updated");
        Ok(shipment)
    }

    /// Create one shipment per manifest record, in a single write
    ///
    /// Each record goes to the front in turn, so the last record ends up first.
    pub fn import_manifest(&mut self, records: Vec<ManifestRecord>) -> StoreResult<Vec<Shipment>> {
        let now = Utc::now();
        let imported: Vec<Shipment> = records
            .into_iter()
            .map(|record| record.into_shipment(Self::new_id(), Self::new_id(), now))
            .collect();

        let mut shipments = self.list_all()?;
        for shipment in &imported {
            shipments.insert(0, shipment.clone());
        }

        self.persist(&shipments)?;
        tracing::info!(count = imported.len(), "imported shipments from manifest");
        Ok(imported)
    }

    fn persist(&mut self, shipments: &[Shipment]) -> StoreResult<()> {
        let data = serde_json::to_string(shipments).map_err(StoreError::Serialize)?;
        self.storage.set(STORAGE_KEY, &data)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;

    fn memory_store() -> ShipmentStore<MemoryStorage> {
        ShipmentStore::open(MemoryStorage::new())
    }

    fn draft(tracking: &str) -> ShipmentDraft {
        ShipmentDraft::new("Acme", "Jane Roe", "Boston, MA", "Denver, CO")
            .with_tracking_number(tracking)
    }

    #[test]
    fn test_first_list_seeds_two_fixtures() {
        let mut store = memory_store();

        let first = store.list_all().unwrap();
        let numbers: Vec<&str> = first.iter().map(|s| s.tracking_number.as_str()).collect();
        assert_eq!(numbers, vec!["TRK-8859201", "TRK-1123581"]);

        let raw = store.storage().get(STORAGE_KEY).unwrap();
        assert!(raw.is_some(), "seed must be persisted");

        // Second call reads back, does not reseed (timestamps unchanged)
        let second = store.list_all().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_seed_fixtures_satisfy_invariants() {
        for shipment in seed_shipments(Utc::now()) {
            shipment.check_invariants().unwrap();
        }
    }

    #[test]
    fn test_upsert_inserts_front_and_replaces_in_place() {
        let mut store = memory_store();
        let created = store.create(draft("TRK-1")).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, created.id);

        let mut edited = created.clone();
        edited.recipient = "Someone Else".to_string();
        store.upsert(edited.clone()).unwrap();
        store.upsert(edited.clone()).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().filter(|s| s.id == created.id).count(), 1);
        assert_eq!(all[0], edited);
    }

    #[test]
    fn test_upsert_rejects_status_mismatch() {
        let mut store = memory_store();
        let mut shipment = store.create(draft("TRK-2")).unwrap();
        shipment.current_status = ShipmentStatus::Delivered;

        let err = store.upsert(shipment).unwrap_err();
        assert!(matches!(err, StoreError::Invariant { .. }));
    }

    #[test]
    fn test_find_by_tracking_number_case_insensitive() {
        let mut store = memory_store();
        store.create(draft("trk-1")).unwrap();

        let found = store.find_by_tracking_number("TRK-1").unwrap();
        assert_eq!(found.unwrap().tracking_number, "trk-1");

        let padded = store.find_by_tracking_number("  trk-8859201 ").unwrap();
        assert!(padded.is_some());

        assert!(store.find_by_tracking_number("TRK-404").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_tracking_numbers_return_first_match() {
        let mut store = memory_store();
        let older = store.create(draft("TRK-DUP")).unwrap();
        let newer = store.create(draft("TRK-DUP")).unwrap();

        let found = store.find_by_tracking_number("trk-dup").unwrap().unwrap();
        // Newer was inserted at the front
        assert_eq!(found.id, newer.id);
        assert_ne!(found.id, older.id);
    }

    #[test]
    fn test_remove_and_remove_missing() {
        let mut store = memory_store();
        store.list_all().unwrap();

        store.remove("1").unwrap();
        let all = store.list_all().unwrap();
        assert!(all.iter().all(|s| s.id != "1"));
        assert_eq!(all.len(), 1);

        store.remove("does-not-exist").unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_many() {
        let mut store = memory_store();
        let a = store.create(draft("TRK-A")).unwrap();

        let removed = store.remove_many([a.id.as_str(), "1", "ghost"]).unwrap();
        assert_eq!(removed, 2);

        let ids: Vec<String> = store.list_all().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["2".to_string()]);
    }

    #[test]
    fn test_record_event_appends_and_persists() {
        let mut store = memory_store();
        let event = EventDraft::new(ShipmentStatus::OutForDelivery, "Austin, TX")
            .with_description("On the truck.");

        let updated = store.record_event("1", event).unwrap();
        assert_eq!(updated.current_status, ShipmentStatus::OutForDelivery);
        assert_eq!(updated.events.len(), 4);

        let stored = store.find_by_id("1").unwrap().unwrap();
        assert_eq!(stored, updated);
        // Position preserved
        assert_eq!(store.list_all().unwrap()[0].id, "1");
    }

    #[test]
    fn test_record_event_unknown_id() {
        let mut store = memory_store();
        let err = store
            .record_event("nope", EventDraft::new(ShipmentStatus::Delivered, "Here"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_create_rejects_incomplete_draft() {
        let mut store = memory_store();
        let err = store
            .create(ShipmentDraft::new("Acme", "", "Boston", "Denver"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Draft(_)));
        assert_eq!(store.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_import_manifest_puts_last_record_first() {
        let mut store = memory_store();
        let records = vec![
            ManifestRecord {
                tracking_number: Some("TRK-M1".to_string()),
                ..Default::default()
            },
            ManifestRecord {
                tracking_number: Some("TRK-M2".to_string()),
                ..Default::default()
            },
        ];

        let imported = store.import_manifest(records).unwrap();
        assert_eq!(imported.len(), 2);

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].tracking_number, "TRK-M2");
        assert_eq!(all[1].tracking_number, "TRK-M1");
    }

    #[test]
    fn test_corrupt_storage_is_surfaced_then_reset_recovers() {
        crate::logging::init_test();
        let storage = MemoryStorage::new().with_entry(STORAGE_KEY, "{not json");
        let mut store = ShipmentStore::open(storage);

        let err = store.list_all().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        // Writes must not clobber the corrupt blob either
        assert!(store.remove("1").is_err());
        assert_eq!(
            store.storage().get(STORAGE_KEY).unwrap().as_deref(),
            Some("{not json")
        );

        let seeded = store.reset().unwrap();
        assert_eq!(seeded.len(), 2);
        assert_eq!(store.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_new_id_is_unique_enough() {
        let a = ShipmentStore::<MemoryStorage>::new_id();
        let b = ShipmentStore::<MemoryStorage>::new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
