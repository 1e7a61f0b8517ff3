// 🔎 Query/Filter Layer - pure functions over the shipment list
//
// Text search, status filter and date range are independent predicates,
// ANDed together. The selection set is separate from filtering.

use crate::entities::{parse_date, start_of_day, Shipment, ShipmentStatus};
use crate::error::DraftError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// FILTERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    /// Sentinel: no status filtering
    #[default]
    All,
    Only(ShipmentStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ShipmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }

    /// All → Created → Picked Up → ... → Exception → All
    pub fn cycle(&self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Only(ShipmentStatus::ALL[0]),
            StatusFilter::Only(current) => {
                let index = ShipmentStatus::ALL
                    .iter()
                    .position(|s| s == current)
                    .unwrap_or(0);
                match ShipmentStatus::ALL.get(index + 1) {
                    Some(next) => StatusFilter::Only(*next),
                    None => StatusFilter::All,
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All Statuses",
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

/// Inclusive calendar-day range over `estimated_delivery` (UTC days)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// start day 00:00:00 ≤ instant ≤ end day 23:59:59.999999999
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if instant < start_of_day(start) {
                return false;
            }
        }

        if let Some(end) = self.end {
            if instant > end_of_day(end) {
                return false;
            }
        }

        true
    }
}

/// Last representable instant of a UTC calendar day
///
/// Saturates on the last day chrono can represent.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date)
        .checked_add_signed(Duration::days(1) - Duration::nanoseconds(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Parse `FROM..TO` where either side may be empty (`2025-01-01..`, `..2025-02-01`)
///
/// A single date without `..` means that one day.
pub fn parse_date_range(input: &str) -> Result<DateRange, DraftError> {
    let input = input.trim();
    let side = |s: &str| -> Result<Option<NaiveDate>, DraftError> {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            parse_date(s).map(Some)
        }
    };

    match input.split_once("..") {
        Some((from, to)) => Ok(DateRange::new(side(from)?, side(to)?)),
        None => {
            let day = side(input)?;
            Ok(DateRange::new(day, day))
        }
    }
}

/// All active filters of a dashboard/listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentFilter {
    /// Substring of tracking number OR recipient, case-insensitive
    pub text: String,
    pub status: StatusFilter,
    pub dates: DateRange,
}

impl ShipmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_dates(mut self, dates: DateRange) -> Self {
        self.dates = dates;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.text.is_empty() || self.status != StatusFilter::All || !self.dates.is_open()
    }

    pub fn matches(&self, shipment: &Shipment) -> bool {
        matches_text(shipment, &self.text)
            && self.status.matches(shipment.current_status)
            && self.dates.contains(shipment.estimated_delivery)
    }

    /// Filtered view, list order preserved
    pub fn apply<'a>(&self, shipments: &'a [Shipment]) -> Vec<&'a Shipment> {
        shipments.iter().filter(|s| self.matches(s)).collect()
    }
}

/// Case-insensitive substring over tracking number or recipient
pub fn matches_text(shipment: &Shipment, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let query = query.to_lowercase();
    shipment.tracking_number.to_lowercase().contains(&query)
        || shipment.recipient.to_lowercase().contains(&query)
}

// ============================================================================
// SELECTION
// ============================================================================

/// Set of selected shipment ids, independent of filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// "Select all" over the filtered rows only
    ///
    /// When every filtered row is already selected (and there is at least
    /// one), the selection is cleared instead.
    pub fn toggle_all(&mut self, filtered: &[&Shipment]) {
        if !filtered.is_empty() && self.is_all_selected(filtered) {
            self.ids.clear();
        } else {
            self.ids = filtered.iter().map(|s| s.id.clone()).collect();
        }
    }

    /// Header checkbox state: every filtered row selected, and nothing else
    pub fn is_all_selected(&self, filtered: &[&Shipment]) -> bool {
        !filtered.is_empty()
            && self.ids.len() == filtered.len()
            && filtered.iter().all(|s| self.ids.contains(&s.id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Drop ids that no longer exist (after a refresh or delete)
    pub fn retain_existing(&mut self, shipments: &[Shipment]) {
        let existing: HashSet<&str> = shipments.iter().map(|s| s.id.as_str()).collect();
        self.ids.retain(|id| existing.contains(id.as_str()));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

// ============================================================================
// TESTS
// ============================================================================
