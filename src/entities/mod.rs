// Entity Models - shipments, their events, statuses and drafts

pub mod draft;
pub mod shipment;
pub mod status;

pub use draft::{
    generate_tracking_number, parse_date, EventDraft, ManifestRecord, ShipmentDraft,
    DEFAULT_DELIVERY_DAYS,
};
pub use shipment::{start_of_day, Shipment, TrackingEvent};
pub use status::{Icon, ShipmentStatus, StatusDisplay, Tone};
