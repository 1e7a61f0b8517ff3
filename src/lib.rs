// Dispatch Tracker - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod ai;             // AI Gateway - status drafts, manifest parsing, support chat
pub mod config;         // File + env configuration
pub mod db;             // Key-value persistence (SQLite + in-memory)
pub mod entities;       // Shipment, TrackingEvent, ShipmentStatus, drafts
pub mod error;
pub mod logging;
pub mod query;          // Text / status / date filtering + bulk selection
pub mod store;          // Shipment store over a single persisted collection

#[cfg(feature = "server")]
pub mod api;            // HTTP surface (axum)

// Re-export commonly used types
pub use ai::{AiGateway, ChatRole, ChatTurn, GeminiClient, GenerateRequest, TextModel};
pub use config::AppConfig;
pub use db::{setup_database, KeyValueStorage, MemoryStorage, SqliteStorage};
pub use entities::{
    EventDraft, ManifestRecord, Shipment, ShipmentDraft, ShipmentStatus, StatusDisplay, Tone,
    TrackingEvent,
};
pub use error::{DraftError, GatewayError, StoreError, StoreResult};
pub use query::{parse_date_range, DateRange, Selection, ShipmentFilter, StatusFilter};
pub use store::{ShipmentStore, STORAGE_KEY};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
