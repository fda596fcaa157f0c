// Outbreak Detection Core
//
// This crate provides the store-agnostic building blocks for the outbreak
// detection pipeline (scan report -> cluster evaluation -> outbreak -> alert).
//
// Key design decisions:
// - Uses traits (ScanReportStore, OutbreakStore, UserLocationStore,
//   NotificationStore) for pluggable backends
// - Radius queries go through an explicit GeoIndex abstraction: grid-bucket
//   pre-filter, true haversine distance for final inclusion
// - Domain entities (ScanReport, Outbreak, UserLocation, Notification) are
//   defined here for shared use by storage and monitor crates
// - Error handling never lets a background evaluation failure surface to the
//   report-submission caller; the error type reflects that split

pub mod error;
pub mod geo;
pub mod notification;
pub mod outbreak;
pub mod report;
pub mod traits;
pub mod user_location;

// In-memory implementations for tests and single-node deployments
pub mod memory;

// Re-exports for convenience
pub use error::{Result, SurveillanceError};
pub use geo::{BoundingBox, GeoIndex, GeoPoint, EARTH_RADIUS_KM};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use outbreak::{NewOutbreak, Outbreak, OutbreakStatus, Severity};
pub use report::{NewScanReport, ScanReport};
pub use traits::{NotificationStore, OutbreakStore, ScanReportStore, UserLocationStore};
pub use user_location::UserLocation;
