// Postgres storage layer with sqlx
//
// This crate provides database implementations for the core store traits:
// - Database implements ScanReportStore, OutbreakStore, UserLocationStore
//   and NotificationStore over a shared PgPool
//
// Radius queries run a lat/lon bounding-box pre-filter in SQL and the true
// haversine distance filter application-side, preserving the GeoIndex
// contract.

pub mod models;
pub mod repositories;

pub use models::*;
pub use repositories::*;
