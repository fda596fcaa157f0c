// Store traits for pluggable backends
//
// These traits allow the detection pipeline to run against different
// backends:
// - In-memory implementations for tests and single-node deployments
// - Postgres implementations for production
//
// All radius queries share the GeoIndex contract: a bounding box may be
// used as a pre-filter, but final inclusion is by true haversine distance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::geo::GeoPoint;
use crate::notification::{NewNotification, Notification};
use crate::outbreak::{NewOutbreak, Outbreak, Severity};
use crate::report::{NewScanReport, ScanReport};
use crate::user_location::UserLocation;

// ============================================================================
// ScanReportStore - append-only disease observation log
// ============================================================================

/// Trait for storing and querying scan reports
#[async_trait]
pub trait ScanReportStore: Send + Sync {
    /// Persist a report; the store assigns the id.
    async fn insert(&self, input: NewScanReport) -> Result<ScanReport>;

    /// Same-disease reports within `radius_km` of `center` observed at or
    /// after `since`, with their distance in kilometers, nearest first.
    async fn find_nearby(
        &self,
        disease_name: &str,
        center: GeoPoint,
        radius_km: f64,
        since: DateTime<Utc>,
    ) -> Result<Vec<(ScanReport, f64)>>;
}

// ============================================================================
// OutbreakStore - declared outbreak records
// ============================================================================

/// Trait for outbreak persistence
///
/// There is no delete: containment and resolution are administrative
/// actions handled outside this core.
#[async_trait]
pub trait OutbreakStore: Send + Sync {
    /// Insert a new outbreak with status active.
    async fn insert(&self, input: NewOutbreak) -> Result<Outbreak>;

    /// Update report_count, severity and last_updated on an existing
    /// outbreak. Idempotent for a repeated identical count. Returns None
    /// when the id is unknown.
    async fn update_count(
        &self,
        id: Uuid,
        report_count: i32,
        severity: Severity,
    ) -> Result<Option<Outbreak>>;

    /// Active outbreaks of the given disease within `radius_km` of
    /// `center`, nearest first.
    async fn find_active_nearby(
        &self,
        disease_name: &str,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(Outbreak, f64)>>;

    /// All active outbreaks, most recently reported first.
    async fn list_active(&self) -> Result<Vec<Outbreak>>;
}

// ============================================================================
// UserLocationStore - last known user positions
// ============================================================================

/// Trait for user location upserts and radius queries
#[async_trait]
pub trait UserLocationStore: Send + Sync {
    /// Record the user's current position, replacing any previous fix.
    async fn upsert(&self, user_id: &str, location: GeoPoint) -> Result<UserLocation>;

    /// All users within `radius_km` of `center`, nearest first.
    async fn find_within(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(UserLocation, f64)>>;
}

// ============================================================================
// NotificationStore - alert records for external delivery
// ============================================================================

/// Trait for notification persistence
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert all notifications in one operation; an empty batch is a no-op.
    async fn insert_batch(&self, inputs: Vec<NewNotification>) -> Result<Vec<Notification>>;

    /// Notifications for one user, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>>;
}
