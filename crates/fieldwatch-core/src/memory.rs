// In-memory store implementations
//
// These implementations keep all data in memory, making them perfect for:
// - Unit and integration tests
// - Single-node deployments that do not need Postgres
// - Quick prototyping

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::geo::{GeoIndex, GeoPoint};
use crate::notification::{NewNotification, Notification};
use crate::outbreak::{NewOutbreak, Outbreak, OutbreakStatus, Severity};
use crate::report::{NewScanReport, ScanReport};
use crate::traits::{NotificationStore, OutbreakStore, ScanReportStore, UserLocationStore};
use crate::user_location::UserLocation;

// ============================================================================
// InMemoryScanReportStore - append-only report log over a GeoIndex
// ============================================================================

/// In-memory scan report store
///
/// Reports are immutable once inserted, so concurrent readers never need
/// coordination beyond the RwLock.
#[derive(Debug, Default, Clone)]
pub struct InMemoryScanReportStore {
    reports: Arc<RwLock<GeoIndex<Uuid, ScanReport>>>,
}

impl InMemoryScanReportStore {
    /// Create a new in-memory scan report store
    pub fn new() -> Self {
        Self {
            reports: Arc::new(RwLock::new(GeoIndex::new())),
        }
    }

    /// Number of stored reports
    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    /// Clear all reports
    pub async fn clear(&self) {
        *self.reports.write().await = GeoIndex::new();
    }
}

#[async_trait]
impl ScanReportStore for InMemoryScanReportStore {
    async fn insert(&self, input: NewScanReport) -> Result<ScanReport> {
        let report = ScanReport {
            id: Uuid::now_v7(),
            location: input.location(),
            disease_name: input.disease_name,
            plant_type: input.plant_type,
            observed_at: input.observed_at,
        };
        self.reports
            .write()
            .await
            .upsert(report.id, report.location, report.clone());
        Ok(report)
    }

    async fn find_nearby(
        &self,
        disease_name: &str,
        center: GeoPoint,
        radius_km: f64,
        since: DateTime<Utc>,
    ) -> Result<Vec<(ScanReport, f64)>> {
        let reports = self.reports.read().await;
        Ok(reports
            .query(center, radius_km, |r: &ScanReport| {
                r.disease_name == disease_name && r.observed_at >= since
            })
            .into_iter()
            .map(|(_, report, distance)| (report.clone(), distance))
            .collect())
    }
}

// ============================================================================
// InMemoryOutbreakStore - outbreak records over a GeoIndex
// ============================================================================

/// In-memory outbreak store
#[derive(Debug, Default, Clone)]
pub struct InMemoryOutbreakStore {
    outbreaks: Arc<RwLock<GeoIndex<Uuid, Outbreak>>>,
}

impl InMemoryOutbreakStore {
    /// Create a new in-memory outbreak store
    pub fn new() -> Self {
        Self {
            outbreaks: Arc::new(RwLock::new(GeoIndex::new())),
        }
    }

    /// All outbreaks regardless of status (useful for tests)
    pub async fn list_all(&self) -> Vec<Outbreak> {
        self.outbreaks
            .read()
            .await
            .iter()
            .map(|(_, _, outbreak)| outbreak.clone())
            .collect()
    }

    /// Clear all outbreaks
    pub async fn clear(&self) {
        *self.outbreaks.write().await = GeoIndex::new();
    }
}

#[async_trait]
impl OutbreakStore for InMemoryOutbreakStore {
    async fn insert(&self, input: NewOutbreak) -> Result<Outbreak> {
        let now = Utc::now();
        let outbreak = Outbreak {
            id: Uuid::now_v7(),
            disease_name: input.disease_name,
            plant_type: input.plant_type,
            center: input.center,
            severity: input.severity,
            report_count: input.report_count,
            status: OutbreakStatus::Active,
            reported_at: now,
            last_updated: now,
        };
        self.outbreaks
            .write()
            .await
            .upsert(outbreak.id, outbreak.center, outbreak.clone());
        Ok(outbreak)
    }

    async fn update_count(
        &self,
        id: Uuid,
        report_count: i32,
        severity: Severity,
    ) -> Result<Option<Outbreak>> {
        let mut outbreaks = self.outbreaks.write().await;
        let Some(existing) = outbreaks.get(&id) else {
            return Ok(None);
        };
        let mut updated = existing.clone();
        updated.report_count = report_count;
        updated.severity = severity;
        updated.last_updated = Utc::now();
        outbreaks.upsert(id, updated.center, updated.clone());
        Ok(Some(updated))
    }

    async fn find_active_nearby(
        &self,
        disease_name: &str,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(Outbreak, f64)>> {
        let outbreaks = self.outbreaks.read().await;
        Ok(outbreaks
            .query(center, radius_km, |o: &Outbreak| {
                o.status == OutbreakStatus::Active && o.disease_name == disease_name
            })
            .into_iter()
            .map(|(_, outbreak, distance)| (outbreak.clone(), distance))
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Outbreak>> {
        let outbreaks = self.outbreaks.read().await;
        let mut active: Vec<Outbreak> = outbreaks
            .iter()
            .filter(|(_, _, o)| o.status == OutbreakStatus::Active)
            .map(|(_, _, o)| o.clone())
            .collect();
        active.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        Ok(active)
    }
}

// ============================================================================
// InMemoryUserLocationStore - last known fixes over a GeoIndex
// ============================================================================

/// In-memory user location store
///
/// Upserts re-bucket the user in the index, so stale positions never match
/// a radius query.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserLocationStore {
    locations: Arc<RwLock<GeoIndex<String, UserLocation>>>,
}

impl InMemoryUserLocationStore {
    /// Create a new in-memory user location store
    pub fn new() -> Self {
        Self {
            locations: Arc::new(RwLock::new(GeoIndex::new())),
        }
    }

    /// Number of tracked users
    pub async fn len(&self) -> usize {
        self.locations.read().await.len()
    }
}

#[async_trait]
impl UserLocationStore for InMemoryUserLocationStore {
    async fn upsert(&self, user_id: &str, location: GeoPoint) -> Result<UserLocation> {
        let record = UserLocation {
            user_id: user_id.to_string(),
            location,
            updated_at: Utc::now(),
        };
        self.locations
            .write()
            .await
            .upsert(record.user_id.clone(), location, record.clone());
        Ok(record)
    }

    async fn find_within(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(UserLocation, f64)>> {
        let locations = self.locations.read().await;
        Ok(locations
            .query(center, radius_km, |_| true)
            .into_iter()
            .map(|(_, location, distance)| (location.clone(), distance))
            .collect())
    }
}

// ============================================================================
// InMemoryNotificationStore - alert records, no geo component
// ============================================================================

/// In-memory notification store
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationStore {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotificationStore {
    /// Create a new in-memory notification store
    pub fn new() -> Self {
        Self {
            notifications: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Total number of stored notifications (useful for tests)
    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert_batch(&self, inputs: Vec<NewNotification>) -> Result<Vec<Notification>> {
        let now = Utc::now();
        let created: Vec<Notification> = inputs
            .into_iter()
            .map(|input| Notification {
                id: Uuid::now_v7(),
                user_id: input.user_id,
                title: input.title,
                message: input.message,
                kind: input.kind,
                read: false,
                created_at: now,
            })
            .collect();
        self.notifications
            .write()
            .await
            .extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut matching: Vec<Notification> = notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationKind;
    use chrono::Duration;

    #[tokio::test]
    async fn report_store_filters_by_disease_and_window() {
        let store = InMemoryScanReportStore::new();
        let now = Utc::now();
        let here = GeoPoint::new(25.3, 82.9);

        for (disease, age_days) in [("Late Blight", 1), ("Late Blight", 10), ("Rust", 1)] {
            store
                .insert(NewScanReport {
                    disease_name: disease.to_string(),
                    plant_type: "Potato".to_string(),
                    latitude: here.lat,
                    longitude: here.lon,
                    observed_at: now - Duration::days(age_days),
                })
                .await
                .unwrap();
        }

        let since = now - Duration::days(7);
        let nearby = store
            .find_nearby("Late Blight", here, 5.0, since)
            .await
            .unwrap();
        assert_eq!(nearby.len(), 1);
    }

    #[tokio::test]
    async fn outbreak_update_count_is_idempotent() {
        let store = InMemoryOutbreakStore::new();
        let outbreak = store
            .insert(NewOutbreak {
                disease_name: "Late Blight".to_string(),
                plant_type: "Potato".to_string(),
                center: GeoPoint::new(25.3, 82.9),
                severity: Severity::Severe,
                report_count: 7,
            })
            .await
            .unwrap();

        let first = store
            .update_count(outbreak.id, 9, Severity::Severe)
            .await
            .unwrap()
            .unwrap();
        let second = store
            .update_count(outbreak.id, 9, Severity::Severe)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.report_count, 9);
        assert_eq!(second.report_count, 9);
        assert_eq!(store.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn list_active_is_most_recent_first() {
        let store = InMemoryOutbreakStore::new();
        for disease in ["Rust", "Late Blight"] {
            store
                .insert(NewOutbreak {
                    disease_name: disease.to_string(),
                    plant_type: "Wheat".to_string(),
                    center: GeoPoint::new(26.8, 80.9),
                    severity: Severity::Severe,
                    report_count: 7,
                })
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 2);
        assert!(active[0].reported_at >= active[1].reported_at);
    }

    #[tokio::test]
    async fn user_location_upsert_replaces_previous_fix() {
        let store = InMemoryUserLocationStore::new();
        let old = GeoPoint::new(25.0, 83.0);
        let new = GeoPoint::new(26.8, 80.9);

        store.upsert("farmer-1", old).await.unwrap();
        store.upsert("farmer-1", new).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert!(store.find_within(old, 10.0).await.unwrap().is_empty());
        assert_eq!(store.find_within(new, 10.0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn notifications_list_newest_first() {
        let store = InMemoryNotificationStore::new();
        store
            .insert_batch(vec![
                NewNotification {
                    user_id: "farmer-1".to_string(),
                    title: "first".to_string(),
                    message: "m".to_string(),
                    kind: NotificationKind::Alert,
                },
                NewNotification {
                    user_id: "farmer-1".to_string(),
                    title: "second".to_string(),
                    message: "m".to_string(),
                    kind: NotificationKind::Alert,
                },
            ])
            .await
            .unwrap();

        let listed = store.list_for_user("farmer-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(!listed[0].read);
        assert!(listed[0].created_at >= listed[1].created_at);
    }
}
