// Database models (internal, converted to core domain entities)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use fieldwatch_core::{
    GeoPoint, Notification, NotificationKind, Outbreak, OutbreakStatus, ScanReport, Severity,
    UserLocation,
};

// ============================================
// Scan report models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct ScanReportRow {
    pub id: Uuid,
    pub disease_name: String,
    pub plant_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<ScanReportRow> for ScanReport {
    fn from(row: ScanReportRow) -> Self {
        ScanReport {
            id: row.id,
            disease_name: row.disease_name,
            plant_type: row.plant_type,
            location: GeoPoint::new(row.latitude, row.longitude),
            observed_at: row.observed_at,
        }
    }
}

// ============================================
// Outbreak models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct OutbreakRow {
    pub id: Uuid,
    pub disease_name: String,
    pub plant_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: String,
    pub report_count: i32,
    pub status: String,
    pub reported_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<OutbreakRow> for Outbreak {
    fn from(row: OutbreakRow) -> Self {
        Outbreak {
            id: row.id,
            disease_name: row.disease_name,
            plant_type: row.plant_type,
            center: GeoPoint::new(row.latitude, row.longitude),
            severity: Severity::from(row.severity.as_str()),
            report_count: row.report_count,
            status: OutbreakStatus::from(row.status.as_str()),
            reported_at: row.reported_at,
            last_updated: row.last_updated,
        }
    }
}

// ============================================
// User location models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct UserLocationRow {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
}

impl From<UserLocationRow> for UserLocation {
    fn from(row: UserLocationRow) -> Self {
        UserLocation {
            user_id: row.user_id,
            location: GeoPoint::new(row.latitude, row.longitude),
            updated_at: row.updated_at,
        }
    }
}

// ============================================
// Notification models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            // "alert" is the only kind materialized by this core
            kind: NotificationKind::Alert,
            read: row.read,
            created_at: row.created_at,
        }
    }
}
