// Repository layer for database operations
//
// Database holds the shared pool and exposes row-level operations; the
// core store traits are implemented on top of them. Radius queries bind a
// bounding box computed from the query radius and leave the true-distance
// filter to the trait impls. The box longitudes may extend past +-180 when
// the radius crosses the antimeridian, so the SQL matches longitude and
// its +-360 aliases against the unclamped range.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fieldwatch_core::{
    BoundingBox, GeoPoint, NewNotification, NewOutbreak, NewScanReport, Notification,
    NotificationStore, Outbreak, OutbreakStore, ScanReport, ScanReportStore, Severity,
    SurveillanceError, UserLocation, UserLocationStore,
};

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Scan reports (append-only observation log)
    // ============================================

    pub async fn insert_scan_report(&self, input: &NewScanReport) -> Result<ScanReportRow> {
        let row = sqlx::query_as::<_, ScanReportRow>(
            r#"
            INSERT INTO scan_reports (id, disease_name, plant_type, latitude, longitude, observed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, disease_name, plant_type, latitude, longitude, observed_at, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.disease_name)
        .bind(&input.plant_type)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.observed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn scan_reports_in_box(
        &self,
        disease_name: &str,
        bbox: &BoundingBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<ScanReportRow>> {
        let rows = sqlx::query_as::<_, ScanReportRow>(
            r#"
            SELECT id, disease_name, plant_type, latitude, longitude, observed_at, created_at
            FROM scan_reports
            WHERE disease_name = $1
              AND observed_at >= $2
              AND latitude BETWEEN $3 AND $4
              AND (longitude BETWEEN $5 AND $6
                   OR longitude + 360 BETWEEN $5 AND $6
                   OR longitude - 360 BETWEEN $5 AND $6)
            "#,
        )
        .bind(disease_name)
        .bind(since)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lon)
        .bind(bbox.max_lon)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Outbreaks
    // ============================================

    pub async fn insert_outbreak(&self, input: &NewOutbreak) -> Result<OutbreakRow> {
        let row = sqlx::query_as::<_, OutbreakRow>(
            r#"
            INSERT INTO outbreaks (id, disease_name, plant_type, latitude, longitude, severity, report_count, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active')
            RETURNING id, disease_name, plant_type, latitude, longitude, severity, report_count, status, reported_at, last_updated
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.disease_name)
        .bind(&input.plant_type)
        .bind(input.center.lat)
        .bind(input.center.lon)
        .bind(input.severity.to_string())
        .bind(input.report_count)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn update_outbreak_count(
        &self,
        id: Uuid,
        report_count: i32,
        severity: &str,
    ) -> Result<Option<OutbreakRow>> {
        let row = sqlx::query_as::<_, OutbreakRow>(
            r#"
            UPDATE outbreaks
            SET report_count = $2, severity = $3, last_updated = NOW()
            WHERE id = $1
            RETURNING id, disease_name, plant_type, latitude, longitude, severity, report_count, status, reported_at, last_updated
            "#,
        )
        .bind(id)
        .bind(report_count)
        .bind(severity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn active_outbreaks_in_box(
        &self,
        disease_name: &str,
        bbox: &BoundingBox,
    ) -> Result<Vec<OutbreakRow>> {
        let rows = sqlx::query_as::<_, OutbreakRow>(
            r#"
            SELECT id, disease_name, plant_type, latitude, longitude, severity, report_count, status, reported_at, last_updated
            FROM outbreaks
            WHERE status = 'active'
              AND disease_name = $1
              AND latitude BETWEEN $2 AND $3
              AND (longitude BETWEEN $4 AND $5
                   OR longitude + 360 BETWEEN $4 AND $5
                   OR longitude - 360 BETWEEN $4 AND $5)
            "#,
        )
        .bind(disease_name)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lon)
        .bind(bbox.max_lon)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_active_outbreaks(&self) -> Result<Vec<OutbreakRow>> {
        let rows = sqlx::query_as::<_, OutbreakRow>(
            r#"
            SELECT id, disease_name, plant_type, latitude, longitude, severity, report_count, status, reported_at, last_updated
            FROM outbreaks
            WHERE status = 'active'
            ORDER BY reported_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // User locations (single current fix per user)
    // ============================================

    pub async fn upsert_user_location(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<UserLocationRow> {
        let row = sqlx::query_as::<_, UserLocationRow>(
            r#"
            INSERT INTO user_locations (user_id, latitude, longitude, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET latitude = $2, longitude = $3, updated_at = NOW()
            RETURNING user_id, latitude, longitude, updated_at
            "#,
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn user_locations_in_box(&self, bbox: &BoundingBox) -> Result<Vec<UserLocationRow>> {
        let rows = sqlx::query_as::<_, UserLocationRow>(
            r#"
            SELECT user_id, latitude, longitude, updated_at
            FROM user_locations
            WHERE latitude BETWEEN $1 AND $2
              AND (longitude BETWEEN $3 AND $4
                   OR longitude + 360 BETWEEN $3 AND $4
                   OR longitude - 360 BETWEEN $3 AND $4)
            "#,
        )
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lon)
        .bind(bbox.max_lon)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn insert_notifications(
        &self,
        inputs: &[NewNotification],
    ) -> Result<Vec<NotificationRow>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = inputs.iter().map(|_| Uuid::now_v7()).collect();
        let user_ids: Vec<String> = inputs.iter().map(|n| n.user_id.clone()).collect();
        let titles: Vec<String> = inputs.iter().map(|n| n.title.clone()).collect();
        let messages: Vec<String> = inputs.iter().map(|n| n.message.clone()).collect();
        let kinds: Vec<String> = inputs.iter().map(|n| n.kind.to_string()).collect();

        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, user_id, title, message, kind)
            SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::text[], $5::text[])
            RETURNING id, user_id, title, message, kind, read, created_at
            "#,
        )
        .bind(&ids)
        .bind(&user_ids)
        .bind(&titles)
        .bind(&messages)
        .bind(&kinds)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, title, message, kind, read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// ============================================
// Core store trait implementations
// ============================================

fn distance_filtered<R, T>(
    rows: Vec<R>,
    center: GeoPoint,
    radius_km: f64,
    location_of: fn(&T) -> GeoPoint,
) -> Vec<(T, f64)>
where
    T: From<R>,
{
    let mut matches: Vec<(T, f64)> = rows
        .into_iter()
        .map(T::from)
        .filter_map(|entity| {
            let distance = center.haversine_km(&location_of(&entity));
            (distance <= radius_km).then_some((entity, distance))
        })
        .collect();
    matches.sort_by(|a, b| a.1.total_cmp(&b.1));
    matches
}

#[async_trait]
impl ScanReportStore for Database {
    async fn insert(&self, input: NewScanReport) -> fieldwatch_core::Result<ScanReport> {
        let row = self
            .insert_scan_report(&input)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(row.into())
    }

    async fn find_nearby(
        &self,
        disease_name: &str,
        center: GeoPoint,
        radius_km: f64,
        since: DateTime<Utc>,
    ) -> fieldwatch_core::Result<Vec<(ScanReport, f64)>> {
        let bbox = BoundingBox::around(center, radius_km);
        let rows = self
            .scan_reports_in_box(disease_name, &bbox, since)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(distance_filtered(rows, center, radius_km, |r: &ScanReport| {
            r.location
        }))
    }
}

#[async_trait]
impl OutbreakStore for Database {
    async fn insert(&self, input: NewOutbreak) -> fieldwatch_core::Result<Outbreak> {
        let row = self
            .insert_outbreak(&input)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(row.into())
    }

    async fn update_count(
        &self,
        id: Uuid,
        report_count: i32,
        severity: Severity,
    ) -> fieldwatch_core::Result<Option<Outbreak>> {
        let row = self
            .update_outbreak_count(id, report_count, &severity.to_string())
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(row.map(Outbreak::from))
    }

    async fn find_active_nearby(
        &self,
        disease_name: &str,
        center: GeoPoint,
        radius_km: f64,
    ) -> fieldwatch_core::Result<Vec<(Outbreak, f64)>> {
        let bbox = BoundingBox::around(center, radius_km);
        let rows = self
            .active_outbreaks_in_box(disease_name, &bbox)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(distance_filtered(rows, center, radius_km, |o: &Outbreak| {
            o.center
        }))
    }

    async fn list_active(&self) -> fieldwatch_core::Result<Vec<Outbreak>> {
        let rows = self
            .list_active_outbreaks()
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(rows.into_iter().map(Outbreak::from).collect())
    }
}

#[async_trait]
impl UserLocationStore for Database {
    async fn upsert(&self, user_id: &str, location: GeoPoint) -> fieldwatch_core::Result<UserLocation> {
        let row = self
            .upsert_user_location(user_id, location.lat, location.lon)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(row.into())
    }

    async fn find_within(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> fieldwatch_core::Result<Vec<(UserLocation, f64)>> {
        let bbox = BoundingBox::around(center, radius_km);
        let rows = self
            .user_locations_in_box(&bbox)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(distance_filtered(rows, center, radius_km, |u: &UserLocation| {
            u.location
        }))
    }
}

#[async_trait]
impl NotificationStore for Database {
    async fn insert_batch(
        &self,
        inputs: Vec<NewNotification>,
    ) -> fieldwatch_core::Result<Vec<Notification>> {
        let rows = self
            .insert_notifications(&inputs)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn list_for_user(&self, user_id: &str) -> fieldwatch_core::Result<Vec<Notification>> {
        let rows = self
            .notifications_for_user(user_id)
            .await
            .map_err(SurveillanceError::Internal)?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }
}
