// Read-side surveillance queries
//
// The shapes the excluded API layer consumes: a GeoJSON feature collection
// of active outbreaks for the map view, nearby outbreaks with a computed
// distance, and per-user notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use fieldwatch_core::{GeoPoint, Notification, Outbreak, Result, Severity};

use crate::context::SurveillanceContext;

// ============================================================================
// GeoJSON DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OutbreakFeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: &'static str,
    pub features: Vec<OutbreakFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutbreakFeature {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
    pub geometry: PointGeometry,
    pub properties: OutbreakProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub geometry_type: &'static str,
    /// [longitude, latitude] per GeoJSON
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutbreakProperties {
    pub id: Uuid,
    pub disease_name: String,
    pub plant_type: String,
    pub severity: Severity,
    pub report_count: i32,
    pub reported_at: DateTime<Utc>,
}

impl From<Outbreak> for OutbreakFeature {
    fn from(outbreak: Outbreak) -> Self {
        OutbreakFeature {
            feature_type: "Feature",
            geometry: PointGeometry {
                geometry_type: "Point",
                coordinates: [outbreak.center.lon, outbreak.center.lat],
            },
            properties: OutbreakProperties {
                id: outbreak.id,
                disease_name: outbreak.disease_name,
                plant_type: outbreak.plant_type,
                severity: outbreak.severity,
                report_count: outbreak.report_count,
                reported_at: outbreak.reported_at,
            },
        }
    }
}

/// An active outbreak with its distance from the query point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyOutbreak {
    #[serde(flatten)]
    pub outbreak: Outbreak,
    /// Haversine distance in kilometers, rounded to one decimal.
    pub distance_km: f64,
}

// ============================================================================
// SurveillanceService
// ============================================================================

#[derive(Clone)]
pub struct SurveillanceService {
    ctx: SurveillanceContext,
}

impl SurveillanceService {
    pub fn new(ctx: SurveillanceContext) -> Self {
        Self { ctx }
    }

    /// All active outbreaks as a GeoJSON feature collection, most recently
    /// reported first.
    pub async fn list_active_outbreaks(&self) -> Result<OutbreakFeatureCollection> {
        let outbreaks = self.ctx.outbreaks.list_active().await?;
        Ok(OutbreakFeatureCollection {
            collection_type: "FeatureCollection",
            features: outbreaks.into_iter().map(OutbreakFeature::from).collect(),
        })
    }

    /// Active outbreaks within `radius_km` of the given point, nearest
    /// first, with the distance rounded to one decimal.
    pub async fn list_nearby_outbreaks(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<NearbyOutbreak>> {
        let center = GeoPoint::new(latitude, longitude);
        let mut nearby: Vec<NearbyOutbreak> = self
            .ctx
            .outbreaks
            .list_active()
            .await?
            .into_iter()
            .filter_map(|outbreak| {
                let distance = center.haversine_km(&outbreak.center);
                (distance <= radius_km).then_some(NearbyOutbreak {
                    outbreak,
                    distance_km: (distance * 10.0).round() / 10.0,
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }

    /// Notifications for one user, newest first.
    pub async fn list_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.ctx.notifications.list_for_user(user_id).await
    }
}
