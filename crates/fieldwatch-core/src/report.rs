// ScanReport domain types
//
// One disease observation produced by a successful AI analysis.
// Immutable once stored; retained indefinitely for historical cluster
// queries bounded by the lookback window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// ScanReport - a single geo-tagged disease observation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub id: Uuid,
    /// Canonical disease label from the classifier; case-sensitive match key.
    pub disease_name: String,
    /// Informational only, carried into the outbreak record.
    pub plant_type: String,
    pub location: GeoPoint,
    pub observed_at: DateTime<Utc>,
}

/// Input for creating a scan report (id is assigned by the store)
#[derive(Debug, Clone)]
pub struct NewScanReport {
    pub disease_name: String,
    pub plant_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

impl NewScanReport {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
