// UserLocation domain types
//
// A user's last known position, used only for alert targeting.
// Single current value per user; no history retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    pub user_id: String,
    pub location: GeoPoint,
    pub updated_at: DateTime<Utc>,
}
