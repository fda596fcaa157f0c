// Outbreak domain types
//
// An outbreak is a declared spatial cluster of same-disease reports.
// Invariant: at most one active outbreak of a given disease within the
// dedup tolerance of another active outbreak of the same disease.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Outbreak severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Mild => write!(f, "Mild"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Severe => write!(f, "Severe"),
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s {
            "Mild" => Severity::Mild,
            "Severe" => Severity::Severe,
            _ => Severity::Moderate,
        }
    }
}

/// Outbreak status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutbreakStatus {
    Active,
    Contained,
    Resolved,
}

impl std::fmt::Display for OutbreakStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutbreakStatus::Active => write!(f, "active"),
            OutbreakStatus::Contained => write!(f, "contained"),
            OutbreakStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl From<&str> for OutbreakStatus {
    fn from(s: &str) -> Self {
        match s {
            "contained" => OutbreakStatus::Contained,
            "resolved" => OutbreakStatus::Resolved,
            _ => OutbreakStatus::Active,
        }
    }
}

/// Outbreak - a declared, ongoing cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbreak {
    pub id: Uuid,
    pub disease_name: String,
    pub plant_type: String,
    /// The triggering report's location, not a centroid.
    pub center: GeoPoint,
    pub severity: Severity,
    /// Last computed cluster size.
    pub report_count: i32,
    pub status: OutbreakStatus,
    pub reported_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Input for creating an outbreak (id and timestamps assigned by the store,
/// status starts as active)
#[derive(Debug, Clone)]
pub struct NewOutbreak {
    pub disease_name: String,
    pub plant_type: String,
    pub center: GeoPoint,
    pub severity: Severity,
    pub report_count: i32,
}
