// Outbreak Monitor
//
// The decision pipeline for outbreak surveillance:
// new scan report -> ClusterDetector.evaluate() -> OutbreakRegistry upsert
// -> AlertDispatcher.notify() on creation.
//
// Key design decisions:
// - Report submission persists the report and returns; evaluation runs as a
//   detached task tracked by OutbreakMonitor (fire-and-forget, errors logged)
// - The duplicate-outbreak race is closed by serializing upserts per disease
//   name inside OutbreakRegistry
// - Alerts fire exactly once, on outbreak creation; count updates never
//   re-notify
// - Thresholds and radii are fixed constants, not per-disease configuration

pub mod context;
pub mod detector;
pub mod dispatcher;
pub mod monitor;
pub mod registry;
pub mod service;

// Re-exports for convenience
pub use context::SurveillanceContext;
pub use detector::{
    ClusterDetector, EvaluationOutcome, CLUSTER_RADIUS_KM, CLUSTER_THRESHOLD, LOOKBACK_DAYS,
};
pub use dispatcher::{AlertDispatcher, ALERT_RADIUS_KM};
pub use monitor::OutbreakMonitor;
pub use registry::{OutbreakRegistry, UpsertOutcome, DEDUP_RADIUS_KM};
pub use service::{
    NearbyOutbreak, OutbreakFeature, OutbreakFeatureCollection, OutbreakProperties, PointGeometry,
    SurveillanceService,
};
