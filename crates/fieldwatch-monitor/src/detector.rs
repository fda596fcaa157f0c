// Cluster detection
//
// Decides, for an incoming scan report, whether same-disease reports nearby
// within the lookback window form a cluster, and drives the registry upsert
// and alert dispatch when they do.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, warn};

use fieldwatch_core::{Outbreak, Result, ScanReport, ScanReportStore};

use crate::dispatcher::AlertDispatcher;
use crate::registry::{OutbreakRegistry, UpsertOutcome};

/// Same-disease reports within this distance of the triggering report
/// count toward the cluster.
pub const CLUSTER_RADIUS_KM: f64 = 5.0;

/// Cluster size at which an outbreak is declared.
pub const CLUSTER_THRESHOLD: usize = 7;

/// Trailing window for counting reports, anchored to the triggering
/// report's observation time.
pub const LOOKBACK_DAYS: i64 = 7;

/// What evaluating one report led to
#[derive(Debug, Clone)]
pub enum EvaluationOutcome {
    /// Report was ineligible (healthy, unnamed disease, or no location fix).
    Skipped,
    /// Cluster not reached; the report stays logged for future queries.
    BelowThreshold { report_count: usize },
    /// A new outbreak was declared and alerts were dispatched.
    OutbreakCreated(Outbreak),
    /// An existing outbreak absorbed the cluster; no re-notification.
    OutbreakUpdated(Outbreak),
}

pub struct ClusterDetector {
    reports: Arc<dyn ScanReportStore>,
    registry: OutbreakRegistry,
    dispatcher: AlertDispatcher,
}

impl ClusterDetector {
    pub fn new(
        reports: Arc<dyn ScanReportStore>,
        registry: OutbreakRegistry,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            reports,
            registry,
            dispatcher,
        }
    }

    /// Evaluate an already-persisted report.
    ///
    /// The triggering report is stored before evaluation runs, so the
    /// nearby count includes it. Alerts fire only when the upsert creates
    /// an outbreak; a dispatch failure is logged and the outbreak stays
    /// committed.
    pub async fn evaluate(&self, report: &ScanReport) -> Result<EvaluationOutcome> {
        if !Self::is_eligible(report) {
            debug!(report_id = %report.id, "report ineligible for cluster evaluation");
            return Ok(EvaluationOutcome::Skipped);
        }

        let since = report.observed_at - Duration::days(LOOKBACK_DAYS);
        let nearby = self
            .reports
            .find_nearby(&report.disease_name, report.location, CLUSTER_RADIUS_KM, since)
            .await?;
        let report_count = nearby.len();

        if report_count < CLUSTER_THRESHOLD {
            debug!(
                report_id = %report.id,
                disease = %report.disease_name,
                report_count,
                "below cluster threshold"
            );
            return Ok(EvaluationOutcome::BelowThreshold { report_count });
        }

        let outcome = self
            .registry
            .upsert_cluster(
                &report.disease_name,
                &report.plant_type,
                report.location,
                report_count as i32,
            )
            .await?;

        match outcome {
            UpsertOutcome::Created(outbreak) => {
                if let Err(e) = self.dispatcher.notify(&outbreak).await {
                    warn!(
                        outbreak_id = %outbreak.id,
                        error = %e,
                        "alert dispatch failed, outbreak stays committed"
                    );
                }
                Ok(EvaluationOutcome::OutbreakCreated(outbreak))
            }
            UpsertOutcome::Updated(outbreak) => Ok(EvaluationOutcome::OutbreakUpdated(outbreak)),
        }
    }

    /// Healthy scans, unnamed diseases and reports without a location fix
    /// never trigger cluster evaluation.
    fn is_eligible(report: &ScanReport) -> bool {
        let disease = report.disease_name.trim();
        !disease.is_empty()
            && !disease.eq_ignore_ascii_case("healthy")
            && !report.location.is_zero()
    }
}
