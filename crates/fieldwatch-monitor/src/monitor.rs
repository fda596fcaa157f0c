// Fire-and-forget evaluation runner
//
// Report submission persists the report and returns to the caller; cluster
// evaluation runs as a detached Tokio task. Any evaluation error is logged
// and swallowed so the submission path never fails or blocks on it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use fieldwatch_core::{GeoPoint, NewScanReport, Result, ScanReport, Severity, UserLocation};

use crate::context::SurveillanceContext;
use crate::detector::ClusterDetector;
use crate::dispatcher::AlertDispatcher;
use crate::registry::{OutbreakRegistry, UpsertOutcome};

pub struct OutbreakMonitor {
    ctx: SurveillanceContext,
    detector: Arc<ClusterDetector>,
    registry: OutbreakRegistry,
    dispatcher: AlertDispatcher,
    /// In-flight evaluations (report id -> task handle)
    active_evaluations: Arc<RwLock<HashMap<Uuid, JoinHandle<()>>>>,
}

impl OutbreakMonitor {
    pub fn new(ctx: SurveillanceContext) -> Self {
        let registry = OutbreakRegistry::new(ctx.outbreaks.clone());
        let dispatcher = AlertDispatcher::new(ctx.users.clone(), ctx.notifications.clone());
        let detector = Arc::new(ClusterDetector::new(
            ctx.reports.clone(),
            registry.clone(),
            dispatcher.clone(),
        ));

        Self {
            ctx,
            detector,
            registry,
            dispatcher,
            active_evaluations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Persist a scan report and kick off cluster evaluation in the
    /// background. Returns as soon as the report is durably stored; the
    /// caller never waits on (or hears about) the evaluation.
    pub async fn submit_scan_report(&self, input: NewScanReport) -> Result<ScanReport> {
        let report = self.ctx.reports.insert(input).await?;

        let detector = self.detector.clone();
        let active_evaluations = self.active_evaluations.clone();
        let report_id = report.id;
        let task_report = report.clone();

        // The task removes its own entry and takes the same lock to do it,
        // so holding the lock across spawn and insert forces the removal to
        // run after the insert. Inserting after the spawn without the lock
        // leaks finished handles whenever the task wins the race.
        let mut active = self.active_evaluations.write().await;
        let handle = tokio::spawn(async move {
            if let Err(e) = detector.evaluate(&task_report).await {
                warn!(report_id = %report_id, error = %e, "cluster evaluation failed");
            }
            active_evaluations.write().await.remove(&report_id);
        });
        active.insert(report_id, handle);
        drop(active);

        Ok(report)
    }

    /// Upsert the user's current position for alert targeting.
    pub async fn report_user_location(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<UserLocation> {
        self.ctx
            .users
            .upsert(user_id, GeoPoint::new(latitude, longitude))
            .await
    }

    /// Record a manually submitted outbreak with the reporter's severity.
    /// Alerts fire when this creates a new outbreak, same as the cluster
    /// path; absorption into an existing outbreak never re-notifies.
    pub async fn submit_outbreak_report(
        &self,
        disease_name: &str,
        plant_type: &str,
        severity: Severity,
        latitude: f64,
        longitude: f64,
    ) -> Result<UpsertOutcome> {
        let outcome = self
            .registry
            .create_manual(
                disease_name,
                plant_type,
                severity,
                GeoPoint::new(latitude, longitude),
            )
            .await?;

        if let UpsertOutcome::Created(outbreak) = &outcome {
            if let Err(e) = self.dispatcher.notify(outbreak).await {
                warn!(
                    outbreak_id = %outbreak.id,
                    error = %e,
                    "alert dispatch failed, outbreak stays committed"
                );
            }
        }

        Ok(outcome)
    }

    /// Number of evaluations still in flight.
    pub async fn pending_evaluations(&self) -> usize {
        self.active_evaluations.read().await.len()
    }

    /// Wait for all in-flight evaluations to finish. Used by tests and by
    /// graceful shutdown; new submissions during the wait are drained too.
    pub async fn wait_idle(&self) {
        loop {
            let handles: Vec<(Uuid, JoinHandle<()>)> = {
                let mut active = self.active_evaluations.write().await;
                active.drain().collect()
            };
            if handles.is_empty() {
                break;
            }
            for (report_id, handle) in handles {
                if let Err(e) = handle.await {
                    if !e.is_cancelled() {
                        warn!(report_id = %report_id, error = %e, "evaluation task panicked");
                    }
                }
            }
        }
    }

    /// Abort any outstanding evaluations.
    pub async fn shutdown(&self) {
        let mut active = self.active_evaluations.write().await;
        for (report_id, handle) in active.drain() {
            info!(report_id = %report_id, "aborting evaluation on shutdown");
            handle.abort();
        }
    }
}
