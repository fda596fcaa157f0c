// Outbreak registry
//
// Owns all outbreak writes and enforces the dedup invariant: at most one
// active outbreak of a disease within DEDUP_RADIUS_KM of another active
// outbreak of the same disease. The check-then-act upsert is serialized per
// disease name, which closes the duplicate-creation race for concurrent
// same-disease reports (strictly stronger than per-locality serialization).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use fieldwatch_core::{
    GeoPoint, NewOutbreak, Outbreak, OutbreakStore, Result, Severity, SurveillanceError,
};

/// Two triggering points closer than this are the same outbreak.
pub const DEDUP_RADIUS_KM: f64 = 2.0;

/// Result of an outbreak upsert
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    /// A new outbreak was declared.
    Created(Outbreak),
    /// An existing nearby outbreak absorbed the cluster.
    Updated(Outbreak),
}

impl UpsertOutcome {
    pub fn outbreak(&self) -> &Outbreak {
        match self {
            UpsertOutcome::Created(o) | UpsertOutcome::Updated(o) => o,
        }
    }
}

/// Registry over the outbreak store with serialized upserts
///
/// Clones share the lock map, so every writer in the process observes the
/// same serialization discipline.
#[derive(Clone)]
pub struct OutbreakRegistry {
    store: Arc<dyn OutbreakStore>,
    /// Per-disease upsert serialization (disease name -> lock)
    upsert_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl OutbreakRegistry {
    pub fn new(store: Arc<dyn OutbreakStore>) -> Self {
        Self {
            store,
            upsert_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_for(&self, disease_name: &str) -> Arc<Mutex<()>> {
        self.upsert_locks
            .lock()
            .await
            .entry(disease_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Upsert a machine-declared cluster.
    ///
    /// Machine-declared outbreaks are always Severe regardless of disease;
    /// an existing active outbreak within DEDUP_RADIUS_KM takes the new
    /// count instead of spawning a duplicate. Idempotent for a repeated
    /// identical count.
    pub async fn upsert_cluster(
        &self,
        disease_name: &str,
        plant_type: &str,
        center: GeoPoint,
        report_count: i32,
    ) -> Result<UpsertOutcome> {
        let lock = self.lock_for(disease_name).await;
        let _guard = lock.lock().await;

        let nearby = self
            .store
            .find_active_nearby(disease_name, center, DEDUP_RADIUS_KM)
            .await?;

        if let Some((existing, _)) = nearby.into_iter().next() {
            let updated = self
                .store
                .update_count(existing.id, report_count, Severity::Severe)
                .await?
                .ok_or_else(|| {
                    SurveillanceError::store(format!(
                        "outbreak {} vanished during count update",
                        existing.id
                    ))
                })?;
            Ok(UpsertOutcome::Updated(updated))
        } else {
            let created = self
                .store
                .insert(NewOutbreak {
                    disease_name: disease_name.to_string(),
                    plant_type: plant_type.to_string(),
                    center,
                    severity: Severity::Severe,
                    report_count,
                })
                .await?;
            info!(
                outbreak_id = %created.id,
                disease = %created.disease_name,
                report_count,
                "outbreak declared"
            );
            Ok(UpsertOutcome::Created(created))
        }
    }

    /// Record a manually submitted outbreak report with the severity the
    /// reporter chose. Flows through the same dedup discipline: a nearby
    /// active outbreak of the disease absorbs the report instead of
    /// duplicating it.
    pub async fn create_manual(
        &self,
        disease_name: &str,
        plant_type: &str,
        severity: Severity,
        center: GeoPoint,
    ) -> Result<UpsertOutcome> {
        let lock = self.lock_for(disease_name).await;
        let _guard = lock.lock().await;

        let nearby = self
            .store
            .find_active_nearby(disease_name, center, DEDUP_RADIUS_KM)
            .await?;

        if let Some((existing, _)) = nearby.into_iter().next() {
            let updated = self
                .store
                .update_count(existing.id, existing.report_count + 1, severity)
                .await?
                .ok_or_else(|| {
                    SurveillanceError::store(format!(
                        "outbreak {} vanished during manual report",
                        existing.id
                    ))
                })?;
            Ok(UpsertOutcome::Updated(updated))
        } else {
            let created = self
                .store
                .insert(NewOutbreak {
                    disease_name: disease_name.to_string(),
                    plant_type: plant_type.to_string(),
                    center,
                    severity,
                    report_count: 1,
                })
                .await?;
            info!(
                outbreak_id = %created.id,
                disease = %created.disease_name,
                "outbreak reported manually"
            );
            Ok(UpsertOutcome::Created(created))
        }
    }

    /// Active outbreaks of the disease within `radius_km` of `center`.
    pub async fn find_active_nearby(
        &self,
        disease_name: &str,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(Outbreak, f64)>> {
        self.store
            .find_active_nearby(disease_name, center, radius_km)
            .await
    }

    /// All active outbreaks, most recently reported first.
    pub async fn list_active(&self) -> Result<Vec<Outbreak>> {
        self.store.list_active().await
    }
}
