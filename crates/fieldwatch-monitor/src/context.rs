// Shared store context
//
// One handle bundling the four record stores, constructed at process start
// and threaded through the pipeline components. Replaces the global
// database handle the components would otherwise reach for.

use std::sync::Arc;

use fieldwatch_core::memory::{
    InMemoryNotificationStore, InMemoryOutbreakStore, InMemoryScanReportStore,
    InMemoryUserLocationStore,
};
use fieldwatch_core::{NotificationStore, OutbreakStore, ScanReportStore, UserLocationStore};
use fieldwatch_storage::Database;

#[derive(Clone)]
pub struct SurveillanceContext {
    pub reports: Arc<dyn ScanReportStore>,
    pub outbreaks: Arc<dyn OutbreakStore>,
    pub users: Arc<dyn UserLocationStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl SurveillanceContext {
    /// All stores in memory; suitable for tests and single-node use.
    pub fn in_memory() -> Self {
        Self {
            reports: Arc::new(InMemoryScanReportStore::new()),
            outbreaks: Arc::new(InMemoryOutbreakStore::new()),
            users: Arc::new(InMemoryUserLocationStore::new()),
            notifications: Arc::new(InMemoryNotificationStore::new()),
        }
    }

    /// All stores backed by the same Postgres pool.
    pub fn postgres(db: Database) -> Self {
        Self {
            reports: Arc::new(db.clone()),
            outbreaks: Arc::new(db.clone()),
            users: Arc::new(db.clone()),
            notifications: Arc::new(db),
        }
    }
}
