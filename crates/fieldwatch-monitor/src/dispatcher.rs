// Alert dispatcher
//
// Translates a newly created outbreak into notification records for every
// user within the alert radius. Materializes records only; push delivery
// (device tokens, batching limits) belongs to the external messaging
// gateway. Dispatch is best-effort: a failure here never rolls back the
// outbreak that triggered it.

use std::sync::Arc;
use tracing::{debug, info};

use fieldwatch_core::{
    NewNotification, NotificationKind, NotificationStore, Outbreak, Result, SurveillanceError,
    UserLocationStore,
};

/// Users within this distance of an outbreak center get an alert.
pub const ALERT_RADIUS_KM: f64 = 10.0;

#[derive(Clone)]
pub struct AlertDispatcher {
    users: Arc<dyn UserLocationStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl AlertDispatcher {
    pub fn new(users: Arc<dyn UserLocationStore>, notifications: Arc<dyn NotificationStore>) -> Self {
        Self {
            users,
            notifications,
        }
    }

    /// Materialize one alert per user within ALERT_RADIUS_KM of the
    /// outbreak center. Returns the number of notifications created;
    /// zero nearby users is a no-op, not an error.
    pub async fn notify(&self, outbreak: &Outbreak) -> Result<usize> {
        let nearby = self
            .users
            .find_within(outbreak.center, ALERT_RADIUS_KM)
            .await
            .map_err(|e| SurveillanceError::dispatch(e.to_string()))?;

        if nearby.is_empty() {
            debug!(outbreak_id = %outbreak.id, "no users near outbreak, nothing to dispatch");
            return Ok(0);
        }

        let batch: Vec<NewNotification> = nearby
            .into_iter()
            .map(|(user, _)| NewNotification {
                user_id: user.user_id,
                title: format!("Outbreak alert: {}", outbreak.disease_name),
                message: format!(
                    "{} detected within {:.0} km of your farm. Inspect your crops now.",
                    outbreak.disease_name, ALERT_RADIUS_KM
                ),
                kind: NotificationKind::Alert,
            })
            .collect();

        let created = self
            .notifications
            .insert_batch(batch)
            .await
            .map_err(|e| SurveillanceError::dispatch(e.to_string()))?;

        info!(
            outbreak_id = %outbreak.id,
            disease = %outbreak.disease_name,
            count = created.len(),
            "outbreak alerts materialized"
        );
        Ok(created.len())
    }
}
