// Integration tests for the outbreak detection pipeline
//
// These run the full flow over the in-memory stores: report submission,
// detached cluster evaluation, registry dedup and alert fan-out.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use fieldwatch_core::memory::{
    InMemoryNotificationStore, InMemoryOutbreakStore, InMemoryScanReportStore,
    InMemoryUserLocationStore,
};
use fieldwatch_core::{GeoPoint, NewScanReport, NotificationKind, OutbreakStatus, Severity};
use fieldwatch_monitor::{
    OutbreakMonitor, SurveillanceContext, SurveillanceService, UpsertOutcome, CLUSTER_THRESHOLD,
};

// Kilometers per degree of latitude on a 6371 km sphere.
const KM_PER_DEG: f64 = fieldwatch_core::EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

fn offset_north(origin: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint::new(origin.lat + km / KM_PER_DEG, origin.lon)
}

fn scan(disease: &str, plant: &str, location: GeoPoint, observed_at: DateTime<Utc>) -> NewScanReport {
    NewScanReport {
        disease_name: disease.to_string(),
        plant_type: plant.to_string(),
        latitude: location.lat,
        longitude: location.lon,
        observed_at,
    }
}

struct Harness {
    monitor: Arc<OutbreakMonitor>,
    service: SurveillanceService,
    outbreaks: InMemoryOutbreakStore,
    notifications: InMemoryNotificationStore,
}

fn harness() -> Harness {
    let outbreaks = InMemoryOutbreakStore::new();
    let notifications = InMemoryNotificationStore::new();
    let ctx = SurveillanceContext {
        reports: Arc::new(InMemoryScanReportStore::new()),
        outbreaks: Arc::new(outbreaks.clone()),
        users: Arc::new(InMemoryUserLocationStore::new()),
        notifications: Arc::new(notifications.clone()),
    };
    Harness {
        monitor: Arc::new(OutbreakMonitor::new(ctx.clone())),
        service: SurveillanceService::new(ctx),
        outbreaks,
        notifications,
    }
}

/// Submit one report and wait for its evaluation to settle, so each report
/// observes exactly the reports submitted before it.
async fn submit_and_settle(h: &Harness, input: NewScanReport) {
    h.monitor.submit_scan_report(input).await.unwrap();
    h.monitor.wait_idle().await;
}

// =============================================================================
// Threshold law
// =============================================================================

#[tokio::test]
async fn below_threshold_reports_declare_nothing() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);

    for _ in 0..CLUSTER_THRESHOLD - 1 {
        submit_and_settle(&h, scan("Late Blight", "Potato", field, Utc::now())).await;
    }

    assert!(h.outbreaks.list_all().await.is_empty());
    assert_eq!(h.notifications.len().await, 0);
}

#[tokio::test]
async fn threshold_report_declares_exactly_one_outbreak() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);

    for _ in 0..CLUSTER_THRESHOLD {
        submit_and_settle(&h, scan("Late Blight", "Potato", field, Utc::now())).await;
    }

    let all = h.outbreaks.list_all().await;
    assert_eq!(all.len(), 1);
    let outbreak = &all[0];
    assert_eq!(outbreak.status, OutbreakStatus::Active);
    assert_eq!(outbreak.severity, Severity::Severe);
    assert_eq!(outbreak.report_count, CLUSTER_THRESHOLD as i32);
    assert_eq!(outbreak.disease_name, "Late Blight");
}

// =============================================================================
// Radius and lookback window
// =============================================================================

#[tokio::test]
async fn report_just_outside_the_cluster_radius_does_not_count() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);

    for _ in 0..CLUSTER_THRESHOLD - 1 {
        submit_and_settle(&h, scan("Late Blight", "Potato", field, Utc::now())).await;
    }
    // 5.05 km away: inside nothing, the cluster radius is 5 km.
    submit_and_settle(
        &h,
        scan("Late Blight", "Potato", offset_north(field, 5.05), Utc::now()),
    )
    .await;

    assert!(h.outbreaks.list_all().await.is_empty());
}

#[tokio::test]
async fn report_just_inside_the_cluster_radius_counts() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);

    for _ in 0..CLUSTER_THRESHOLD - 1 {
        submit_and_settle(&h, scan("Late Blight", "Potato", field, Utc::now())).await;
    }
    submit_and_settle(
        &h,
        scan("Late Blight", "Potato", offset_north(field, 4.95), Utc::now()),
    )
    .await;

    assert_eq!(h.outbreaks.list_all().await.len(), 1);
}

#[tokio::test]
async fn reports_older_than_the_lookback_window_do_not_count() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);
    let stale = Utc::now() - Duration::days(8);

    for _ in 0..CLUSTER_THRESHOLD - 1 {
        submit_and_settle(&h, scan("Late Blight", "Potato", field, stale)).await;
    }
    submit_and_settle(&h, scan("Late Blight", "Potato", field, Utc::now())).await;

    assert!(h.outbreaks.list_all().await.is_empty());
}

// =============================================================================
// Dedup law
// =============================================================================

#[tokio::test]
async fn overlapping_cluster_updates_the_existing_outbreak() {
    let h = harness();
    let field_a = GeoPoint::new(25.3176, 82.9912);
    let field_b = offset_north(field_a, 1.0);

    for _ in 0..CLUSTER_THRESHOLD {
        submit_and_settle(&h, scan("Late Blight", "Potato", field_a, Utc::now())).await;
    }
    for _ in 0..CLUSTER_THRESHOLD {
        submit_and_settle(&h, scan("Late Blight", "Potato", field_b, Utc::now())).await;
    }

    let all = h.outbreaks.list_all().await;
    assert_eq!(all.len(), 1, "overlapping clusters must not duplicate");
    assert_eq!(all[0].report_count, 2 * CLUSTER_THRESHOLD as i32);
}

// =============================================================================
// Alert fan-out
// =============================================================================

#[tokio::test]
async fn alerts_reach_only_users_inside_the_alert_radius() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);

    for (user, km) in [("near-1", 2.0), ("near-2", 6.0), ("near-3", 9.5)] {
        let p = offset_north(field, km);
        h.monitor.report_user_location(user, p.lat, p.lon).await.unwrap();
    }
    for (user, km) in [("far-1", 11.0), ("far-2", 40.0)] {
        let p = offset_north(field, km);
        h.monitor.report_user_location(user, p.lat, p.lon).await.unwrap();
    }

    for _ in 0..CLUSTER_THRESHOLD {
        submit_and_settle(&h, scan("Late Blight", "Potato", field, Utc::now())).await;
    }

    assert_eq!(h.notifications.len().await, 3);
    for user in ["near-1", "near-2", "near-3"] {
        let list = h.service.list_notifications_for_user(user).await.unwrap();
        assert_eq!(list.len(), 1, "{user} should have exactly one alert");
        assert_eq!(list[0].kind, NotificationKind::Alert);
        assert!(!list[0].read);
        assert!(list[0].title.contains("Late Blight"));
    }
    for user in ["far-1", "far-2"] {
        assert!(h.service.list_notifications_for_user(user).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn count_updates_never_renotify() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);
    h.monitor
        .report_user_location("farmer-1", field.lat, field.lon)
        .await
        .unwrap();

    for _ in 0..CLUSTER_THRESHOLD + 3 {
        submit_and_settle(&h, scan("Late Blight", "Potato", field, Utc::now())).await;
    }

    let all = h.outbreaks.list_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].report_count, CLUSTER_THRESHOLD as i32 + 3);
    // One alert from the creation, none from the three updates.
    assert_eq!(h.notifications.len().await, 1);
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[tokio::test]
async fn late_blight_scenario() {
    let h = harness();
    let village = GeoPoint::new(25.3176, 82.9912);

    for (user, km) in [("asha", 1.0), ("bimal", 4.0), ("chandra", 8.0)] {
        let p = offset_north(village, km);
        h.monitor.report_user_location(user, p.lat, p.lon).await.unwrap();
    }
    let far = offset_north(village, 25.0);
    h.monitor.report_user_location("devika", far.lat, far.lon).await.unwrap();

    // Seven reports spread over a few days and a few kilometers.
    for day in 0..CLUSTER_THRESHOLD {
        let location = offset_north(village, 0.3 * day as f64);
        let observed = Utc::now() - Duration::days(day as i64 % 6);
        submit_and_settle(&h, scan("Late Blight", "Potato", location, observed)).await;
    }

    let collection = h.service.list_active_outbreaks().await.unwrap();
    assert_eq!(collection.features.len(), 1);
    let properties = &collection.features[0].properties;
    assert_eq!(properties.disease_name, "Late Blight");
    assert_eq!(properties.plant_type, "Potato");
    assert_eq!(properties.severity, Severity::Severe);
    assert_eq!(properties.report_count, CLUSTER_THRESHOLD as i32);

    assert_eq!(h.notifications.len().await, 3);
    for user in ["asha", "bimal", "chandra"] {
        assert_eq!(h.service.list_notifications_for_user(user).await.unwrap().len(), 1);
    }
    assert!(h.service.list_notifications_for_user("devika").await.unwrap().is_empty());

    let nearby = h
        .service
        .list_nearby_outbreaks(village.lat, village.lon, 50.0)
        .await
        .unwrap();
    assert_eq!(nearby.len(), 1);
    let d = nearby[0].distance_km;
    assert_eq!(d, (d * 10.0).round() / 10.0, "distance is rounded to one decimal");
}

// =============================================================================
// Ineligible reports
// =============================================================================

#[tokio::test]
async fn healthy_or_unnamed_reports_never_trigger_evaluation() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);

    for _ in 0..CLUSTER_THRESHOLD + 3 {
        submit_and_settle(&h, scan("Healthy", "Potato", field, Utc::now())).await;
        submit_and_settle(&h, scan("", "Potato", field, Utc::now())).await;
    }

    assert!(h.outbreaks.list_all().await.is_empty());
    assert_eq!(h.notifications.len().await, 0);
}

#[tokio::test]
async fn reports_without_a_location_fix_never_trigger_evaluation() {
    let h = harness();

    for _ in 0..CLUSTER_THRESHOLD + 3 {
        submit_and_settle(
            &h,
            scan("Late Blight", "Potato", GeoPoint::new(0.0, 0.0), Utc::now()),
        )
        .await;
    }

    assert!(h.outbreaks.list_all().await.is_empty());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_disease_reports_create_one_outbreak() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);
    h.monitor
        .report_user_location("farmer-1", field.lat, field.lon)
        .await
        .unwrap();

    // Race the submissions: many evaluations will cross the threshold at
    // once, and all of them will find "no active outbreak nearby" unless
    // the upsert is serialized.
    let mut joins = Vec::new();
    for _ in 0..CLUSTER_THRESHOLD + 5 {
        let monitor = h.monitor.clone();
        let input = scan("Late Blight", "Potato", field, Utc::now());
        joins.push(tokio::spawn(async move {
            monitor.submit_scan_report(input).await.unwrap();
        }));
    }
    for join in joins {
        join.await.unwrap();
    }
    h.monitor.wait_idle().await;

    let all = h.outbreaks.list_all().await;
    assert_eq!(all.len(), 1, "the dedup race must not duplicate outbreaks");
    assert_eq!(all[0].status, OutbreakStatus::Active);
    // Exactly one creation happened, so exactly one alert.
    assert_eq!(h.notifications.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finished_evaluations_leave_the_tracking_map_on_their_own() {
    let h = harness();
    let field = GeoPoint::new(25.3176, 82.9912);

    // Trivially-skipped reports finish evaluation almost immediately, often
    // before the submitter gets to track the task handle.
    for _ in 0..500 {
        h.monitor
            .submit_scan_report(scan("Healthy", "Potato", field, Utc::now()))
            .await
            .unwrap();
    }

    // No wait_idle: the daemon never drains, so self-removal alone must
    // empty the map.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let pending = h.monitor.pending_evaluations().await;
        if pending == 0 {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "finished evaluations still tracked: {pending}"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

// =============================================================================
// Manual outbreak reports
// =============================================================================

#[tokio::test]
async fn manual_outbreak_alerts_and_absorbs_later_clusters() {
    let h = harness();
    let field = GeoPoint::new(26.8467, 80.9462);
    h.monitor
        .report_user_location("farmer-1", field.lat, field.lon)
        .await
        .unwrap();

    let outcome = h
        .monitor
        .submit_outbreak_report("Powdery Mildew", "Wheat", Severity::Mild, field.lat, field.lon)
        .await
        .unwrap();
    assert!(matches!(outcome, UpsertOutcome::Created(_)));
    assert_eq!(h.notifications.len().await, 1);

    // A machine-declared cluster at the same spot updates the manual
    // outbreak rather than duplicating it, and does not re-notify.
    for _ in 0..CLUSTER_THRESHOLD {
        submit_and_settle(&h, scan("Powdery Mildew", "Wheat", field, Utc::now())).await;
    }

    let all = h.outbreaks.list_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].severity, Severity::Severe);
    assert_eq!(all[0].report_count, CLUSTER_THRESHOLD as i32);
    assert_eq!(h.notifications.len().await, 1);
}
