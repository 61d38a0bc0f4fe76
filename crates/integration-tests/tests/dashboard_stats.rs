//! Stats reconciler tests against the in-memory backend.

use std::time::Duration;

use campus_trade_admin::services::StatsReconciler;
use campus_trade_core::Role;
use chrono::Utc;
use serde_json::json;

use campus_trade_integration_tests::{MockBackend, identity, pending_application};

fn seeded_backend() -> MockBackend {
    let backend = MockBackend::default();
    backend.with_state(|s| {
        s.identities.push(identity(1, Role::Buyer, "A"));
        s.identities.push(identity(2, Role::Buyer, "B"));
        s.identities.push(identity(3, Role::Seller, "C"));
        s.identities.push(identity(4, Role::PublisherSeller, "D"));
        s.identities.push(identity(5, Role::SuperAdmin, "E"));
        s.applications.push(pending_application(1, identity(1, Role::Buyer, "A").id, "X"));
        s.products_total = 12;
        s.products_active = 9;
        s.signups.push(Utc::now());
        s.signups.push(Utc::now());
        s.departments.push("Physics".to_string());
        s.departments.push("Physics".to_string());
        s.departments.push("Math".to_string());
        s.settings.push(campus_trade_admin::models::PlatformSetting {
            key: "maintenance_mode".to_string(),
            value: json!(true),
        });
    });
    backend
}

#[tokio::test]
async fn snapshot_reflects_every_slice() {
    let (reconciler, _rx) = StatsReconciler::new(seeded_backend(), None);
    let snapshot = reconciler.collect().await;

    assert_eq!(snapshot.roles.buyers, 2);
    assert_eq!(snapshot.roles.sellers, 2, "seller class includes publisher_seller");
    assert_eq!(snapshot.roles.publishers, 1);
    assert_eq!(snapshot.roles.admins, 1);
    assert_eq!(snapshot.applications.pending, 1);
    assert_eq!(snapshot.products.total, 12);
    assert_eq!(snapshot.products.active, 9);
    assert_eq!(snapshot.sms_balance, 0, "no provider configured");
    assert!(snapshot.maintenance_mode);
    assert!(snapshot.registrations_open, "missing flag keeps its default");

    let signups_today: u64 = snapshot.signup_growth.iter().map(|b| b.count).sum();
    assert_eq!(signups_today, 2);
    assert_eq!(snapshot.top_departments[0].department, "Physics");
    assert_eq!(snapshot.top_departments[0].count, 2);
}

#[tokio::test]
async fn one_failed_query_zeroes_only_its_slice() {
    let backend = seeded_backend();
    backend.fail_on("count_products");

    let (reconciler, _rx) = StatsReconciler::new(backend, None);
    let snapshot = reconciler.collect().await;

    // The failed slice degrades to zero rather than going stale or taking
    // the snapshot down with it.
    assert_eq!(snapshot.products.total, 0);
    assert_eq!(snapshot.products.active, 0);
    assert_eq!(snapshot.roles.buyers, 2);
    assert_eq!(snapshot.applications.pending, 1);
    assert!(snapshot.maintenance_mode);
}

#[tokio::test]
async fn kick_triggers_an_out_of_band_refresh() {
    let backend = seeded_backend();
    let (reconciler, mut rx) = StatsReconciler::with_period(
        backend.clone(),
        None,
        Duration::from_secs(3600),
    );
    let refresh = reconciler.refresh_handle();
    let task = reconciler.spawn();

    // First pass is the initial load.
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("initial load within timeout")
        .expect("reconciler alive");
    assert_eq!(rx.borrow_and_update().products.total, 12);

    // A mutation happened; the silent refresh picks it up long before the
    // hourly poll would.
    backend.with_state(|s| s.products_total = 20);
    refresh.kick();
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("kicked refresh within timeout")
        .expect("reconciler alive");
    assert_eq!(rx.borrow_and_update().products.total, 20);

    task.abort();
}
