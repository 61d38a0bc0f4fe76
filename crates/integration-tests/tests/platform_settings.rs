//! Platform settings flag writes: persistence, audit trail, and the silent
//! dashboard refresh they trigger.

use std::time::Duration;

use campus_trade_admin::models::ActionKind;
use campus_trade_admin::services::StatsReconciler;
use campus_trade_admin::services::settings::apply_setting;
use serde_json::json;

use campus_trade_integration_tests::MockBackend;

#[tokio::test]
async fn setting_write_is_persisted_audited_and_refreshes() {
    let backend = MockBackend::default();
    let (reconciler, mut rx) = StatsReconciler::with_period(
        backend.clone(),
        None,
        Duration::from_secs(3600),
    );
    let refresh = reconciler.refresh_handle();
    let task = reconciler.spawn();

    // Initial load.
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("initial load")
        .expect("reconciler alive");
    assert!(!rx.borrow_and_update().maintenance_mode);

    apply_setting(&backend, None, &refresh, "maintenance_mode", json!(true))
        .await
        .expect("setting write succeeds");

    backend.with_state(|s| {
        assert_eq!(s.settings.len(), 1);
        assert_eq!(s.settings[0].value, json!(true));
        assert_eq!(s.activity.len(), 1);
        assert_eq!(s.activity[0].action, ActionKind::SettingChanged);
        assert_eq!(s.activity[0].detail["key"], "maintenance_mode");
    });

    // The kicked refresh lands well before the hourly poll.
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("kicked refresh")
        .expect("reconciler alive");
    assert!(rx.borrow_and_update().maintenance_mode);

    task.abort();
}

#[tokio::test]
async fn failed_setting_write_skips_audit_and_refresh() {
    let backend = MockBackend::default();
    let (reconciler, _rx) = StatsReconciler::new(backend.clone(), None);
    let refresh = reconciler.refresh_handle();

    backend.fail_on("set_platform_setting");
    let result = apply_setting(&backend, None, &refresh, "registrations_open", json!(false)).await;
    assert!(result.is_err());

    backend.with_state(|s| {
        assert!(s.settings.is_empty());
        assert!(s.activity.is_empty());
    });
}

#[tokio::test]
async fn setting_write_upserts_on_key() {
    let backend = MockBackend::default();
    let (reconciler, _rx) = StatsReconciler::new(backend.clone(), None);
    let refresh = reconciler.refresh_handle();

    apply_setting(&backend, None, &refresh, "registrations_open", json!(false))
        .await
        .expect("first write");
    apply_setting(&backend, None, &refresh, "registrations_open", json!(true))
        .await
        .expect("second write");

    backend.with_state(|s| {
        assert_eq!(s.settings.len(), 1, "writes key the same row");
        assert_eq!(s.settings[0].value, json!(true));
    });
}
