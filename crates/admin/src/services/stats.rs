//! Dashboard snapshot reconciliation.
//!
//! The reconciler runs a fixed batch of independent reads concurrently and
//! publishes a freshly built [`DashboardSnapshot`] on a watch channel. Each
//! slice degrades independently: a failed query yields the zero value for
//! its slice only, never a stale carry-over and never a failed snapshot.
//!
//! Refreshes are silent - the previous snapshot stays visible until the new
//! one replaces it wholesale. Triggers: the first loop pass, the fixed poll
//! period, and explicit kicks from the refresh handle (workflow mutations,
//! and collection change notifications relayed by the host's realtime
//! feed). Two overlapping refreshes resolve last-write-wins; with full
//! replacement and idempotent reads the loser only costs a slightly older
//! snapshot until the next pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use campus_trade_core::{ApplicationStatus, Role};
use chrono::{DateTime, Days, Utc};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::backend::{AdminBackend, BackendError};
use crate::models::{
    ApplicationCounts, DashboardSnapshot, DayBucket, DepartmentCount, PlatformSetting,
    ProductCounts, RoleCounts,
};

use super::sms::SmsClient;

/// Default poll period between unprompted refreshes.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(30);

/// Trailing window for the signup growth chart.
const GROWTH_WINDOW_DAYS: u32 = 7;

/// Departments shown on the distribution card.
const TOP_DEPARTMENTS: usize = 6;

/// Requests an out-of-band refresh on the running reconciler.
///
/// Cloneable and cheap; workflow mutations hold one and kick it after every
/// successful write.
#[derive(Debug, Clone, Default)]
pub struct RefreshHandle {
    notify: Arc<Notify>,
}

impl RefreshHandle {
    /// Ask the reconciler to rebuild the snapshot now.
    pub fn kick(&self) {
        self.notify.notify_one();
    }
}

/// Periodic dashboard snapshot builder.
pub struct StatsReconciler<B> {
    backend: B,
    sms: Option<SmsClient>,
    period: Duration,
    refresh: RefreshHandle,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
}

impl<B: AdminBackend + 'static> StatsReconciler<B> {
    /// Create a reconciler with the default poll period.
    ///
    /// Returns the reconciler and the receiving side of its snapshot
    /// channel, pre-seeded with an empty snapshot.
    pub fn new(backend: B, sms: Option<SmsClient>) -> (Self, watch::Receiver<DashboardSnapshot>) {
        Self::with_period(backend, sms, DEFAULT_POLL_PERIOD)
    }

    /// Create a reconciler with a custom poll period.
    pub fn with_period(
        backend: B,
        sms: Option<SmsClient>,
        period: Duration,
    ) -> (Self, watch::Receiver<DashboardSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());
        (
            Self {
                backend,
                sms,
                period,
                refresh: RefreshHandle::default(),
                snapshot_tx,
            },
            snapshot_rx,
        )
    }

    /// Handle for requesting out-of-band refreshes.
    #[must_use]
    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.clone()
    }

    /// Run the refresh loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Refresh loop. The first pass runs immediately (initial load), then
    /// the poll period and explicit kicks interleave.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.refresh.notify.notified() => {}
            }
            let snapshot = self.collect().await;
            if self.snapshot_tx.send(snapshot).is_err() {
                debug!("All snapshot receivers dropped, stopping stats loop");
                return;
            }
        }
    }

    /// Build one snapshot from scratch. Every read runs concurrently and
    /// fails independently.
    #[instrument(skip(self))]
    pub async fn collect(&self) -> DashboardSnapshot {
        let (
            buyers,
            sellers,
            publishers,
            admins,
            pending,
            approved,
            rejected,
            products_total,
            products_active,
            signups,
            departments,
            settings,
            sms_balance,
        ) = tokio::join!(
            self.backend.count_identities_with_roles(&[Role::Buyer]),
            self.backend
                .count_identities_with_roles(&[Role::Seller, Role::PublisherSeller]),
            self.backend
                .count_identities_with_roles(&[Role::NewsPublisher, Role::PublisherSeller]),
            self.backend
                .count_identities_with_roles(&[Role::Admin, Role::SuperAdmin]),
            self.backend.count_applications(ApplicationStatus::Pending),
            self.backend.count_applications(ApplicationStatus::Approved),
            self.backend.count_applications(ApplicationStatus::Rejected),
            self.backend.count_products(false),
            self.backend.count_products(true),
            self.backend.recent_signups(GROWTH_WINDOW_DAYS),
            self.backend.list_departments(),
            self.backend.list_platform_settings(),
            self.fetch_sms_balance(),
        );

        let (maintenance_mode, registrations_open) =
            settings_flags(&zero_on_error("platform_settings", settings));

        DashboardSnapshot {
            roles: RoleCounts {
                buyers: zero_on_error("buyers", buyers),
                sellers: zero_on_error("sellers", sellers),
                publishers: zero_on_error("publishers", publishers),
                admins: zero_on_error("admins", admins),
            },
            applications: ApplicationCounts {
                pending: zero_on_error("pending_applications", pending),
                approved: zero_on_error("approved_applications", approved),
                rejected: zero_on_error("rejected_applications", rejected),
            },
            products: ProductCounts {
                total: zero_on_error("products_total", products_total),
                active: zero_on_error("products_active", products_active),
            },
            sms_balance,
            signup_growth: bucket_signups(
                &zero_on_error("recent_signups", signups),
                GROWTH_WINDOW_DAYS,
                Utc::now(),
            ),
            top_departments: top_departments(zero_on_error("departments", departments)),
            maintenance_mode,
            registrations_open,
            refreshed_at: Utc::now(),
        }
    }

    async fn fetch_sms_balance(&self) -> i64 {
        let Some(sms) = &self.sms else {
            return 0;
        };
        match sms.balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(slice = "sms_balance", error = %e, "Dashboard query failed, zeroing slice");
                0
            }
        }
    }
}

/// Collapse one slice's failure to its zero value, keeping the rest of the
/// snapshot intact.
fn zero_on_error<T: Default>(slice: &str, result: Result<T, BackendError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(slice, error = %e, "Dashboard query failed, zeroing slice");
            T::default()
        }
    }
}

/// Read the two boolean flags off the settings rows, with their documented
/// defaults when a row is missing or malformed.
fn settings_flags(settings: &[PlatformSetting]) -> (bool, bool) {
    let flag = |key: &str, default: bool| {
        settings
            .iter()
            .find(|s| s.key == key)
            .and_then(|s| s.value.as_bool())
            .unwrap_or(default)
    };
    (flag("maintenance_mode", false), flag("registrations_open", true))
}

/// Bucket raw signup timestamps into one entry per calendar day over the
/// trailing window, oldest first. Days without signups appear with a zero
/// count so the chart axis stays continuous.
#[must_use]
pub fn bucket_signups(
    timestamps: &[DateTime<Utc>],
    days: u32,
    now: DateTime<Utc>,
) -> Vec<DayBucket> {
    let today = now.date_naive();
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|day| DayBucket {
            day: day.format("%b %-d").to_string(),
            count: timestamps
                .iter()
                .filter(|ts| ts.date_naive() == day)
                .count() as u64,
        })
        .collect()
}

/// Aggregate department declarations and keep the largest six, descending
/// by count with name as the tie-breaker.
#[must_use]
pub fn top_departments(departments: Vec<String>) -> Vec<DepartmentCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for department in departments {
        *counts.entry(department).or_default() += 1;
    }
    let mut ranked: Vec<DepartmentCount> = counts
        .into_iter()
        .map(|(department, count)| DepartmentCount { department, count })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.department.cmp(&b.department))
    });
    ranked.truncate(TOP_DEPARTMENTS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn signups_bucket_by_calendar_day_oldest_first() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).single().expect("valid date");
        let timestamps = vec![
            Utc.with_ymd_and_hms(2025, 9, 4, 8, 30, 0).single().expect("valid date"),
            Utc.with_ymd_and_hms(2025, 9, 4, 21, 0, 0).single().expect("valid date"),
            Utc.with_ymd_and_hms(2025, 9, 6, 1, 0, 0).single().expect("valid date"),
        ];

        let buckets = bucket_signups(&timestamps, 3, now);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0], DayBucket { day: "Sep 4".to_string(), count: 2 });
        assert_eq!(buckets[1], DayBucket { day: "Sep 5".to_string(), count: 0 });
        assert_eq!(buckets[2], DayBucket { day: "Sep 6".to_string(), count: 1 });
    }

    #[test]
    fn signups_outside_window_are_not_counted() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).single().expect("valid date");
        let timestamps = vec![
            Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).single().expect("valid date"),
        ];
        let total: u64 = bucket_signups(&timestamps, 3, now).iter().map(|b| b.count).sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn departments_keep_top_six_descending() {
        let mut declared = Vec::new();
        for (name, n) in [
            ("Physics", 9),
            ("History", 2),
            ("Math", 7),
            ("Biology", 4),
            ("Chemistry", 4),
            ("Economics", 3),
            ("Drama", 1),
            ("Music", 5),
        ] {
            declared.extend(std::iter::repeat_n(name.to_string(), n));
        }

        let ranked = top_departments(declared);
        assert_eq!(ranked.len(), 6);
        assert_eq!(ranked[0].department, "Physics");
        assert_eq!(ranked[1].department, "Math");
        assert_eq!(ranked[2].department, "Music");
        // Equal counts break ties alphabetically.
        assert_eq!(ranked[3].department, "Biology");
        assert_eq!(ranked[4].department, "Chemistry");
        assert_eq!(ranked[5].department, "Economics");
    }

    #[test]
    fn settings_flags_fall_back_to_defaults() {
        assert_eq!(settings_flags(&[]), (false, true));

        let rows = vec![
            PlatformSetting { key: "maintenance_mode".to_string(), value: json!(true) },
            PlatformSetting { key: "registrations_open".to_string(), value: json!(false) },
        ];
        assert_eq!(settings_flags(&rows), (true, false));

        let malformed = vec![PlatformSetting {
            key: "registrations_open".to_string(),
            value: json!("yes"),
        }];
        assert_eq!(settings_flags(&malformed), (false, true));
    }
}
