//! Derived dashboard snapshot.
//!
//! The snapshot is never persisted: every refresh rebuilds it from scratch
//! and replaces the previous one wholesale. There is no incremental merge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Identity counts bucketed by capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub buyers: u64,
    /// Seller class: `seller` and `publisher_seller`.
    pub sellers: u64,
    /// Publisher class: `news_publisher` and `publisher_seller`.
    pub publishers: u64,
    /// Admin class: `admin` and `super_admin`.
    pub admins: u64,
}

/// Application counts by review status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

/// Product counts by listing state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCounts {
    pub total: u64,
    pub active: u64,
}

/// One calendar day of signup growth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    /// Locale-formatted month/day label, e.g. "Sep 4".
    pub day: String,
    pub count: u64,
}

/// One department's share of the identity population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: u64,
}

/// A platform settings row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSetting {
    pub key: String,
    pub value: JsonValue,
}

/// Full dashboard aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub roles: RoleCounts,
    pub applications: ApplicationCounts,
    pub products: ProductCounts,
    /// Remaining SMS provider balance (0 when unavailable).
    pub sms_balance: i64,
    /// Signup counts bucketed by calendar day, oldest first.
    pub signup_growth: Vec<DayBucket>,
    /// Top departments by identity count (at most 6, descending).
    pub top_departments: Vec<DepartmentCount>,
    pub maintenance_mode: bool,
    pub registrations_open: bool,
    pub refreshed_at: DateTime<Utc>,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            roles: RoleCounts::default(),
            applications: ApplicationCounts::default(),
            products: ProductCounts::default(),
            sms_balance: 0,
            signup_growth: Vec::new(),
            top_departments: Vec::new(),
            maintenance_mode: false,
            registrations_open: true,
            refreshed_at: Utc::now(),
        }
    }
}
