//! Domain models for the admin console.
//!
//! # Models
//!
//! - `application` - seller applications under review
//! - `identity` - marketplace identities (applicants, operators)
//! - `profile` - provisioned seller profiles
//! - `activity` - append-only activity log entries
//! - `dashboard` - derived dashboard snapshot (never persisted)

pub mod activity;
pub mod application;
pub mod dashboard;
pub mod identity;
pub mod profile;

pub use activity::{ActionKind, ActivityLogDraft};
pub use application::SellerApplication;
pub use dashboard::{
    ApplicationCounts, DashboardSnapshot, DayBucket, DepartmentCount, PlatformSetting,
    ProductCounts, RoleCounts,
};
pub use identity::Identity;
pub use profile::SellerProfileDraft;
