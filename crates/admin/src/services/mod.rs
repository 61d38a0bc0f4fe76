//! Business logic services for the admin console.
//!
//! # Services
//!
//! - `workflow` - seller-application approval/rejection engine
//! - `stats` - dashboard snapshot reconciliation
//! - `presence` - live membership feed aggregation
//! - `settings` - platform settings flag writes
//! - `sms` - SMS provider client for outbound notifications
//! - `activity` - best-effort activity log writer

pub mod activity;
pub mod presence;
pub mod settings;
pub mod sms;
pub mod stats;
pub mod workflow;

pub use presence::{JoinNotice, PresenceAggregator, PresenceCounts, PresenceEvent, PresenceMember};
pub use sms::{SmsClient, SmsError, SmsMessage, SmsSender};
pub use stats::{RefreshHandle, StatsReconciler};
pub use workflow::{ApplicationStore, ApplicationWorkflow};
