//! CampusTrade Core - Shared types library.
//!
//! This crate provides common types used across all CampusTrade components:
//! - `admin` - Administrative console for the campus marketplace
//! - future storefront and tooling crates
//!
//! # Architecture
//!
//! The core crate contains only types and pure policy - no I/O, no HTTP
//! clients, no backend access. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, roles with the merge policy, statuses, and
//!   contact types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
