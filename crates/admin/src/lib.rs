//! CampusTrade Admin - administrative console core.
//!
//! Library crate backing the `campus-trade-admin` binary. The UI layer is an
//! external collaborator; everything here is the service core it drives:
//!
//! - [`backend`] - gateway to the hosted data backend, supporting both the
//!   standard authenticated-identity path and the secret-authenticated
//!   bypass path behind one contract
//! - [`session`] - bypass credential lifecycle and the heartbeat monitor
//!   that continuously revalidates a bypass session
//! - [`services`] - the seller-application approval workflow, dashboard
//!   stats reconciliation, live presence aggregation, and SMS delivery
//! - [`models`] - domain records exchanged with the backend
//! - [`config`] / [`state`] / [`error`] - configuration, shared state, and
//!   the crate-level error type

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
