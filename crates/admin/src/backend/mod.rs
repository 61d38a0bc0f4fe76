//! Gateway to the hosted data backend.
//!
//! All requests converge on two calling conventions:
//!
//! 1. Direct table operations (`rest/v1/<collection>`) authorized by the
//!    caller's own ambient bearer identity and the backend's row-level
//!    policies - opaque to this crate, it either allows or denies.
//! 2. Named remote procedures (`rest/v1/rpc/<name>`) whose payload carries
//!    the shared bypass secret explicitly.
//!
//! [`AdminBackend`] is the single contract both conventions implement;
//! [`DualPathBackend`] picks one per call from the credential store. A
//! single call is atomic from the caller's point of view; multi-call
//! workflows are not (see `services::workflow` for the rollback policy).

pub mod client;
pub mod filter;
pub mod gateway;

pub use client::{BackendClient, BackendError};
pub use filter::Filter;
pub use gateway::{AdminBackend, ApplicationStatusUpdate, BypassPath, DualPathBackend, StandardPath};
