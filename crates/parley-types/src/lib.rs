//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley control
//! plane: Envelope, PolicyViolation, telemetry events, validator configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod envelope;
pub mod error;
pub mod event;
pub mod policy;
