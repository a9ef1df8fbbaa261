//! Telemetry event distribution for the message path.

pub mod bus;

pub use bus::EventBus;
