//! Policy pipeline and message broker logic for Parley.
//!
//! This crate defines the "ports" (store and rubric-evaluator traits) that the
//! infrastructure layer implements, plus the broker itself. It depends only on
//! `parley-types` -- never on `parley-infra` or any database/HTTP crate.

pub mod broker;
pub mod event;
pub mod llm;
pub mod policy;
pub mod repository;
pub mod similarity;
pub mod validator;

pub use broker::{MessageBroker, SendOutcome};
pub use policy::manager::PolicyManager;
pub use validator::{EvaluationContext, MessageValidator, Validation};
