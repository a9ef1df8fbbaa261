//! The policy model and evaluation pipeline.
//!
//! - `policy` -- the `Policy` type with its heuristic-or-rubric rule variant
//! - `manager` -- `PolicyManager` registry, ordering, and short-circuiting
//! - `builtin` -- the default policy set (anti-loop, length, relevance, toxicity)

pub mod builtin;
pub mod manager;
#[allow(clippy::module_inception)]
pub mod policy;

pub use manager::PolicyManager;
pub use policy::{Policy, PolicyInfo, PolicyRule, Verdict};
