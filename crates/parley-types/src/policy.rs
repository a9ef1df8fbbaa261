//! Policy-pipeline value types shared across layers.
//!
//! The `Policy` itself (with its heuristic closures) lives in `parley-core`;
//! this module holds the serializable pieces: violation records, the rubric
//! verdict returned by natural-language evaluators, and the policy kind tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority at or above which a violation halts further policy evaluation
/// for that message.
pub const CRITICAL_PRIORITY: i32 = 100;

/// How a policy is evaluated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Deterministic local predicate.
    Heuristic,
    /// Rubric text delegated to an inference service.
    NaturalLanguage,
}

/// Append-only record of a policy failing a message.
///
/// Never mutated after creation; queryable by policy name with a bounded
/// result count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Name of the policy that failed the message.
    pub policy_name: String,
    /// Why the policy failed it.
    pub reason: String,
    /// When the violation was logged.
    pub occurred_at: DateTime<Utc>,
}

impl PolicyViolation {
    pub fn new(policy_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            policy_name: policy_name.into(),
            reason: reason.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Structured verdict from a natural-language policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricVerdict {
    /// Whether the message complies with the rubric.
    pub passed: bool,
    /// Reasoning behind a negative verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
