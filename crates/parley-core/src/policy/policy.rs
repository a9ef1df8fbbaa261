//! A named, prioritized rule a message must satisfy to be delivered.
//!
//! `Policy.rule` is a tagged variant rather than an "anything callable"
//! field, so evaluation dispatch is exhaustive: a policy is either a local
//! heuristic predicate or a natural-language rubric delegated to an
//! inference service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use parley_types::envelope::Envelope;
use parley_types::policy::PolicyKind;

use crate::validator::EvaluationContext;

/// Outcome of one policy judging one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail { reason: String },
}

impl Verdict {
    /// Shorthand for a failing verdict.
    pub fn fail(reason: impl Into<String>) -> Self {
        Verdict::Fail {
            reason: reason.into(),
        }
    }
}

/// A heuristic predicate: pure, synchronous, no I/O.
///
/// Returns `Err` for an internal fault, which the pipeline treats as
/// "policy errored, not violated".
pub type HeuristicFn =
    dyn Fn(&Envelope, &EvaluationContext) -> Result<Verdict, String> + Send + Sync;

/// How a policy judges a message.
#[derive(Clone)]
pub enum PolicyRule {
    /// Deterministic local predicate.
    Heuristic(Arc<HeuristicFn>),
    /// Rubric text delegated to a rubric evaluator.
    NaturalLanguage { rubric: String },
}

/// A named, prioritized, enable/disable-able message rule.
///
/// `enabled` is atomic so it can be toggled at runtime through the shared
/// registry without rebuilding the policy or losing violation history.
pub struct Policy {
    name: String,
    description: String,
    rule: PolicyRule,
    guidance: Option<String>,
    enabled: AtomicBool,
    priority: i32,
}

impl Policy {
    /// Create a heuristic policy from a local predicate.
    pub fn heuristic<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        priority: i32,
        predicate: F,
    ) -> Self
    where
        F: Fn(&Envelope, &EvaluationContext) -> Result<Verdict, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            rule: PolicyRule::Heuristic(Arc::new(predicate)),
            guidance: None,
            enabled: AtomicBool::new(true),
            priority,
        }
    }

    /// Create a natural-language policy from a rubric.
    pub fn natural_language(
        name: impl Into<String>,
        description: impl Into<String>,
        priority: i32,
        rubric: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rule: PolicyRule::NaturalLanguage {
                rubric: rubric.into(),
            },
            guidance: None,
            enabled: AtomicBool::new(true),
            priority,
        }
    }

    /// Attach remediation guidance included in rejection notices.
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    /// Start the policy disabled.
    pub fn disabled(self) -> Self {
        self.enabled.store(false, Ordering::SeqCst);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn guidance(&self) -> Option<&str> {
        self.guidance.as_deref()
    }

    pub fn rule(&self) -> &PolicyRule {
        &self.rule
    }

    pub fn kind(&self) -> PolicyKind {
        match self.rule {
            PolicyRule::Heuristic(_) => PolicyKind::Heuristic,
            PolicyRule::NaturalLanguage { .. } => PolicyKind::NaturalLanguage,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Policy")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("priority", &self.priority)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Snapshot of one registered policy for listing and observability.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyInfo {
    pub name: String,
    pub description: String,
    pub kind: PolicyKind,
    pub priority: i32,
    pub enabled: bool,
}

impl From<&Policy> for PolicyInfo {
    fn from(policy: &Policy) -> Self {
        Self {
            name: policy.name.clone(),
            description: policy.description.clone(),
            kind: policy.kind(),
            priority: policy.priority,
            enabled: policy.is_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_policy_reports_kind() {
        let policy = Policy::heuristic("always", "passes everything", 10, |_, _| Ok(Verdict::Pass));
        assert_eq!(policy.kind(), PolicyKind::Heuristic);
        assert!(policy.is_enabled());
    }

    #[test]
    fn natural_language_policy_reports_kind() {
        let policy = Policy::natural_language("tone", "professional tone", 70, "Be professional.");
        assert_eq!(policy.kind(), PolicyKind::NaturalLanguage);
    }

    #[test]
    fn enabled_toggles_in_place() {
        let policy = Policy::heuristic("p", "d", 0, |_, _| Ok(Verdict::Pass));
        policy.set_enabled(false);
        assert!(!policy.is_enabled());
        policy.set_enabled(true);
        assert!(policy.is_enabled());
    }

    #[test]
    fn disabled_builder_starts_off() {
        let policy = Policy::heuristic("p", "d", 0, |_, _| Ok(Verdict::Pass)).disabled();
        assert!(!policy.is_enabled());
    }

    #[test]
    fn info_snapshot_reflects_policy() {
        let policy = Policy::natural_language("tone", "professional tone", 70, "Be professional.")
            .with_guidance("Rephrase formally.");
        let info = PolicyInfo::from(&policy);
        assert_eq!(info.name, "tone");
        assert_eq!(info.priority, 70);
        assert!(info.enabled);
        assert_eq!(policy.guidance(), Some("Rephrase formally."));
    }
}
