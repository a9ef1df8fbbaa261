//! Policy registry, evaluation ordering, and critical short-circuiting.
//!
//! The registry is a copy-on-write collection: mutations swap a fresh
//! `Arc<Vec<...>>` under a short write lock, while `evaluate` clones the
//! current `Arc` and runs against that stable snapshot without holding any
//! lock across suspension points.

use std::cmp::Reverse;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, RwLock};

use parley_types::config::ValidatorConfig;
use parley_types::envelope::Envelope;
use parley_types::policy::{CRITICAL_PRIORITY, PolicyViolation};

use crate::llm::{BoxRubricEvaluator, RubricRequest};
use crate::validator::EvaluationContext;

use super::policy::{Policy, PolicyInfo, PolicyRule, Verdict};
use parley_types::error::RegistryError;

/// Holds the policy registry, orders and runs evaluation, and keeps the
/// append-only violation history.
pub struct PolicyManager {
    /// Copy-on-write policy list in registration order.
    registry: RwLock<Arc<Vec<Arc<Policy>>>>,
    /// Evaluator for natural-language policies; without one, those policies
    /// are skipped as errored (fail-open on missing infrastructure).
    evaluator: Option<BoxRubricEvaluator>,
    config: ValidatorConfig,
    /// Append-only violation log across all evaluation runs.
    violations: Mutex<Vec<PolicyViolation>>,
}

impl PolicyManager {
    /// Create a manager with no natural-language backend.
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            registry: RwLock::new(Arc::new(Vec::new())),
            evaluator: None,
            config,
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Attach a rubric evaluator for natural-language policies.
    pub fn with_evaluator(mut self, evaluator: BoxRubricEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Register a policy. Names are unique: a duplicate is rejected and the
    /// registry left unchanged.
    pub fn add(&self, policy: Policy) -> Result<(), RegistryError> {
        let mut guard = self.registry.write().expect("policy registry lock poisoned");
        if guard.iter().any(|p| p.name() == policy.name()) {
            return Err(RegistryError::DuplicateName(policy.name().to_string()));
        }
        let mut next = guard.as_ref().clone();
        next.push(Arc::new(policy));
        *guard = Arc::new(next);
        Ok(())
    }

    /// Remove a policy by name.
    pub fn remove(&self, name: &str) -> Result<(), RegistryError> {
        let mut guard = self.registry.write().expect("policy registry lock poisoned");
        if !guard.iter().any(|p| p.name() == name) {
            return Err(RegistryError::UnknownName(name.to_string()));
        }
        let next: Vec<Arc<Policy>> = guard
            .iter()
            .filter(|p| p.name() != name)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        Ok(())
    }

    /// Enable a policy by name. Toggling does not touch violation history.
    pub fn enable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, true)
    }

    /// Disable a policy by name.
    pub fn disable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let snapshot = self.snapshot();
        match snapshot.iter().find(|p| p.name() == name) {
            Some(policy) => {
                policy.set_enabled(enabled);
                Ok(())
            }
            None => Err(RegistryError::UnknownName(name.to_string())),
        }
    }

    /// Registered policies ordered by priority descending (stable tie-break:
    /// registration order).
    pub fn list(&self) -> Vec<PolicyInfo> {
        let mut infos: Vec<PolicyInfo> = self
            .snapshot()
            .iter()
            .map(|p| PolicyInfo::from(p.as_ref()))
            .collect();
        infos.sort_by_key(|info| Reverse(info.priority));
        infos
    }

    /// Remediation guidance for a policy, if it defines any.
    pub fn guidance_for(&self, name: &str) -> Option<String> {
        self.snapshot()
            .iter()
            .find(|p| p.name() == name)
            .and_then(|p| p.guidance().map(str::to_string))
    }

    /// Recent violations, newest last, optionally filtered by policy name
    /// and bounded by `limit`.
    pub fn get_violations(&self, limit: usize, policy_name: Option<&str>) -> Vec<PolicyViolation> {
        let log = self.violations.lock().expect("violation log lock poisoned");
        let filtered: Vec<&PolicyViolation> = log
            .iter()
            .filter(|v| policy_name.is_none_or(|name| v.policy_name == name))
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).cloned().collect()
    }

    /// Evaluate a message against all enabled policies.
    ///
    /// Policies run priority-descending with a stable registration-order
    /// tie-break. A failing policy at or above [`CRITICAL_PRIORITY`] stops
    /// iteration immediately; only that violation is returned. Evaluation
    /// errors (heuristic faults, rubric call failures) are logged, excluded
    /// from the violation set, and the remaining policies still run.
    ///
    /// An empty result means the message passes.
    pub async fn evaluate(
        &self,
        envelope: &Envelope,
        context: &EvaluationContext,
    ) -> Vec<PolicyViolation> {
        let mut ordered: Vec<Arc<Policy>> = self
            .snapshot()
            .iter()
            .filter(|p| p.is_enabled())
            .cloned()
            .collect();
        // Stable sort keeps registration order among equal priorities.
        ordered.sort_by_key(|p| Reverse(p.priority()));

        let mut run_violations = Vec::new();

        for policy in ordered {
            let outcome = match policy.rule() {
                PolicyRule::Heuristic(predicate) => {
                    self.run_heuristic(&policy, predicate, envelope, context)
                }
                PolicyRule::NaturalLanguage { rubric } => {
                    self.run_rubric(&policy, rubric, envelope, context).await
                }
            };

            let reason = match outcome {
                Some(Verdict::Fail { reason }) => reason,
                Some(Verdict::Pass) | None => continue,
            };

            let violation = PolicyViolation::new(policy.name(), reason);
            self.violations
                .lock()
                .expect("violation log lock poisoned")
                .push(violation.clone());
            run_violations.push(violation);

            if policy.priority() >= CRITICAL_PRIORITY {
                tracing::warn!(
                    policy = policy.name(),
                    priority = policy.priority(),
                    message_id = %envelope.message_id,
                    "critical policy violation, halting evaluation"
                );
                break;
            }
        }

        run_violations
    }

    /// Run a heuristic predicate, containing both `Err` returns and panics.
    /// `None` means the policy errored and is excluded from this run.
    fn run_heuristic(
        &self,
        policy: &Policy,
        predicate: &Arc<crate::policy::policy::HeuristicFn>,
        envelope: &Envelope,
        context: &EvaluationContext,
    ) -> Option<Verdict> {
        match catch_unwind(AssertUnwindSafe(|| (predicate.as_ref())(envelope, context))) {
            Ok(Ok(verdict)) => Some(verdict),
            Ok(Err(fault)) => {
                tracing::warn!(policy = policy.name(), %fault, "heuristic policy errored");
                None
            }
            Err(_) => {
                tracing::warn!(policy = policy.name(), "heuristic policy panicked");
                None
            }
        }
    }

    /// Delegate a rubric to the evaluator with a bounded timeout.
    /// `None` means the call errored; only an explicit negative verdict fails
    /// the message.
    async fn run_rubric(
        &self,
        policy: &Policy,
        rubric: &str,
        envelope: &Envelope,
        context: &EvaluationContext,
    ) -> Option<Verdict> {
        let Some(evaluator) = self.evaluator.as_ref() else {
            tracing::warn!(
                policy = policy.name(),
                "no rubric evaluator configured, skipping natural-language policy"
            );
            return None;
        };

        let request = RubricRequest {
            model: self.config.resolve_model(policy.name()).to_string(),
            rubric: rubric.to_string(),
            envelope: envelope.clone(),
            history: context.history.clone(),
            metadata: context.metadata.clone(),
        };

        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, evaluator.evaluate_rubric(&request)).await {
            Ok(Ok(verdict)) if verdict.passed => Some(Verdict::Pass),
            Ok(Ok(verdict)) => Some(Verdict::fail(
                verdict
                    .reason
                    .unwrap_or_else(|| format!("violated policy: {}", policy.name())),
            )),
            Ok(Err(err)) => {
                tracing::warn!(policy = policy.name(), error = %err, "rubric evaluation failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    policy = policy.name(),
                    timeout_secs = self.config.request_timeout_secs,
                    "rubric evaluation timed out"
                );
                None
            }
        }
    }

    fn snapshot(&self) -> Arc<Vec<Arc<Policy>>> {
        Arc::clone(&self.registry.read().expect("policy registry lock poisoned"))
    }
}

impl std::fmt::Debug for PolicyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyManager")
            .field("policies", &self.snapshot().len())
            .field("has_evaluator", &self.evaluator.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
