//! Message validator: context assembly plus policy evaluation.
//!
//! A thin seam between the broker and the policy manager. The validator owns
//! the context-assembly policy (how much history is loaded, from where) so it
//! can change without touching evaluation logic.

use std::collections::HashMap;
use std::sync::Arc;

use parley_types::envelope::Envelope;
use parley_types::policy::PolicyViolation;

use crate::policy::manager::PolicyManager;
use crate::repository::MessageStore;

/// Ephemeral per-message evaluation input.
///
/// Rebuilt from store state on every evaluation; never persisted. A fixed
/// struct rather than an open-ended map keeps policy implementations
/// type-checked, with arbitrary caller data confined to `metadata`.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    /// Recent history between the sender/recipient pair, oldest first.
    pub history: Vec<Envelope>,
    /// Caller-supplied key/value metadata.
    pub metadata: HashMap<String, String>,
}

impl EvaluationContext {
    pub fn new(history: Vec<Envelope>) -> Self {
        Self {
            history,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of validating one envelope.
#[derive(Debug, Clone)]
pub struct Validation {
    pub valid: bool,
    pub violations: Vec<PolicyViolation>,
}

/// Binds a [`PolicyManager`] to a history source.
pub struct MessageValidator<S: MessageStore> {
    manager: Arc<PolicyManager>,
    store: Arc<S>,
    history_window: u32,
}

impl<S: MessageStore> MessageValidator<S> {
    pub fn new(manager: Arc<PolicyManager>, store: Arc<S>, history_window: u32) -> Self {
        Self {
            manager,
            store,
            history_window,
        }
    }

    pub fn manager(&self) -> &Arc<PolicyManager> {
        &self.manager
    }

    /// Assemble the evaluation context for an envelope and run the pipeline.
    ///
    /// A store failure degrades to an empty history rather than blocking the
    /// send path; history-dependent policies then pass.
    pub async fn validate(
        &self,
        envelope: &Envelope,
        metadata: HashMap<String, String>,
    ) -> Validation {
        let history = match self
            .store
            .history_between(&envelope.sender, &envelope.recipient, self.history_window)
            .await
        {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(
                    sender = envelope.sender,
                    recipient = envelope.recipient,
                    error = %err,
                    "history lookup failed, validating without history"
                );
                Vec::new()
            }
        };

        let context = EvaluationContext::new(history).with_metadata(metadata);
        let violations = self.manager.evaluate(envelope, &context).await;
        Validation {
            valid: violations.is_empty(),
            violations,
        }
    }
}
