//! Validator configuration, including natural-language model selection.
//!
//! Model selection is an explicit configuration object rather than ambient
//! environment lookups: [`ValidatorConfig::resolve_model`] walks the override
//! chain with ordered field lookups, first match wins.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Model used for natural-language policies when nothing else is configured.
pub const DEFAULT_RUBRIC_MODEL: &str = "gpt-4o-mini";

fn default_timeout_secs() -> u64 {
    30
}

fn default_history_window() -> u32 {
    10
}

/// Configuration for the policy validation pipeline.
///
/// Deserialized from `parley.toml`; every field has a default so a missing
/// or partial file still yields a working pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Model bound to this validator instance (strongest override).
    #[serde(default)]
    pub validator_model: Option<String>,

    /// Per-policy model overrides, keyed by policy name.
    #[serde(default)]
    pub policy_models: HashMap<String, String>,

    /// General-purpose model for natural-language policies.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Upper bound on a single rubric evaluation call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How many recent envelopes of a sender/recipient pair are loaded into
    /// the evaluation context.
    #[serde(default = "default_history_window")]
    pub history_window: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            validator_model: None,
            policy_models: HashMap::new(),
            default_model: None,
            request_timeout_secs: default_timeout_secs(),
            history_window: default_history_window(),
        }
    }
}

impl ValidatorConfig {
    /// Resolve the model for one policy, first match wins:
    /// validator-bound model, per-policy override, general default,
    /// then [`DEFAULT_RUBRIC_MODEL`].
    pub fn resolve_model(&self, policy_name: &str) -> &str {
        if let Some(model) = self.validator_model.as_deref() {
            return model;
        }
        if let Some(model) = self.policy_models.get(policy_name) {
            return model;
        }
        if let Some(model) = self.default_model.as_deref() {
            return model;
        }
        DEFAULT_RUBRIC_MODEL
    }

    /// Rubric call timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
