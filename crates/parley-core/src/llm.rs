//! Rubric evaluator port for natural-language policies.
//!
//! Defines the `RubricEvaluator` trait implemented by inference-service
//! adapters in `parley-infra`, and `BoxRubricEvaluator` for dynamic dispatch.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition); the box wrapper
//! exists because RPITIT traits are not object-safe.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use parley_types::envelope::Envelope;
use parley_types::error::LlmError;
use parley_types::policy::RubricVerdict;

/// One natural-language policy evaluation request.
///
/// Carries everything an adapter needs to build its prompt: the rubric text,
/// the envelope under evaluation, and the conversation context.
#[derive(Debug, Clone)]
pub struct RubricRequest {
    /// Model resolved through the override chain for this policy.
    pub model: String,
    /// The policy's rubric text.
    pub rubric: String,
    /// The envelope being evaluated.
    pub envelope: Envelope,
    /// Recent history between the sender/recipient pair, oldest first.
    pub history: Vec<Envelope>,
    /// Caller-supplied key/value metadata.
    pub metadata: HashMap<String, String>,
}

/// Trait for inference-service backends that judge a message against a rubric.
///
/// Implementations live in parley-infra (e.g., `OpenAiRubricEvaluator`).
/// Network-bound; callers wrap every invocation in a timeout.
pub trait RubricEvaluator: Send + Sync {
    /// Human-readable evaluator name (e.g., "openai").
    fn name(&self) -> &str;

    /// Judge the request's envelope against its rubric.
    fn evaluate_rubric(
        &self,
        request: &RubricRequest,
    ) -> impl Future<Output = Result<RubricVerdict, LlmError>> + Send;
}

/// Object-safe version of [`RubricEvaluator`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch; a blanket
/// implementation is provided for all types implementing `RubricEvaluator`.
pub trait RubricEvaluatorDyn: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate_rubric_boxed<'a>(
        &'a self,
        request: &'a RubricRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RubricVerdict, LlmError>> + Send + 'a>>;
}

impl<T: RubricEvaluator> RubricEvaluatorDyn for T {
    fn name(&self) -> &str {
        RubricEvaluator::name(self)
    }

    fn evaluate_rubric_boxed<'a>(
        &'a self,
        request: &'a RubricRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RubricVerdict, LlmError>> + Send + 'a>> {
        Box::pin(self.evaluate_rubric(request))
    }
}

/// Type-erased rubric evaluator for runtime backend selection.
pub struct BoxRubricEvaluator {
    inner: Box<dyn RubricEvaluatorDyn + Send + Sync>,
}

impl BoxRubricEvaluator {
    /// Wrap a concrete `RubricEvaluator` in a type-erased box.
    pub fn new<T: RubricEvaluator + 'static>(evaluator: T) -> Self {
        Self {
            inner: Box::new(evaluator),
        }
    }

    /// Human-readable evaluator name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Judge the request's envelope against its rubric.
    pub async fn evaluate_rubric(
        &self,
        request: &RubricRequest,
    ) -> Result<RubricVerdict, LlmError> {
        self.inner.evaluate_rubric_boxed(request).await
    }
}
