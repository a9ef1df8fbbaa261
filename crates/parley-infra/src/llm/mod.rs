//! LLM-backed rubric evaluation.

pub mod openai;

pub use openai::OpenAiRubricEvaluator;
