//! OpenAiRubricEvaluator -- concrete [`RubricEvaluator`] for OpenAI-compatible
//! chat completion APIs.
//!
//! Builds a compliance prompt from the rubric, the envelope under evaluation,
//! and the recent conversation, then parses the model's structured
//! `COMPLIANCE: YES/NO` answer into a [`RubricVerdict`].
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use parley_core::llm::{RubricEvaluator, RubricRequest};
use parley_types::error::LlmError;
use parley_types::policy::RubricVerdict;

/// Rubric evaluator backed by an OpenAI-compatible `/v1/chat/completions`
/// endpoint.
pub struct OpenAiRubricEvaluator {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiRubricEvaluator {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://api.openai.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// OpenAiRubricEvaluator intentionally does NOT derive Debug; the SecretString
// field keeps the key out of Debug output, and omitting Debug entirely keeps
// it out of everything else.

impl RubricEvaluator for OpenAiRubricEvaluator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn evaluate_rubric(&self, request: &RubricRequest) -> Result<RubricVerdict, LlmError> {
        let body = ChatRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::AuthenticationFailed,
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(format!("failed to parse response: {e}")))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| LlmError::MalformedResponse("response had no choices".to_string()))?;

        parse_verdict(content)
    }
}

/// Build the compliance prompt for one rubric evaluation.
///
/// The format pins the model to a parseable `COMPLIANCE: YES/NO` answer and
/// instructs it to resolve doubt toward non-compliance.
fn build_prompt(request: &RubricRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are evaluating if a message complies with a policy.\n\n");
    prompt.push_str(&format!("POLICY: {}\n\n", request.rubric));
    prompt.push_str(&format!("MESSAGE FROM: {}\n", request.envelope.sender));
    prompt.push_str(&format!("MESSAGE TO: {}\n", request.envelope.recipient));
    prompt.push_str(&format!("MESSAGE CONTENT: {}\n\n", request.envelope.payload));

    if !request.history.is_empty() {
        prompt.push_str("RECENT CONVERSATION (oldest first):\n");
        for msg in &request.history {
            prompt.push_str(&format!("  {} -> {}: {}\n", msg.sender, msg.recipient, msg.payload));
        }
        prompt.push('\n');
    }

    if !request.metadata.is_empty() {
        let mut keys: Vec<&String> = request.metadata.keys().collect();
        keys.sort();
        prompt.push_str("CONTEXT:\n");
        for key in keys {
            prompt.push_str(&format!("  {key}: {}\n", request.metadata[key]));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Does this message comply with the policy? Answer with YES or NO, followed by your reasoning.\n\
         Be strict in your evaluation. If there's any doubt, the message should not comply.\n\n\
         Format your response exactly as:\n\
         COMPLIANCE: YES/NO\n\
         REASON: Your detailed reasoning here\n",
    );
    prompt
}

/// Parse a model answer into a verdict.
///
/// Accepts only the requested `COMPLIANCE: YES/NO` format (case-insensitive).
/// Anything else is a [`LlmError::MalformedResponse`], which the pipeline
/// treats as an infrastructure failure rather than a violation.
fn parse_verdict(content: &str) -> Result<RubricVerdict, LlmError> {
    let upper = content.to_uppercase();
    if upper.contains("COMPLIANCE: YES") {
        return Ok(RubricVerdict {
            passed: true,
            reason: None,
        });
    }
    if upper.contains("COMPLIANCE: NO") {
        let reason = content
            .lines()
            .find_map(|line| {
                let trimmed = line.trim();
                trimmed
                    .get(..7)
                    .filter(|p| p.eq_ignore_ascii_case("REASON:"))
                    .map(|_| trimmed[7..].trim().to_string())
            })
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "message violates policy".to_string());
        return Ok(RubricVerdict {
            passed: false,
            reason: Some(reason),
        });
    }
    Err(LlmError::MalformedResponse(format!(
        "no COMPLIANCE marker in: {}",
        content.chars().take(120).collect::<String>()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use parley_types::envelope::Envelope;

    fn request_with(history: Vec<Envelope>) -> RubricRequest {
        RubricRequest {
            model: "gpt-4o-mini".to_string(),
            rubric: "Messages must stay on the topic of the active incident".to_string(),
            envelope: Envelope::direct("dispatcher", "medic", "patient is stable now"),
            history,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn prompt_contains_rubric_and_envelope() {
        let prompt = build_prompt(&request_with(Vec::new()));
        assert!(prompt.contains("POLICY: Messages must stay on the topic"));
        assert!(prompt.contains("MESSAGE FROM: dispatcher"));
        assert!(prompt.contains("MESSAGE TO: medic"));
        assert!(prompt.contains("MESSAGE CONTENT: patient is stable now"));
        assert!(prompt.contains("COMPLIANCE: YES/NO"));
        // No history section when history is empty.
        assert!(!prompt.contains("RECENT CONVERSATION"));
    }

    #[test]
    fn prompt_includes_history_oldest_first() {
        let history = vec![
            Envelope::direct("dispatcher", "medic", "what is the patient status"),
            Envelope::direct("medic", "dispatcher", "assessing now, stand by"),
        ];
        let prompt = build_prompt(&request_with(history));
        let first = prompt.find("dispatcher -> medic: what is the patient status").unwrap();
        let second = prompt.find("medic -> dispatcher: assessing now").unwrap();
        assert!(first < second);
    }

    #[test]
    fn parse_yes_passes() {
        let verdict = parse_verdict("COMPLIANCE: YES\nREASON: on topic").unwrap();
        assert!(verdict.passed);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn parse_no_extracts_reason() {
        let verdict =
            parse_verdict("COMPLIANCE: NO\nREASON: discusses weekend plans instead").unwrap();
        assert!(!verdict.passed);
        assert_eq!(
            verdict.reason.as_deref(),
            Some("discusses weekend plans instead")
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        let verdict = parse_verdict("compliance: no\nreason: off topic").unwrap();
        assert!(!verdict.passed);
        assert_eq!(verdict.reason.as_deref(), Some("off topic"));
    }

    #[test]
    fn parse_no_without_reason_uses_fallback() {
        let verdict = parse_verdict("COMPLIANCE: NO").unwrap();
        assert!(!verdict.passed);
        assert_eq!(verdict.reason.as_deref(), Some("message violates policy"));
    }

    #[test]
    fn parse_freeform_answer_is_malformed() {
        let err = parse_verdict("Sure, this message looks fine to me!").unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}
