//! The default policy set.
//!
//! Two heuristics (anti-loop, message length) and two natural-language
//! rubrics (relevance, toxicity). Toxicity sits at the critical priority so
//! a toxic message never reaches lower-priority evaluation.

use parley_types::envelope::Envelope;

use crate::similarity::jaccard;
use crate::validator::EvaluationContext;

use super::policy::{Policy, Verdict};

/// A payload this similar to the sender's own previous payload is a stall.
const SELF_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Both same-sender pairs of an alternating four-message window must exceed
/// this for the ping-pong rule to fire.
const PAIR_SIMILARITY_THRESHOLD: f64 = 0.70;

/// The anti-loop rule needs at least this much history before it can fire.
const MIN_HISTORY: usize = 4;

/// Payload bounds for the message-length policy (characters); the boundary
/// values themselves pass.
const MIN_PAYLOAD_CHARS: usize = 10;
const MAX_PAYLOAD_CHARS: usize = 4000;

/// Detects a single agent stalling (restating its own last message) or two
/// agents stuck in mutual restatement.
///
/// Rule 1 compares the new payload against the sender's own most recent
/// payload. Rule 2 inspects the last four messages: a strict
/// sender->recipient->sender->recipient alternation where both same-sender
/// pairs are highly similar is a ping-pong neither rule 1 nor a single
/// message would catch. Both rules are O(1) given the bounded history window.
pub fn anti_loop() -> Policy {
    Policy::heuristic(
        "anti_loop",
        "Prevents agents from falling into repetitive conversation patterns",
        90,
        anti_loop_rule,
    )
    .with_guidance("Provide new information or take a different approach instead of restating.")
}

fn anti_loop_rule(envelope: &Envelope, context: &EvaluationContext) -> Result<Verdict, String> {
    let history = &context.history;
    if history.len() < MIN_HISTORY {
        return Ok(Verdict::Pass);
    }

    // Rule 1: the sender restating itself.
    if let Some(previous) = history.iter().rev().find(|m| m.sender == envelope.sender) {
        if jaccard(&envelope.payload, &previous.payload) > SELF_SIMILARITY_THRESHOLD {
            return Ok(Verdict::fail(
                "message too similar to previous message from this sender",
            ));
        }
    }

    // Rule 2: mutual restatement across an alternating window.
    let window = &history[history.len() - MIN_HISTORY..];
    let alternating = window[0].sender == envelope.sender
        && window[1].sender == envelope.recipient
        && window[2].sender == envelope.sender
        && window[3].sender == envelope.recipient;
    if alternating {
        let sender_pair = jaccard(&window[0].payload, &window[2].payload);
        let recipient_pair = jaccard(&window[1].payload, &window[3].payload);
        if sender_pair > PAIR_SIMILARITY_THRESHOLD && recipient_pair > PAIR_SIMILARITY_THRESHOLD {
            return Ok(Verdict::fail(
                "repetitive ping-pong pattern detected in this conversation",
            ));
        }
    }

    Ok(Verdict::Pass)
}

/// Rejects payloads under 10 characters (trimmed) or over 4000 characters.
pub fn message_length() -> Policy {
    Policy::heuristic(
        "message_length",
        "Ensures messages aren't too long or too short",
        50,
        |envelope, _context| {
            if envelope.payload.trim().chars().count() < MIN_PAYLOAD_CHARS {
                return Ok(Verdict::fail("message too short"));
            }
            if envelope.payload.chars().count() > MAX_PAYLOAD_CHARS {
                return Ok(Verdict::fail("message too long"));
            }
            Ok(Verdict::Pass)
        },
    )
    .with_guidance("Keep messages between 10 and 4000 characters.")
}

/// Natural-language rubric: stay on topic.
pub fn relevance() -> Policy {
    Policy::natural_language(
        "relevance",
        "Ensures messages are relevant to the task or topic",
        70,
        "The message must be relevant to the current task or topic of conversation. \
         It should not introduce completely unrelated topics without clear justification.",
    )
    .with_guidance("Tie your message back to the task at hand.")
}

/// Natural-language rubric: no harmful content. Critical priority.
pub fn toxicity() -> Policy {
    Policy::natural_language(
        "toxicity",
        "Prevents harmful or inappropriate content",
        100,
        "The message must not contain harmful, offensive, or inappropriate content. \
         This includes but is not limited to: hate speech, personal attacks, explicit \
         content, or anything that could be considered harmful to individuals or groups.",
    )
}

/// The full default policy set, ready to register.
pub fn default_policies() -> Vec<Policy> {
    vec![anti_loop(), message_length(), relevance(), toxicity()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
