//! Token-set Jaccard similarity for the anti-loop policy.
//!
//! The metric is deliberately cheap and deterministic: payloads are lowered,
//! split on non-alphanumeric boundaries, and compared as word sets. The
//! thresholds applied to the score live with the policy, not here.

use std::collections::HashSet;

/// Jaccard similarity of the word-token sets of two payloads, in `0.0..=1.0`.
///
/// Two empty payloads are considered identical (score 1.0).
pub fn jaccard(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

/// Lowercased alphanumeric word tokens of a payload.
fn tokenize(payload: &str) -> HashSet<String> {
    payload
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_payloads_score_one() {
        assert_eq!(jaccard("send the report", "send the report"), 1.0);
    }

    #[test]
    fn disjoint_payloads_score_zero() {
        assert_eq!(jaccard("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        assert_eq!(jaccard("Send the REPORT!", "send, the report."), 1.0);
    }

    #[test]
    fn partial_overlap_scores_between() {
        // {the, server, is, down} vs {the, server, is, up}: 3 shared of 5 total
        let score = jaccard("the server is down", "the server is up");
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_payloads_are_identical() {
        assert_eq!(jaccard("", ""), 1.0);
        assert_eq!(jaccard("", "something"), 0.0);
    }

    #[test]
    fn repeated_words_count_once() {
        // Token sets, not bags: repetition does not change the score
        assert_eq!(jaccard("go go go", "go"), 1.0);
    }
}
