//! Policy selection: select an existing candidate, compose several, or fall
//! back to generation. A total decision table with no side effects;
//! `generate` is always available as the universal fallback.

use crate::discovery::ToolSpec;
use crate::intent::ParsedIntent;
use serde::{Deserialize, Serialize};

/// Margin below the threshold within which a runner-up still justifies
/// composition.
const COMPOSE_WINDOW: f64 = 0.05;

/// Score gap above which the best candidate is a clear winner.
const CLEAR_WINNER_GAP: f64 = 0.20;

/// Fulfillment strategy for one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Use the best candidate as-is.
    Select,
    /// Chain two or more candidates.
    Compose,
    /// Synthesize a new module via the local LLM.
    Generate,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Select => "select",
            Policy::Compose => "compose",
            Policy::Generate => "generate",
        }
    }
}

/// Decide how to fulfill the intent given ranked candidates and the
/// configured confidence threshold. Returns the policy plus a human-readable
/// justification.
pub fn choose_policy(
    _intent: &ParsedIntent,
    candidates: &[ToolSpec],
    threshold: f64,
) -> (Policy, String) {
    let Some(best) = candidates.first() else {
        return (
            Policy::Generate,
            "no suitable candidates; generating a new module".to_string(),
        );
    };

    if best.score < threshold {
        if candidates.len() >= 2 {
            let avg = (best.score + candidates[1].score) / 2.0;
            if avg >= threshold - COMPOSE_WINDOW {
                return (
                    Policy::Compose,
                    format!(
                        "two partial matches warrant composition (avg {:.2} within window of threshold {:.2})",
                        avg, threshold
                    ),
                );
            }
        }
        return (
            Policy::Generate,
            format!(
                "best candidate {:.2} below threshold {:.2}; generating",
                best.score, threshold
            ),
        );
    }

    if let Some(second) = candidates.get(1) {
        let gap = best.score - second.score;
        if gap >= CLEAR_WINNER_GAP {
            return (
                Policy::Select,
                format!("clear winner: gap {:.2} over runner-up", gap),
            );
        }
        if second.score >= threshold - COMPOSE_WINDOW {
            return (
                Policy::Compose,
                format!(
                    "top-2 above threshold window ({:.2}, {:.2})",
                    best.score, second.score
                ),
            );
        }
    }
    (
        Policy::Select,
        format!("top-1 above threshold ({:.2} >= {:.2})", best.score, threshold),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent() -> ParsedIntent {
        ParsedIntent {
            domain: Some("analysis".to_string()),
            action: Some("analyze_repository".to_string()),
            raw_text: "analyze".to_string(),
            confidence: 0.8,
        }
    }

    fn candidates(scores: &[f64]) -> Vec<ToolSpec> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ToolSpec {
                identifier: format!("tool://c{i}"),
                entry_point_name: "run".to_string(),
                declared_parameters: Vec::new(),
                documentation: String::new(),
                score,
            })
            .collect()
    }

    #[test]
    fn empty_candidates_fall_back_to_generate() {
        let (policy, reason) = choose_policy(&intent(), &[], 0.6);
        assert_eq!(policy, Policy::Generate);
        assert!(reason.contains("no suitable candidates"));
    }

    #[test]
    fn clear_winner_selects() {
        let (policy, reason) = choose_policy(&intent(), &candidates(&[0.85, 0.60]), 0.60);
        assert_eq!(policy, Policy::Select);
        assert!(reason.contains("clear winner"));
    }

    #[test]
    fn close_top_two_compose() {
        let (policy, _) = choose_policy(&intent(), &candidates(&[0.62, 0.58]), 0.60);
        assert_eq!(policy, Policy::Compose);
    }

    #[test]
    fn weak_candidates_generate() {
        let (policy, _) = choose_policy(&intent(), &candidates(&[0.45, 0.40]), 0.60);
        assert_eq!(policy, Policy::Generate);
    }

    #[test]
    fn partial_pair_below_threshold_composes() {
        // avg 0.575 >= 0.60 - 0.05
        let (policy, reason) = choose_policy(&intent(), &candidates(&[0.58, 0.57]), 0.60);
        assert_eq!(policy, Policy::Compose);
        assert!(reason.contains("partial matches"));
    }

    #[test]
    fn lone_strong_candidate_selects() {
        let (policy, _) = choose_policy(&intent(), &candidates(&[0.70]), 0.60);
        assert_eq!(policy, Policy::Select);
    }

    #[test]
    fn always_returns_some_policy() {
        for scores in [vec![], vec![0.0], vec![1.0, 1.0, 1.0], vec![0.31, 0.3, 0.29]] {
            let (policy, _) = choose_policy(&intent(), &candidates(&scores), 0.6);
            assert!(matches!(policy, Policy::Select | Policy::Compose | Policy::Generate));
        }
    }

    #[test]
    fn select_and_compose_respect_arity() {
        let (policy, _) = choose_policy(&intent(), &candidates(&[0.9]), 0.6);
        assert_ne!(policy, Policy::Compose);
        let (policy, _) = choose_policy(&intent(), &[], 0.6);
        assert_ne!(policy, Policy::Select);
    }
}
