//! Intent parsing: free text to a `(domain, action, confidence)` triple.
//!
//! Priority order: explicit `@path` references, then implicit "analyze/check
//! <token>" phrases, then keyword matching against registered workflows and
//! catalog tools. Parsing never fails; unmatched input degrades to a low
//! confidence rather than an error.

use crate::registry::{Registry, ToolDescriptor, Workflow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONF_EXPLICIT_PATH: f64 = 0.95;
pub const CONF_IMPLICIT_PATH: f64 = 0.90;
pub const CONF_IMPLICIT_MISSING: f64 = 0.75;
pub const CONF_NO_MATCH: f64 = 0.3;

/// Structured intent for one user turn. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub domain: Option<String>,
    pub action: Option<String>,
    pub raw_text: String,
    /// Heuristic confidence in [0,1].
    pub confidence: f64,
}

// `@C:\repo\x.py`, `@/srv/tool.py`, or a bare `@name.<src ext>` token.
static EXPLICIT_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@([A-Za-z]:\\\S+|/\S+|\S+\.(?:py|rs|js|ts|go|java|c|cpp|h))").unwrap()
});

// "analyze <token>", "check <token>", "inspect repository <token>".
static IMPLICIT_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:analyze|check|inspect)\s+(?:(?:the\s+)?repo(?:sitory)?\s+)?(\S+)")
        .unwrap()
});

/// Stateless parser over a registry snapshot.
#[derive(Debug, Default)]
pub struct IntentParser;

impl IntentParser {
    pub fn parse(&self, registry: &Registry, text: &str) -> ParsedIntent {
        if EXPLICIT_REF.is_match(text) {
            return ParsedIntent {
                domain: Some("analysis".to_string()),
                action: Some("analyze_path".to_string()),
                raw_text: text.to_string(),
                confidence: CONF_EXPLICIT_PATH,
            };
        }

        if let Some(caps) = IMPLICIT_REF.captures(text) {
            let token = caps[1].trim_end_matches(['.', ',', '!', '?']);
            let (action, confidence) = if Path::new(token).exists() {
                ("analyze_path", CONF_IMPLICIT_PATH)
            } else {
                // Soft-fail: the downstream analyzer handles missing paths.
                ("analyze_repository", CONF_IMPLICIT_MISSING)
            };
            return ParsedIntent {
                domain: Some("analysis".to_string()),
                action: Some(action.to_string()),
                raw_text: text.to_string(),
                confidence,
            };
        }

        let lower = text.to_lowercase();
        let best_workflow = registry
            .list_workflows()
            .iter()
            .map(|w| (workflow_match_score(&lower, w), w))
            .max_by(|a, b| a.0.total_cmp(&b.0));
        let best_tool = registry
            .list_tools()
            .iter()
            .map(|t| (tool_match_score(&lower, t), t))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        let tool_score = best_tool.as_ref().map(|(s, _)| *s).unwrap_or(0.0);

        // Ties go to the workflow side; workflows carry richer behavior.
        if let Some((score, wf)) = best_workflow {
            if score > 0.0 && score >= tool_score {
                return ParsedIntent {
                    domain: Some(wf.domain.clone()),
                    action: Some(wf.action.clone()),
                    raw_text: text.to_string(),
                    confidence: (0.5 + score * 0.4).min(CONF_EXPLICIT_PATH),
                };
            }
        }
        if let Some((score, tool)) = best_tool {
            if score > 0.0 {
                return ParsedIntent {
                    domain: Some(inferred_domain(&tool.name)),
                    action: Some(tool.name.clone()),
                    raw_text: text.to_string(),
                    confidence: (0.5 + score * 0.4).min(CONF_EXPLICIT_PATH),
                };
            }
        }

        ParsedIntent {
            domain: None,
            action: None,
            raw_text: text.to_string(),
            confidence: CONF_NO_MATCH,
        }
    }
}

/// Keyword match between lowercased text and a workflow, clamped to [0,1]:
/// +0.3 for the domain (or any underscore part of it), +0.4 if all action
/// words appear (+0.2 if only some), up to +0.4 proportional to description
/// words (len > 3) found in the text.
pub(crate) fn workflow_match_score(lower_text: &str, workflow: &Workflow) -> f64 {
    let mut score = 0.0;
    if workflow
        .domain
        .split('_')
        .chain(std::iter::once(workflow.domain.as_str()))
        .any(|part| !part.is_empty() && lower_text.contains(&part.to_lowercase()))
    {
        score += 0.3;
    }
    score += word_presence_bonus(lower_text, &workflow.action);
    score += 0.4 * description_overlap(lower_text, &workflow.description);
    score.min(1.0)
}

/// Same style of score against an external tool's name/description.
pub(crate) fn tool_match_score(lower_text: &str, tool: &ToolDescriptor) -> f64 {
    let mut score = 0.0;
    if tool
        .name
        .split('_')
        .any(|part| !part.is_empty() && lower_text.contains(&part.to_lowercase()))
    {
        score += 0.3;
    }
    score += word_presence_bonus(lower_text, &tool.name);
    score += 0.4 * description_overlap(lower_text, &tool.description);
    score.min(1.0)
}

/// Domain guess for a catalog tool: the first underscore-separated name part.
pub(crate) fn inferred_domain(tool_name: &str) -> String {
    tool_name
        .split('_')
        .next()
        .unwrap_or(tool_name)
        .to_lowercase()
}

// +0.4 if every underscore-separated word appears in the text, +0.2 if some.
fn word_presence_bonus(lower_text: &str, name: &str) -> f64 {
    let words: Vec<String> = name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let found = words.iter().filter(|w| lower_text.contains(w.as_str())).count();
    if found == words.len() {
        0.4
    } else if found > 0 {
        0.2
    } else {
        0.0
    }
}

// Fraction of description words (len > 3) present in the text.
fn description_overlap(lower_text: &str, description: &str) -> f64 {
    let words: Vec<String> = description
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .map(|w| w.to_string())
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let found = words.iter().filter(|w| lower_text.contains(w.as_str())).count();
    found as f64 / words.len() as f64
}
