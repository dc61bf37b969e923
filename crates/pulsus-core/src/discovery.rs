//! Candidate discovery: rank workflow steps and catalog tools for one intent.
//!
//! Workflows get a 1.5x boost (capped at 1.0) over raw tools because they
//! encapsulate richer behavior. Ranking is a stable descending sort; equal
//! scores keep insertion order, workflows enumerated before catalog tools.

use crate::config::RankerConfig;
use crate::intent::{self, ParsedIntent};
use crate::registry::{Registry, ToolDescriptor, WorkflowStep};
use crate::scorer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tools that have a workflow-level wrapper providing strictly more value;
/// the raw entries are suppressed so the wrapper wins discovery.
const ENHANCED_ELSEWHERE: &[&str] = &["repo_scan", "doc_report"];

/// Minimum score a candidate must exceed to be retained.
const RETAIN_THRESHOLD: f64 = 0.3;

const WORKFLOW_BOOST: f64 = 1.5;

/// One declared parameter of a candidate entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(default)]
    pub type_hint: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// One scored candidate. Built fresh per discovery call; the score is
/// relative to one specific intent and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Module path or `tool://` virtual URI.
    pub identifier: String,
    pub entry_point_name: String,
    pub declared_parameters: Vec<ParamSpec>,
    pub documentation: String,
    pub score: f64,
}

/// Score every registered candidate against the intent and return the
/// retained ones, best first.
pub fn discover(
    registry: &Registry,
    intent: &ParsedIntent,
    weights: &RankerConfig,
    tools_root: Option<&Path>,
) -> Vec<ToolSpec> {
    let lower = intent.raw_text.to_lowercase();
    let mut candidates = Vec::new();

    for workflow in registry.list_workflows() {
        let score = (intent::workflow_match_score(&lower, workflow) * WORKFLOW_BOOST).min(1.0);
        if score <= RETAIN_THRESHOLD {
            continue;
        }
        for step in &workflow.steps {
            candidates.push(step_spec(step, &workflow.description, score, tools_root));
        }
    }

    for tool in registry.list_tools() {
        if ENHANCED_ELSEWHERE.contains(&tool.name.as_str()) {
            continue;
        }
        let score = tool_score(tool, intent, &lower, weights);
        if score <= RETAIN_THRESHOLD {
            continue;
        }
        candidates.push(ToolSpec {
            identifier: resolve_tool_path(&tool.name, tool.path.as_deref(), tools_root),
            entry_point_name: tool.entry.clone(),
            declared_parameters: Vec::new(),
            documentation: tool.description.clone(),
            score,
        });
    }

    // Stable: equal scores keep the workflow-before-tool insertion order.
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

// 0.4 for a domain match, 0.4 for an action match, up to 0.2 for shared
// description keywords, with the weighted scorer similarity as a floor.
fn tool_score(
    tool: &ToolDescriptor,
    intent: &ParsedIntent,
    lower_text: &str,
    weights: &RankerConfig,
) -> f64 {
    let mut rule = 0.0;
    if intent.domain.as_deref() == Some(intent::inferred_domain(&tool.name).as_str()) {
        rule += 0.4;
    }
    if intent.action.as_deref() == Some(tool.name.as_str()) {
        rule += 0.4;
    }
    rule += 0.2 * scorer::doc_overlap(lower_text, &tool.description);
    rule.max(scorer::score(lower_text, &tool.name, &tool.description, weights))
        .min(1.0)
}

fn step_spec(
    step: &WorkflowStep,
    documentation: &str,
    score: f64,
    tools_root: Option<&Path>,
) -> ToolSpec {
    let declared_parameters = step
        .inputs
        .keys()
        .map(|name| ParamSpec {
            name: name.clone(),
            type_hint: None,
            required: true,
            default: None,
        })
        .collect();
    ToolSpec {
        identifier: resolve_tool_path(&step.tool, None, tools_root),
        entry_point_name: step.entry.clone(),
        declared_parameters,
        documentation: documentation.to_string(),
        score,
    }
}

// A tool reference that already looks like a path is kept as-is; bare names
// resolve under the tools root, or to a virtual URI when no root is set.
fn resolve_tool_path(reference: &str, explicit: Option<&Path>, tools_root: Option<&Path>) -> String {
    if let Some(path) = explicit {
        return path.display().to_string();
    }
    if reference.contains('/') || reference.contains('\\') || reference.contains('.') {
        return reference.to_string();
    }
    match tools_root {
        Some(root) => root.join(format!("{reference}.py")).display().to_string(),
        None => format!("tool://{reference}"),
    }
}
