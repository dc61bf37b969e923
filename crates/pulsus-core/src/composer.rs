//! Composition: bundle the top candidates into a multi-step plan and
//! materialize it as a temporary module.
//!
//! Step input/output bindings are declared but not yet data-flowed between
//! steps; the rendered module is a structurally valid placeholder whose entry
//! point returns a success marker. The plan itself is real and auditable.

use crate::discovery::ToolSpec;
use crate::error::RouteError;
use crate::intent::ParsedIntent;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum number of candidates chained into one composition.
const MAX_STEPS: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Step id: `s1`, `s2`, ...
    pub id: String,
    pub tool: String,
    pub entry: String,
    /// Empty until inter-step binding inference exists.
    pub inputs: serde_json::Map<String, serde_json::Value>,
    pub outputs: serde_json::Map<String, serde_json::Value>,
}

/// Ordered multi-step execution plan built from selected candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionPlan {
    pub description: String,
    pub steps: Vec<PlanStep>,
}

/// Build a plan from at most the first two candidates.
pub fn plan_composition(intent: &ParsedIntent, candidates: &[ToolSpec]) -> CompositionPlan {
    let steps = candidates
        .iter()
        .take(MAX_STEPS)
        .enumerate()
        .map(|(i, c)| PlanStep {
            id: format!("s{}", i + 1),
            tool: c.identifier.clone(),
            entry: c.entry_point_name.clone(),
            inputs: serde_json::Map::new(),
            outputs: serde_json::Map::new(),
        })
        .collect();
    CompositionPlan {
        description: format!(
            "composed plan for {}",
            intent.action.as_deref().unwrap_or("request")
        ),
        steps,
    }
}

/// Write the plan as `<tmp_root>/tmp_compose_<route_id>.<ext>` and return the
/// path. The module's `run()` reports success without chaining the steps.
pub fn render_tmp_module(
    plan: &CompositionPlan,
    tmp_root: &Path,
    route_id: &str,
    ext: &str,
) -> Result<PathBuf, RouteError> {
    std::fs::create_dir_all(tmp_root)?;
    let path = tmp_root.join(format!("tmp_compose_{route_id}.{ext}"));
    let plan_json = serde_json::to_string_pretty(plan)?;
    let source = format!(
        "\"\"\"Composition module for route {route_id}.\n\n{description}\n\"\"\"\n\nPLAN = {plan_json}\n\ndef run():\n    return {{\n        \"ok\": True,\n        \"composed\": True,\n        \"steps\": [step[\"id\"] for step in PLAN[\"steps\"]],\n    }}\n",
        description = plan.description,
    );
    std::fs::write(&path, source).map_err(|source| RouteError::Materialize {
        path: path.clone(),
        source,
    })?;
    debug!(
        target: "pulsus::composer",
        path = %path.display(),
        steps = plan.steps.len(),
        "rendered composition module"
    );
    Ok(path)
}
