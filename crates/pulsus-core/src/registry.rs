//! Workflow and tool registry.
//!
//! Workflows are declarative JSON files loaded once at construction from the
//! workflows root; the external tool catalog is supplied by a collaborator as
//! plain descriptors (explicit registration, no filesystem introspection or
//! dynamic loading). Both are read-only after construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One step of a declarative workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Tool reference: a filesystem path or a bare tool name.
    pub tool: String,
    /// Entry point exposed by the tool module.
    #[serde(default = "default_entry")]
    pub entry: String,
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub outputs: serde_json::Map<String, serde_json::Value>,
}

fn default_entry() -> String {
    "run".to_string()
}

/// Declarative workflow definition. Identity is the `(domain, action)` pair,
/// assumed unique per registry instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub domain: String,
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// External tool descriptor from the collaborator-supplied catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Concrete module path, when the tool is backed by one.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_entry")]
    pub entry: String,
}

/// Read-only lookup over loaded workflows and the external tool catalog.
#[derive(Debug, Default)]
pub struct Registry {
    workflows: Vec<Workflow>,
    tools: Vec<ToolDescriptor>,
}

impl Registry {
    /// Build a registry from the workflows root plus an external tool catalog.
    ///
    /// A missing root yields an empty workflow list with a warning; malformed
    /// definition files are skipped with a warning. Neither is fatal.
    pub fn load(workflows_root: &Path, tools: Vec<ToolDescriptor>) -> Self {
        let mut workflows = Vec::new();
        match std::fs::read_dir(workflows_root) {
            Ok(entries) => {
                let mut paths: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
                    .collect();
                // Deterministic load order regardless of directory iteration.
                paths.sort();
                for path in paths {
                    match Self::load_definition(&path) {
                        Ok(wf) => workflows.push(wf),
                        Err(reason) => {
                            warn!(
                                target: "pulsus::registry",
                                path = %path.display(),
                                %reason,
                                "skipping malformed workflow definition"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                warn!(
                    target: "pulsus::registry",
                    root = %workflows_root.display(),
                    error = %e,
                    "workflows root not readable; registry starts empty"
                );
            }
        }
        Self { workflows, tools }
    }

    fn load_definition(path: &Path) -> Result<Workflow, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())
    }

    pub fn list_workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get_workflow(&self, domain: &str, action: &str) -> Option<&Workflow> {
        self.workflows
            .iter()
            .find(|w| w.domain == domain && w.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_workflow(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn loads_well_formed_and_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_workflow(
            dir.path(),
            "analyze.json",
            r#"{"id":"wf1","domain":"analysis","action":"analyze_repository",
                "description":"analyze a repository tree",
                "steps":[{"tool":"repo_scan","entry":"run"}]}"#,
        );
        write_workflow(dir.path(), "broken.json", "{not json");
        let reg = Registry::load(dir.path(), Vec::new());
        assert_eq!(reg.list_workflows().len(), 1);
        assert!(reg.get_workflow("analysis", "analyze_repository").is_some());
        assert!(reg.get_workflow("analysis", "missing").is_none());
    }

    #[test]
    fn missing_root_yields_empty_registry() {
        let reg = Registry::load(Path::new("no/such/dir"), Vec::new());
        assert!(reg.list_workflows().is_empty());
    }

    #[test]
    fn step_entry_defaults_to_run() {
        let dir = tempfile::tempdir().unwrap();
        write_workflow(
            dir.path(),
            "wf.json",
            r#"{"id":"wf","domain":"docs","action":"summarize","steps":[{"tool":"summarizer"}]}"#,
        );
        let reg = Registry::load(dir.path(), Vec::new());
        assert_eq!(reg.list_workflows()[0].steps[0].entry, "run");
    }
}
