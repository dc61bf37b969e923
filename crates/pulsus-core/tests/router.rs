//! End-to-end routing over temporary fixtures: registry on disk, unreachable
//! model endpoint, and validation tooling pointed at nonexistent binaries so
//! runs are deterministic on any host.

use pulsus_core::{
    InterruptToken, ModelConfig, Policy, PulsusConfig, Registry, RouteError, RouteOptions, Router,
    ValidationConfig,
};
use std::path::Path;
use std::sync::Arc;

fn test_config(root: &Path) -> PulsusConfig {
    PulsusConfig {
        workflows_root: root.join("workflows"),
        tools_root: None,
        log_dir: root.join("logs"),
        model: ModelConfig {
            host: "http://127.0.0.1:9".to_string(),
            name: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: 16,
            timeout_secs: 1,
        },
        validation: ValidationConfig {
            lint_cmd: "pulsus-no-such-linter".to_string(),
            typecheck_cmd: "pulsus-no-such-typechecker".to_string(),
            interpreter: "pulsus-no-such-interpreter".to_string(),
            module_ext: "py".to_string(),
            tool_timeout_secs: 5,
        },
        ..PulsusConfig::default()
    }
}

fn write_workflow(root: &Path, id: &str, domain: &str, action: &str, desc: &str, step: &str) {
    let dir = root.join("workflows");
    std::fs::create_dir_all(&dir).unwrap();
    let body = serde_json::json!({
        "id": id,
        "domain": domain,
        "action": action,
        "description": desc,
        "steps": [{"tool": step, "entry": "run"}],
    });
    std::fs::write(dir.join(format!("{id}.json")), body.to_string()).unwrap();
}

fn router_for(root: &Path) -> Router {
    let config = test_config(root);
    let registry = Arc::new(Registry::load(&config.workflows_root, Vec::new()));
    Router::new(config, registry)
}

#[tokio::test]
async fn unmatched_text_routes_to_generate_with_stub_module() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path());

    let decision = router
        .route("comment functions", RouteOptions::default(), &InterruptToken::new())
        .await
        .unwrap();

    assert_eq!(decision.policy, Policy::Generate);
    assert!(decision.selected.is_empty());
    assert!(decision.plan.is_none());
    assert!(decision.intent.domain.is_none());
    // Model host is unreachable, so the safe stub was materialized.
    let file_name = decision.module_path.file_name().unwrap().to_str().unwrap();
    assert!(file_name.starts_with("tmp_generated_"));
    assert!(decision.module_path.exists());
    // All four stages ran; the missing interpreter fails import and dry-run.
    assert_eq!(decision.validation.reports.len(), 4);
    assert!(!decision.validation.ok());
    assert!(decision.validation.reports[0].passed, "lint should be skipped");
}

#[tokio::test]
async fn dominant_workflow_routes_to_select_without_copying() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(
        dir.path(),
        "wf-digest",
        "email",
        "email_digest",
        "build a digest of unread email messages",
        "digest_builder",
    );
    let router = router_for(dir.path());

    let decision = router
        .route(
            "build an email digest of unread messages",
            RouteOptions::default(),
            &InterruptToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(decision.policy, Policy::Select);
    assert_eq!(decision.selected.len(), 1);
    // Select uses the candidate's own module reference directly.
    assert_eq!(
        decision.module_path.to_str().unwrap(),
        decision.selected[0].identifier
    );
    assert_eq!(decision.intent.domain.as_deref(), Some("email"));
}

#[tokio::test]
async fn two_close_workflows_route_to_compose() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(
        dir.path(),
        "wf-a",
        "docs",
        "summarize_readme",
        "summarize the readme",
        "first_step",
    );
    write_workflow(
        dir.path(),
        "wf-b",
        "docs",
        "summarize_readme",
        "summarize the readme",
        "second_step",
    );
    let router = router_for(dir.path());

    let decision = router
        .route("summarize the readme", RouteOptions::default(), &InterruptToken::new())
        .await
        .unwrap();

    assert_eq!(decision.policy, Policy::Compose);
    // The decision record is truncated to one candidate; the plan keeps both.
    assert_eq!(decision.selected.len(), 1);
    let plan = decision.plan.as_ref().unwrap();
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].id, "s1");
    let file_name = decision.module_path.file_name().unwrap().to_str().unwrap();
    assert!(file_name.starts_with("tmp_compose_"));
    assert!(decision.module_path.exists());
}

#[tokio::test]
async fn explain_appends_candidate_breakdown() {
    let dir = tempfile::tempdir().unwrap();
    write_workflow(
        dir.path(),
        "wf-digest",
        "email",
        "email_digest",
        "build a digest of unread email messages",
        "digest_builder",
    );
    let router = router_for(dir.path());

    let decision = router
        .route(
            "build an email digest of unread messages",
            RouteOptions {
                explain: true,
                non_interactive: true,
            },
            &InterruptToken::new(),
        )
        .await
        .unwrap();
    assert!(decision.reason.contains("candidates:"));
    assert!(decision.reason.contains("digest_builder"));
}

#[tokio::test]
async fn triggered_token_yields_no_decision() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path());
    let token = InterruptToken::new();
    token.trigger();

    let err = router
        .route("comment functions", RouteOptions::default(), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::Interrupted));
}

#[tokio::test]
async fn telemetry_is_partitioned_by_date_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_for(dir.path());

    let decision = router
        .route("comment functions", RouteOptions::default(), &InterruptToken::new())
        .await
        .unwrap();

    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let global = dir.path().join("logs").join("app").join(&date).join("app.log");
    let per_run = dir
        .path()
        .join("logs")
        .join("runs")
        .join(&decision.route_id)
        .join("steps.log");
    assert!(global.exists());
    assert!(per_run.exists());

    let steps = std::fs::read_to_string(per_run).unwrap();
    let phases: Vec<String> = steps
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["phase"]
            .as_str()
            .unwrap()
            .to_string())
        .collect();
    assert_eq!(
        phases,
        ["parse", "discover", "policy", "materialize", "validate", "decision"]
    );
}
