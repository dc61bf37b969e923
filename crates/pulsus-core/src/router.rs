//! Route orchestration: parse, discover, choose, materialize, validate.
//!
//! The router is explicitly constructed with its collaborators (no global
//! singleton) and checks the interrupt token at every stage boundary; the
//! validation pipeline re-checks between stages and binds subprocess
//! lifetimes to the same token. Interruption aborts with no partial decision.

use crate::composer::{self, CompositionPlan};
use crate::config::PulsusConfig;
use crate::discovery::{self, ToolSpec};
use crate::error::RouteError;
use crate::generator::{self, OllamaBridge};
use crate::intent::{IntentParser, ParsedIntent};
use crate::interrupt::InterruptToken;
use crate::policy::{self, Policy};
use crate::registry::Registry;
use crate::telemetry::TelemetryLogger;
use crate::validation::{ValidationOutcome, Validator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Caller-facing knobs for one routing call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
    /// Suppress anything that would wait on the user.
    pub non_interactive: bool,
    /// Append the candidate breakdown to the decision reason.
    pub explain: bool,
}

/// Final, auditable outcome of one routing call. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub route_id: String,
    pub policy: Policy,
    /// Truncated to at most one entry for the record; the full step list
    /// lives in `plan`.
    pub selected: Vec<ToolSpec>,
    pub plan: Option<CompositionPlan>,
    pub reason: String,
    pub module_path: PathBuf,
    pub intent: ParsedIntent,
    /// Per-stage validation reports, attached directly for auditability.
    pub validation: ValidationOutcome,
}

/// Orchestrates one user request through the full pipeline.
pub struct Router {
    config: PulsusConfig,
    registry: Arc<Registry>,
    parser: IntentParser,
    bridge: OllamaBridge,
    telemetry: TelemetryLogger,
    validator: Validator,
}

impl Router {
    pub fn new(config: PulsusConfig, registry: Arc<Registry>) -> Self {
        let bridge = OllamaBridge::new(&config.model);
        let telemetry = TelemetryLogger::new(config.log_dir.clone());
        let validator = Validator::new(
            config.validation.clone(),
            config.sandbox,
            config.log_dir.clone(),
        );
        Self {
            config,
            registry,
            parser: IntentParser,
            bridge,
            telemetry,
            validator,
        }
    }

    /// Route one user utterance to a decision. Every stage boundary checks
    /// the interrupt token; `Err(Interrupted)` means no decision was made and
    /// the caller should treat the attempt as void.
    pub async fn route(
        &self,
        user_text: &str,
        opts: RouteOptions,
        token: &InterruptToken,
    ) -> Result<RouteDecision, RouteError> {
        let route_id = Uuid::new_v4().to_string();
        info!(target: "pulsus::router", route_id = %route_id, non_interactive = opts.non_interactive, "routing request");

        token.check()?;
        let intent = self.parser.parse(&self.registry, user_text);
        self.telemetry.log_event(
            &route_id,
            "parse",
            json!({
                "domain": intent.domain,
                "action": intent.action,
                "confidence": intent.confidence,
            }),
        );

        token.check()?;
        // Discovery needs both halves of the classification; without them the
        // selector sees an empty list and falls through to generation.
        let candidates = if intent.domain.is_some() && intent.action.is_some() {
            discovery::discover(
                &self.registry,
                &intent,
                &self.config.ranker,
                self.config.tools_root.as_deref(),
            )
        } else {
            Vec::new()
        };
        self.telemetry.log_event(
            &route_id,
            "discover",
            json!({
                "candidates": candidates.len(),
                "best_score": candidates.first().map(|c| c.score),
            }),
        );

        token.check()?;
        let (policy, mut reason) =
            policy::choose_policy(&intent, &candidates, self.config.ranker.threshold);
        if opts.explain {
            let breakdown: Vec<String> = candidates
                .iter()
                .map(|c| format!("{} ({:.2})", c.identifier, c.score))
                .collect();
            reason = format!("{reason}; candidates: [{}]", breakdown.join(", "));
        }
        self.telemetry.log_event(
            &route_id,
            "policy",
            json!({"policy": policy.as_str(), "reason": reason}),
        );

        token.check()?;
        let tmp_root = self.config.tmp_root();
        let ext = &self.config.validation.module_ext;
        let (module_path, plan) = match (policy, candidates.first()) {
            (Policy::Compose, _) => {
                let plan = composer::plan_composition(&intent, &candidates);
                let path = composer::render_tmp_module(&plan, &tmp_root, &route_id, ext)?;
                (path, Some(plan))
            }
            // The winning candidate's own module, no copying.
            (Policy::Select, Some(best)) => (PathBuf::from(&best.identifier), None),
            // Generate, or the (unreachable by the decision table) candidate-less
            // select: synthesis is the universal fallback.
            _ => {
                let path =
                    generator::generate_tmp_module(&self.bridge, &intent, &tmp_root, &route_id, ext)
                        .await?;
                (path, None)
            }
        };
        self.telemetry.log_event(
            &route_id,
            "materialize",
            json!({"policy": policy.as_str(), "module": module_path.display().to_string()}),
        );

        token.check()?;
        let validation = self.validator.validate(&module_path, token).await?;
        self.telemetry.log_event(
            &route_id,
            "validate",
            json!({
                "ok": validation.ok(),
                "stages": validation
                    .reports
                    .iter()
                    .map(|r| json!({"stage": r.stage.as_str(), "passed": r.passed, "summary": r.summary}))
                    .collect::<Vec<_>>(),
            }),
        );

        let decision = RouteDecision {
            route_id: route_id.clone(),
            policy,
            selected: candidates.into_iter().take(1).collect(),
            plan,
            reason,
            module_path,
            intent,
            validation,
        };
        self.telemetry.log_event(
            &route_id,
            "decision",
            json!({"policy": decision.policy.as_str(), "validation_ok": decision.validation.ok()}),
        );
        info!(
            target: "pulsus::router",
            route_id = %route_id,
            policy = decision.policy.as_str(),
            validation_ok = decision.validation.ok(),
            "routing complete"
        );
        Ok(decision)
    }
}
