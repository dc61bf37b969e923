//! pulsus-core: routing and validation pipeline for the Pulsus assistant.
//!
//! Turns free-text requests into auditable `RouteDecision`s: parse intent,
//! discover and rank candidate tools/workflows, choose a fulfillment policy
//! (select, compose, or generate), materialize a temporary module, and gate
//! it through the four-stage validation pipeline. Telemetry is appended after
//! every stage; an interrupt token is honored at every stage boundary.

mod composer;
mod config;
mod discovery;
mod error;
mod generator;
mod intent;
mod interrupt;
mod policy;
mod registry;
mod router;
mod scorer;
mod telemetry;
mod validation;

pub use composer::{plan_composition, render_tmp_module, CompositionPlan, PlanStep};
pub use config::{ModelConfig, PulsusConfig, RankerConfig, SandboxConfig, ValidationConfig};
pub use discovery::{discover, ParamSpec, ToolSpec};
pub use error::RouteError;
pub use generator::{generate_tmp_module, OllamaBridge};
pub use intent::{IntentParser, ParsedIntent};
pub use interrupt::InterruptToken;
pub use policy::{choose_policy, Policy};
pub use registry::{Registry, ToolDescriptor, Workflow, WorkflowStep};
pub use router::{RouteDecision, RouteOptions, Router};
pub use scorer::{doc_overlap, name_similarity, score};
pub use telemetry::TelemetryLogger;
pub use validation::{Stage, StageReport, ValidationOutcome, Validator};
