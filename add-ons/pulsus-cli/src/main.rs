//! Pulsus one-shot routing CLI.
//!
//! Routes a single free-text request through the pipeline and prints the
//! resulting `RouteDecision` as JSON. Ctrl-C triggers the interrupt token,
//! which cancels the in-flight route (including validation subprocesses).

use pulsus_core::{
    InterruptToken, PulsusConfig, Registry, RouteError, RouteOptions, Router, ToolDescriptor,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: pulsus-cli [--non-interactive] [--explain] <request text>";

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(".env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut opts = RouteOptions::default();
    let mut words = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--non-interactive" => opts.non_interactive = true,
            "--explain" => opts.explain = true,
            "--help" | "-h" => {
                eprintln!("{USAGE}");
                return;
            }
            _ => words.push(arg),
        }
    }
    let text = words.join(" ");
    if text.trim().is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let config = PulsusConfig::load().expect("load PulsusConfig");
    let catalog = load_catalog(&config);
    let registry = Arc::new(Registry::load(&config.workflows_root, catalog));
    tracing::info!(
        workflows = registry.list_workflows().len(),
        tools = registry.list_tools().len(),
        "registry loaded"
    );
    let router = Router::new(config, registry);

    let token = InterruptToken::new();
    let ctrl = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("CTRL-C received; cancelling route");
            ctrl.trigger();
        }
    });

    match router.route(&text, opts, &token).await {
        Ok(decision) => match serde_json::to_string_pretty(&decision) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize decision: {e}");
                std::process::exit(1);
            }
        },
        Err(RouteError::Interrupted) => {
            eprintln!("route cancelled; no decision was made");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("routing failed: {e}");
            std::process::exit(1);
        }
    }
}

// External tool catalog: `<tools_root>/catalog.json`, a JSON array of
// descriptors. Absent root or file means an empty catalog.
fn load_catalog(config: &PulsusConfig) -> Vec<ToolDescriptor> {
    let Some(root) = config.tools_root.as_ref() else {
        return Vec::new();
    };
    let path = root.join("catalog.json");
    match std::fs::read(&path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed tool catalog; ignoring");
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    }
}
