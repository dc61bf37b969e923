//! LLM-backed module generation.
//!
//! When no suitable tool or workflow exists, the router asks a locally hosted
//! model (Ollama-style `/api/generate`, non-streaming) for a response and
//! embeds it in a temporary module. Generation never hard-fails the pipeline:
//! any network, status, or parse failure degrades to a fixed safe stub.

use crate::config::ModelConfig;
use crate::error::RouteError;
use crate::intent::ParsedIntent;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming client for the local text-generation endpoint.
pub struct OllamaBridge {
    host: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OllamaBridge {
    pub fn new(cfg: &ModelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            host: cfg.host.trim_end_matches('/').to_string(),
            model: cfg.name.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            client,
        }
    }

    /// Single-shot completion. Errors are reported as strings; callers are
    /// expected to degrade rather than propagate.
    pub async fn generate(&self, prompt: &str) -> Result<String, String> {
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };
        let url = format!("{}/api/generate", self.host);
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("model request failed: {e}"))?;
        if !res.status().is_success() {
            return Err(format!("model endpoint returned {}", res.status()));
        }
        let parsed: GenerateResponse = res
            .json()
            .await
            .map_err(|e| format!("model response parse failed: {e}"))?;
        Ok(parsed.response)
    }
}

/// Ask the model to fulfill the intent and write the response into
/// `<tmp_root>/tmp_generated_<route_id>.<ext>`. Degrades to a safe stub on
/// any generation failure; only a filesystem error writing the stub itself
/// propagates.
pub async fn generate_tmp_module(
    bridge: &OllamaBridge,
    intent: &ParsedIntent,
    tmp_root: &Path,
    route_id: &str,
    ext: &str,
) -> Result<PathBuf, RouteError> {
    std::fs::create_dir_all(tmp_root)?;
    let path = tmp_root.join(format!("tmp_generated_{route_id}.{ext}"));

    let prompt = format!(
        "You are a code assistant inside an automation pipeline.\n\
         User request: {}\n\
         Reply with a short plain-text answer describing how you would fulfill it. \
         Do not execute anything.",
        intent.raw_text
    );

    let body = match bridge.generate(&prompt).await {
        Ok(response) => {
            debug!(target: "pulsus::generator", route_id, "model responded");
            render_module(route_id, &escape_literal(&response))
        }
        Err(reason) => {
            warn!(target: "pulsus::generator", route_id, %reason, "generation failed; writing safe stub");
            render_module(route_id, STUB_MESSAGE)
        }
    };

    std::fs::write(&path, body).map_err(|source| RouteError::Materialize {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

const STUB_MESSAGE: &str = "generation unavailable; safe stub module produced";

fn render_module(route_id: &str, message: &str) -> String {
    format!(
        "\"\"\"Generated module for route {route_id}.\"\"\"\n\ndef run():\n    return {{\"ok\": True, \"message\": \"{message}\"}}\n"
    )
}

// Escape for embedding as a double-quoted string literal.
fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}
