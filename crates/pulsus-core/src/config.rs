//! Pulsus configuration loaded from file and environment.
//!
//! Precedence: defaults < TOML file (`PULSUS_CONFIG` path, else
//! `config/pulsus.toml`) < `PULSUS`-prefixed environment variables with `__`
//! as the section separator (e.g. `PULSUS_MODEL__HOST`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the routing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PulsusConfig {
    /// Root directory holding declarative workflow definition files.
    pub workflows_root: PathBuf,
    /// Root directory for external tool modules. When unset, catalog tools
    /// without an explicit path resolve to `tool://<name>` virtual URIs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_root: Option<PathBuf>,
    /// Base directory for telemetry and validation logs.
    pub log_dir: PathBuf,
    /// Subdirectory of `workflows_root` for materialized temporary modules.
    pub tmp_dirname: String,
    /// Declared retention window for logs, in days. Not enforced by this core.
    pub retention_days: u32,
    /// Declared cache toggle. Not consulted by this core.
    pub cache_enabled: bool,
    pub model: ModelConfig,
    pub ranker: RankerConfig,
    pub sandbox: SandboxConfig,
    pub validation: ValidationConfig,
}

impl Default for PulsusConfig {
    fn default() -> Self {
        Self {
            workflows_root: PathBuf::from("workflows"),
            tools_root: None,
            log_dir: PathBuf::from("logs"),
            tmp_dirname: "tmp_modules".to_string(),
            retention_days: 14,
            cache_enabled: true,
            model: ModelConfig::default(),
            ranker: RankerConfig::default(),
            sandbox: SandboxConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Local LLM endpoint settings (Ollama-style `/api/generate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub host: String,
    pub name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:11434".to_string(),
            name: "llama3.1".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            timeout_secs: 30,
        }
    }
}

/// Candidate-ranking threshold and signal weights.
///
/// The weights are expected to sum to 1.0 by configuration contract; the
/// scorer clamps its output to [0,1] but does not re-normalize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Confidence threshold used by the policy selector.
    pub threshold: f64,
    pub name_weight: f64,
    pub doc_weight: f64,
    /// Reserved for a future usage-history signal; currently contributes 0.
    pub history_weight: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            name_weight: 0.4,
            doc_weight: 0.4,
            history_weight: 0.2,
        }
    }
}

/// Resource budget for the dry-run stage. Best-effort, not a hardened jail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub max_seconds: u64,
    pub max_memory_mb: u64,
    pub allow_network: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_seconds: 10,
            max_memory_mb: 512,
            allow_network: false,
        }
    }
}

/// External commands used by the validation pipeline. Lint and type-check
/// binaries are optional tooling (absence is a skip); the interpreter is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub lint_cmd: String,
    pub typecheck_cmd: String,
    pub interpreter: String,
    /// File extension for materialized temporary modules.
    pub module_ext: String,
    /// Wall-clock ceiling for lint/type-check invocations, in seconds.
    pub tool_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            lint_cmd: "ruff".to_string(),
            typecheck_cmd: "mypy".to_string(),
            interpreter: "python3".to_string(),
            module_ext: "py".to_string(),
            tool_timeout_secs: 30,
        }
    }
}

impl PulsusConfig {
    /// Load config from file and environment.
    /// Precedence: env `PULSUS_CONFIG` path > `config/pulsus.toml` > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("PULSUS_CONFIG").unwrap_or_else(|_| "config/pulsus.toml".to_string());
        Self::load_from_path(Path::new(&config_path))
    }

    /// Load config layering an optional TOML file, then `PULSUS__*` env vars.
    pub fn load_from_path(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder();
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };
        let built = builder
            .add_source(config::Environment::with_prefix("PULSUS").separator("__"))
            .build()?;
        // Empty sources deserialize to the serde defaults above.
        built.try_deserialize()
    }

    /// Write the current configuration as pretty TOML, creating parent
    /// directories as needed. Used to seed a config file on first run.
    pub fn save_to_path(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    /// Directory where temporary modules are materialized.
    pub fn tmp_root(&self) -> PathBuf {
        self.workflows_root.join(&self.tmp_dirname)
    }
}
