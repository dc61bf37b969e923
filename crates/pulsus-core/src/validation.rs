//! Four-stage validation gate for materialized modules.
//!
//! Stages run strictly in order — lint, type-check, import smoke-test,
//! sandboxed dry-run — and all four always run so one invocation surfaces
//! every problem at once. Absent lint/type-check tooling is a skip, not a
//! failure; a missing interpreter is a real failure. Each stage appends a
//! timestamped log under `logs/validation/<date>/`.

use crate::config::{SandboxConfig, ValidationConfig};
use crate::error::RouteError;
use crate::interrupt::InterruptToken;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{info, warn};

/// Validation stage identifier, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lint,
    Typecheck,
    Import,
    Dryrun,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Lint => "lint",
            Stage::Typecheck => "typecheck",
            Stage::Import => "import",
            Stage::Dryrun => "dryrun",
        }
    }
}

/// Outcome of one validation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub passed: bool,
    pub log_path: PathBuf,
    pub duration_ms: u64,
    pub summary: String,
}

/// Aggregate of all four stage reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub reports: Vec<StageReport>,
}

impl ValidationOutcome {
    /// True only if every stage passed.
    pub fn ok(&self) -> bool {
        self.reports.iter().all(|r| r.passed)
    }
}

// Loads the module from argv[1] and exits 0 only when it exposes a callable
// `run` or `main` entry point.
const IMPORT_SNIPPET: &str = r#"
import importlib.util, sys
spec = importlib.util.spec_from_file_location("pulsus_candidate", sys.argv[1])
if spec is None or spec.loader is None:
    sys.exit(2)
mod = importlib.util.module_from_spec(spec)
spec.loader.exec_module(mod)
entry = getattr(mod, "run", None) or getattr(mod, "main", None)
sys.exit(0 if callable(entry) else 2)
"#;

// Same load, then calls the entry point under a best-effort address-space
// rlimit (argv[2], MiB). Wall-clock enforcement lives on the Rust side.
const DRYRUN_SNIPPET: &str = r#"
import importlib.util, sys
try:
    import resource
    limit = int(sys.argv[2]) * 1024 * 1024
    resource.setrlimit(resource.RLIMIT_AS, (limit, limit))
except Exception:
    pass
spec = importlib.util.spec_from_file_location("pulsus_candidate", sys.argv[1])
if spec is None or spec.loader is None:
    sys.exit(2)
mod = importlib.util.module_from_spec(spec)
spec.loader.exec_module(mod)
entry = getattr(mod, "run", None) or getattr(mod, "main", None)
if not callable(entry):
    sys.exit(2)
entry()
"#;

enum StageExec {
    Completed { success: bool, output: String },
    MissingBinary(String),
    TimedOut(Duration),
    Cancelled,
    SpawnFailed(String),
}

/// Runs the four-stage gate against one module path.
pub struct Validator {
    validation: ValidationConfig,
    sandbox: SandboxConfig,
    log_dir: PathBuf,
}

impl Validator {
    pub fn new(validation: ValidationConfig, sandbox: SandboxConfig, log_dir: PathBuf) -> Self {
        Self {
            validation,
            sandbox,
            log_dir,
        }
    }

    /// Run every stage in order, checking the interrupt token between stages.
    /// Only user cancellation aborts; stage failures are recorded and the
    /// remaining stages still run.
    pub async fn validate(
        &self,
        module: &Path,
        token: &InterruptToken,
    ) -> Result<ValidationOutcome, RouteError> {
        let mut reports = Vec::with_capacity(4);
        for stage in [Stage::Lint, Stage::Typecheck, Stage::Import, Stage::Dryrun] {
            token.check()?;
            let report = self.run_stage(stage, module, token).await?;
            info!(
                target: "pulsus::validation",
                stage = stage.as_str(),
                passed = report.passed,
                summary = %report.summary,
                "validation stage finished"
            );
            reports.push(report);
        }
        Ok(ValidationOutcome { reports })
    }

    async fn run_stage(
        &self,
        stage: Stage,
        module: &Path,
        token: &InterruptToken,
    ) -> Result<StageReport, RouteError> {
        let started = Instant::now();
        let (cmd, timeout, tool_optional) = self.stage_command(stage, module);
        let exec = run_bounded(cmd, timeout, token).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (passed, summary, output) = match exec {
            StageExec::Completed { success, output } => {
                let summary = if success {
                    format!("{} passed", stage.as_str())
                } else {
                    format!("{} reported problems", stage.as_str())
                };
                (success, summary, output)
            }
            StageExec::MissingBinary(bin) if tool_optional => {
                (true, format!("skipped: {bin} not installed"), String::new())
            }
            StageExec::MissingBinary(bin) => {
                (false, format!("{bin} not installed"), String::new())
            }
            StageExec::TimedOut(limit) => (
                false,
                format!("timed out after {}s", limit.as_secs()),
                String::new(),
            ),
            StageExec::Cancelled => return Err(RouteError::Interrupted),
            StageExec::SpawnFailed(reason) => {
                return Err(RouteError::Validation {
                    stage: stage.as_str().to_string(),
                    reason,
                })
            }
        };

        let log_path = self.write_stage_log(stage, module, &summary, &output);
        Ok(StageReport {
            stage,
            passed,
            log_path,
            duration_ms,
            summary,
        })
    }

    fn stage_command(&self, stage: Stage, module: &Path) -> (Command, Duration, bool) {
        let tool_timeout = Duration::from_secs(self.validation.tool_timeout_secs);
        match stage {
            Stage::Lint => {
                let mut cmd = Command::new(&self.validation.lint_cmd);
                cmd.arg("check").arg(module);
                (cmd, tool_timeout, true)
            }
            Stage::Typecheck => {
                let mut cmd = Command::new(&self.validation.typecheck_cmd);
                cmd.arg(module);
                (cmd, tool_timeout, true)
            }
            Stage::Import => {
                let mut cmd = Command::new(&self.validation.interpreter);
                cmd.arg("-c").arg(IMPORT_SNIPPET).arg(module);
                (cmd, tool_timeout, false)
            }
            Stage::Dryrun => {
                let mut cmd = Command::new(&self.validation.interpreter);
                cmd.arg("-c")
                    .arg(DRYRUN_SNIPPET)
                    .arg(module)
                    .arg(self.sandbox.max_memory_mb.to_string());
                if !self.sandbox.allow_network {
                    // Best-effort: strip proxy hints. Not an isolation boundary.
                    cmd.env_remove("http_proxy").env_remove("https_proxy");
                }
                (cmd, Duration::from_secs(self.sandbox.max_seconds), false)
            }
        }
    }

    // Log layout: logs/validation/<date>/<stage>_<module-stem>.log.
    // Append-only; a logging failure never fails the stage.
    fn write_stage_log(&self, stage: Stage, module: &Path, summary: &str, output: &str) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let stem = module
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module");
        let dir = self.log_dir.join("validation").join(date);
        let path = dir.join(format!("{}_{stem}.log", stage.as_str()));
        let line = format!(
            "[{}] {}: {}\n{}",
            Utc::now().to_rfc3339(),
            stage.as_str(),
            summary,
            if output.is_empty() {
                String::new()
            } else {
                format!("{output}\n")
            }
        );
        let result = std::fs::create_dir_all(&dir).and_then(|_| {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            f.write_all(line.as_bytes())
        });
        if let Err(e) = result {
            warn!(
                target: "pulsus::validation",
                path = %path.display(),
                error = %e,
                "failed to write stage log"
            );
        }
        path
    }
}

// Run one external command bounded by a wall-clock timeout and the interrupt
// token; the child dies with its handle on either bound.
async fn run_bounded(mut cmd: Command, limit: Duration, token: &InterruptToken) -> StageExec {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let bin = cmd.as_std().get_program().to_string_lossy().into_owned();
            return StageExec::MissingBinary(bin);
        }
        Err(e) => return StageExec::SpawnFailed(e.to_string()),
    };

    tokio::select! {
        res = tokio::time::timeout(limit, child.wait_with_output()) => match res {
            Ok(Ok(out)) => {
                let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
                output.push_str(&String::from_utf8_lossy(&out.stderr));
                StageExec::Completed {
                    success: out.status.success(),
                    output,
                }
            }
            Ok(Err(e)) => StageExec::SpawnFailed(e.to_string()),
            Err(_) => StageExec::TimedOut(limit),
        },
        _ = token.cancelled() => StageExec::Cancelled,
    }
}
