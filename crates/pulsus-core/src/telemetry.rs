//! Structured telemetry: one JSON line per pipeline event.
//!
//! Every event lands in two append-only destinations: the date-partitioned
//! global log (`logs/app/<date>/app.log`) and the per-run log
//! (`logs/runs/<run_id>/steps.log`). Handles are opened, appended, and closed
//! per call. Logging failures are warned about and never fail the pipeline.

use chrono::Utc;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only JSON-lines event logger.
#[derive(Debug, Clone)]
pub struct TelemetryLogger {
    log_dir: PathBuf,
}

impl TelemetryLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    /// Record one event. `payload` should be a JSON object; its fields are
    /// merged into the record alongside `ts`, `run_id`, and `phase`.
    pub fn log_event(&self, run_id: &str, phase: &str, payload: Value) {
        let mut record = json!({
            "ts": Utc::now().to_rfc3339(),
            "run_id": run_id,
            "phase": phase,
        });
        if let (Some(target), Some(extra)) = (record.as_object_mut(), payload.as_object()) {
            for (k, v) in extra {
                target.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        let line = record.to_string();

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let global = self.log_dir.join("app").join(date).join("app.log");
        let per_run = self.log_dir.join("runs").join(run_id).join("steps.log");
        for path in [global, per_run] {
            if let Err(e) = append_line(&path, &line) {
                warn!(
                    target: "pulsus::telemetry",
                    path = %path.display(),
                    error = %e,
                    "failed to append telemetry record"
                );
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_land_in_both_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TelemetryLogger::new(dir.path().to_path_buf());
        logger.log_event("run-1", "parse", json!({"confidence": 0.95}));
        logger.log_event("run-1", "policy", json!({"policy": "select"}));

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let global = std::fs::read_to_string(dir.path().join("app").join(&date).join("app.log")).unwrap();
        let per_run = std::fs::read_to_string(dir.path().join("runs").join("run-1").join("steps.log")).unwrap();
        assert_eq!(global.lines().count(), 2);
        assert_eq!(per_run.lines().count(), 2);

        let first: Value = serde_json::from_str(global.lines().next().unwrap()).unwrap();
        assert_eq!(first["run_id"], "run-1");
        assert_eq!(first["phase"], "parse");
        assert_eq!(first["confidence"], 0.95);
        assert!(first["ts"].is_string());
    }

    #[test]
    fn payload_cannot_clobber_envelope_fields() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TelemetryLogger::new(dir.path().to_path_buf());
        logger.log_event("run-2", "validate", json!({"phase": "spoofed", "ok": false}));
        let per_run = std::fs::read_to_string(dir.path().join("runs").join("run-2").join("steps.log")).unwrap();
        let record: Value = serde_json::from_str(per_run.trim()).unwrap();
        assert_eq!(record["phase"], "validate");
        assert_eq!(record["ok"], false);
    }

    #[test]
    fn unwritable_destination_does_not_panic() {
        let logger = TelemetryLogger::new(PathBuf::from("/dev/null/not-a-dir"));
        logger.log_event("run-3", "parse", json!({}));
    }
}
