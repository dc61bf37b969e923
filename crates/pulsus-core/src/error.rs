//! Routing error taxonomy.
//!
//! Most of the pipeline degrades instead of failing (see the policy selector
//! and generator): errors here are the cases the router genuinely cannot
//! paper over, plus the distinguished cancellation signal.

use std::path::PathBuf;
use thiserror::Error;

/// Error from one routing attempt.
#[derive(Error, Debug)]
pub enum RouteError {
    /// The user cancelled the run; no partial decision is produced.
    #[error("routing interrupted by user")]
    Interrupted,
    #[error("could not materialize temporary module at {path}: {source}")]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("validation stage {stage} could not start: {reason}")]
    Validation { stage: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
