//! Engine error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report serialization: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown reporter '{0}' (expected console, json or markdown)")]
    UnknownReporter(String),
}
