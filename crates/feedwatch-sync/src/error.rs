use std::path::PathBuf;

use feedwatch_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("I/O error on {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at {path} is not valid: {source}")]
    SnapshotFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV export to {path} failed: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("export task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// An error escalated because strict mode is enabled.
    #[error("strict mode abort while {context}: {source}")]
    Strict {
        context: String,
        #[source]
        source: GraphError,
    },

    #[error("source check failed: {0}")]
    SourceCheck(String),
}
