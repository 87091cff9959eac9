//! Error taxonomy for the planner.
//!
//! Row- and entry-level problems never surface here; they are dropped, logged
//! and counted in the relevant report. These types cover failures that abort
//! an import or a whole run.

use thiserror::Error;

use crate::config::ConfigError;

/// Failures while importing the point table and distance matrix.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("expected a point table and a distance table, got {supplied} table(s)")]
    MissingTables { supplied: usize },

    #[error("failed to read {table}: {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("distance matrix has {rows} row(s) but {points} point(s) were imported")]
    RowCountMismatch { points: usize, rows: usize },

    /// A cleaned matrix row does not line up with the imported points.
    #[error("distance matrix row {row} has {len} value(s), expected {points}")]
    ShapeMismatch { points: usize, row: usize, len: usize },
}

/// Failures talking to the remote matrix service or the tour solver.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("task submission failed: {0}")]
    Submission(String),

    #[error("remote task {task_id} was canceled")]
    TaskCanceled { task_id: String },

    #[error("network error during {stage}: {source}")]
    Network {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} returned HTTP {status}")]
    Http { stage: &'static str, status: u16 },

    #[error("malformed response: {0}")]
    MalformedResult(String),

    #[error("task {task_id} still pending after {attempts} status poll(s)")]
    PollTimeout { task_id: String, attempts: u32 },

    #[error("run cancelled locally")]
    Cancelled,
}

impl RemoteError {
    pub(crate) fn network(stage: &'static str, source: reqwest::Error) -> Self {
        RemoteError::Network { stage, source }
    }
}

/// Failures of a planner run or import as seen by the presentation layer.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a routing run is already in progress")]
    RunInProgress,

    #[error("at least two points are required, have {0}")]
    NotEnoughPoints(usize),
}
