//! Seams between the planner and the outside world.
//!
//! Each remote service sits behind a small trait so the orchestration logic
//! can be driven by HTTP adapters in production and by mocks in tests.

use std::time::Duration;

use crate::async_matrix::{CreateTaskResponse, MatrixResultResponse, MatrixTaskRequest, TaskStatusResponse};
use crate::cancel::CancelToken;
use crate::error::RemoteError;
use crate::model::{DistanceMatrix, GeoPoint};
use crate::tour::SolveResponse;

/// Provides a distance matrix for a set of points.
///
/// The matrix is indexed by the provided point order.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, points: &[GeoPoint]) -> DistanceMatrix;
}

/// Create-task / task-status / fetch-result protocol of an asynchronous
/// pairwise matrix service.
pub trait MatrixTaskApi {
    fn create_task(&self, request: &MatrixTaskRequest) -> Result<CreateTaskResponse, RemoteError>;

    fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, RemoteError>;

    /// Fetches the payload behind a task's result location.
    fn fetch_result(&self, result_location: &str) -> Result<MatrixResultResponse, RemoteError>;
}

/// Exact tour solver over a precomputed matrix.
pub trait TourSolverApi {
    fn solve(&self, matrix: &DistanceMatrix) -> Result<SolveResponse, RemoteError>;
}

/// Waits between status polls. Implementations should return early once
/// `cancel` fires.
pub trait Sleeper {
    fn pause(&self, duration: Duration, cancel: &CancelToken);
}

/// Real-time sleeper that wakes up on cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancellableSleep;

impl Sleeper for CancellableSleep {
    fn pause(&self, duration: Duration, cancel: &CancelToken) {
        cancel.wait_timeout(duration);
    }
}
