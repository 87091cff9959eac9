//! Test fixtures for route-planner.
//!
//! Provides:
//! - Scripted mock implementations of the remote service traits
//! - Sleepers that record or interrupt poll waits
//! - Real Las Vegas locations and CSV table builders

#![allow(dead_code)]

pub mod locations;

pub use locations::*;

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use route_planner::async_matrix::{CreateTaskResponse, MatrixResultResponse, MatrixTaskRequest, RouteEntry, TaskStatusResponse};
use route_planner::cancel::CancelToken;
use route_planner::config::PlannerConfig;
use route_planner::error::RemoteError;
use route_planner::model::DistanceMatrix;
use route_planner::planner::Planner;
use route_planner::tour::SolveResponse;
use route_planner::traits::{MatrixTaskApi, Sleeper, TourSolverApi};

pub const RESULT_LINK: &str = "https://results.example/task-1.json";

/// Logged calls, in order: `create`, `status`, `fetch:<link>`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

// ============================================================================
// Matrix task API
// ============================================================================

/// Replays a scripted status sequence. The last status repeats forever.
pub struct ScriptedMatrixApi {
    task_id: Option<String>,
    statuses: Mutex<VecDeque<&'static str>>,
    routes: Option<Vec<RouteEntry>>,
    calls: CallLog,
    requests: Mutex<Vec<MatrixTaskRequest>>,
}

impl ScriptedMatrixApi {
    pub fn new(statuses: &[&'static str]) -> Self {
        Self {
            task_id: Some("task-1".to_string()),
            statuses: Mutex::new(statuses.iter().copied().collect()),
            routes: Some(Vec::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn done() -> Self {
        Self::new(&["TASK_DONE"])
    }

    pub fn without_task_id(mut self) -> Self {
        self.task_id = None;
        self
    }

    pub fn with_routes(mut self, routes: Vec<RouteEntry>) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn without_routes(mut self) -> Self {
        self.routes = None;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(call)).count()
    }

    pub fn requests(&self) -> Vec<MatrixTaskRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<MatrixTaskRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MatrixTaskApi for ScriptedMatrixApi {
    fn create_task(&self, request: &MatrixTaskRequest) -> Result<CreateTaskResponse, RemoteError> {
        self.log("create".to_string());
        self.requests.lock().unwrap().push(request.clone());
        Ok(CreateTaskResponse {
            task_id: self.task_id.clone(),
        })
    }

    fn task_status(&self, _task_id: &str) -> Result<TaskStatusResponse, RemoteError> {
        self.log("status".to_string());
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        let result_link = (status == Some("TASK_DONE")).then(|| RESULT_LINK.to_string());
        Ok(TaskStatusResponse {
            status: status.map(str::to_string),
            result_link,
        })
    }

    fn fetch_result(&self, result_location: &str) -> Result<MatrixResultResponse, RemoteError> {
        self.log(format!("fetch:{result_location}"));
        Ok(MatrixResultResponse {
            routes: self.routes.clone(),
        })
    }
}

pub fn route(source: usize, target: usize, distance: f64, duration: f64) -> RouteEntry {
    RouteEntry {
        source_id: Some(source),
        target_id: Some(target),
        distance: Some(distance),
        duration: Some(duration),
    }
}

/// Full N x N result where distance grows with `|i - j|`.
pub fn full_routes(n: usize) -> Vec<RouteEntry> {
    let mut routes = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let distance = (i as f64 - j as f64).abs() * 1000.0 + i as f64;
            routes.push(route(i, j, distance, distance / 10.0));
        }
    }
    routes
}

// ============================================================================
// Tour solver
// ============================================================================

pub struct FixedTourSolver {
    response: Result<SolveResponse, u16>,
    received: Mutex<Vec<DistanceMatrix>>,
}

impl FixedTourSolver {
    pub fn new(labels: &[&str], total_distance: f64) -> Self {
        Self {
            response: Ok(SolveResponse {
                route: Some(labels.iter().map(|label| label.to_string()).collect()),
                total_distance: Some(total_distance),
            }),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Solver that answers every request with an HTTP error status.
    pub fn failing(status: u16) -> Self {
        Self {
            response: Err(status),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<DistanceMatrix> {
        self.received.lock().unwrap().clone()
    }
}

impl TourSolverApi for FixedTourSolver {
    fn solve(&self, matrix: &DistanceMatrix) -> Result<SolveResponse, RemoteError> {
        self.received.lock().unwrap().push(matrix.clone());
        match &self.response {
            Ok(response) => Ok(response.clone()),
            Err(status) => Err(RemoteError::Http {
                stage: "solve tour",
                status: *status,
            }),
        }
    }
}

// ============================================================================
// Sleepers
// ============================================================================

/// Records requested waits and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn pause(&self, duration: Duration, _cancel: &CancelToken) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Cancels the run on the given pause, as a user pressing "stop" would.
pub struct CancellingSleeper {
    pub on_pause: usize,
    seen: Mutex<usize>,
}

impl CancellingSleeper {
    pub fn new(on_pause: usize) -> Self {
        Self {
            on_pause,
            seen: Mutex::new(0),
        }
    }
}

impl Sleeper for CancellingSleeper {
    fn pause(&self, _duration: Duration, cancel: &CancelToken) {
        let mut seen = self.seen.lock().unwrap();
        *seen += 1;
        if *seen == self.on_pause {
            cancel.cancel();
        }
    }
}

/// Signals that a run is waiting, then blocks until the run is cancelled.
pub struct BlockingSleeper {
    entered: Mutex<Sender<()>>,
}

impl BlockingSleeper {
    pub fn new(entered: Sender<()>) -> Self {
        Self {
            entered: Mutex::new(entered),
        }
    }
}

impl Sleeper for BlockingSleeper {
    fn pause(&self, _duration: Duration, cancel: &CancelToken) {
        let _ = self.entered.lock().unwrap().send(());
        cancel.wait_timeout(Duration::from_secs(30));
    }
}

/// Parks every pause until the test releases it, without cancelling.
pub struct GateSleeper {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl GateSleeper {
    pub fn new(entered: Sender<()>, release: Receiver<()>) -> Self {
        Self {
            entered: Mutex::new(entered),
            release: Mutex::new(release),
        }
    }
}

impl Sleeper for GateSleeper {
    fn pause(&self, _duration: Duration, _cancel: &CancelToken) {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(30));
    }
}

// ============================================================================
// Planner builders
// ============================================================================

pub fn test_config() -> PlannerConfig {
    PlannerConfig {
        tick_interval_ms: 5,
        ..PlannerConfig::default()
    }
}

pub fn planner<S: Sleeper>(
    matrix_api: ScriptedMatrixApi,
    tour: FixedTourSolver,
    sleeper: S,
) -> Planner<ScriptedMatrixApi, FixedTourSolver, S> {
    Planner::new(&test_config(), matrix_api, tour, sleeper)
}
