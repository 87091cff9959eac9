//! Asynchronous pairwise distance matrix: HTTP adapter and poll client.
//!
//! The remote service works in three steps: a task is created for a set of
//! points, its status is polled until it is done or canceled, and the result
//! is downloaded from the link the final status carries.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::{AsyncMatrixConfig, CostModel, MatrixModes, PollPolicy, Transport};
use crate::error::RemoteError;
use crate::model::GeoPoint;
use crate::traits::{MatrixTaskApi, Sleeper};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WirePoint {
    pub lat: f64,
    pub lon: f64,
}

/// Body of the create-task call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixTaskRequest {
    pub points: Vec<WirePoint>,
    pub sources: Vec<usize>,
    pub targets: Vec<usize>,
    pub transport: Transport,
    #[serde(rename = "type")]
    pub cost_model: CostModel,
}

impl MatrixTaskRequest {
    /// Every point is both a source and a target.
    pub fn full(points: &[GeoPoint], transport: Transport, cost_model: CostModel) -> Self {
        let all: Vec<usize> = (0..points.len()).collect();
        Self::subset(points, all.clone(), all, transport, cost_model)
    }

    /// Source and target sets are positions in `points`.
    pub fn subset(
        points: &[GeoPoint],
        sources: Vec<usize>,
        targets: Vec<usize>,
        transport: Transport,
        cost_model: CostModel,
    ) -> Self {
        Self {
            points: points
                .iter()
                .map(|point| WirePoint {
                    lat: point.lat,
                    lon: point.lon,
                })
                .collect(),
            sources,
            targets,
            transport,
            cost_model,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskResponse {
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusResponse {
    pub status: Option<String>,
    pub result_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatrixResultResponse {
    pub routes: Option<Vec<RouteEntry>>,
}

/// One source/target pair of the downloaded result. Fields are optional on
/// the wire; incomplete entries are dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteEntry {
    pub source_id: Option<usize>,
    pub target_id: Option<usize>,
    pub distance: Option<f64>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct HttpMatrixTaskApi {
    config: AsyncMatrixConfig,
    client: reqwest::blocking::Client,
}

impl HttpMatrixTaskApi {
    pub fn new(config: AsyncMatrixConfig) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| RemoteError::network("client setup", err))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AsyncMatrixConfig {
        &self.config
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [
            ("key", self.config.api_key.as_str()),
            ("version", self.config.api_version.as_str()),
        ]
    }
}

impl MatrixTaskApi for HttpMatrixTaskApi {
    fn create_task(&self, request: &MatrixTaskRequest) -> Result<CreateTaskResponse, RemoteError> {
        let url = format!(
            "{}/async_matrix/create_task/get_dist_matrix",
            self.config.base_url
        );
        let response = self
            .client
            .post(url)
            .query(&self.auth())
            .json(request)
            .send()
            .map_err(|err| RemoteError::network("create task", err))?;

        decode("create task", response).map_err(|err| match err {
            RemoteError::Http { status, .. } => {
                RemoteError::Submission(format!("create task returned HTTP {status}"))
            }
            other => other,
        })
    }

    fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, RemoteError> {
        let url = format!(
            "{}/async_matrix/result/get_dist_matrix/{}",
            self.config.base_url, task_id
        );
        let response = self
            .client
            .get(url)
            .query(&self.auth())
            .send()
            .map_err(|err| RemoteError::network("task status", err))?;

        decode("task status", response)
    }

    fn fetch_result(&self, result_location: &str) -> Result<MatrixResultResponse, RemoteError> {
        let response = self
            .client
            .get(result_location)
            .send()
            .map_err(|err| RemoteError::network("fetch result", err))?;

        decode("fetch result", response)
    }
}

/// Checks the HTTP status and decodes a JSON body.
pub(crate) fn decode<T: DeserializeOwned>(
    stage: &'static str,
    response: reqwest::blocking::Response,
) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Http {
            stage,
            status: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .map_err(|err| RemoteError::network(stage, err))?;
    serde_json::from_slice(&body)
        .map_err(|err| RemoteError::MalformedResult(format!("{stage}: {err}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    InProgress,
    Done,
    Canceled,
}

impl TaskStatus {
    fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "TASK_CREATED" | "TASK_IN_QUEUE" => Some(TaskStatus::Queued),
            "TASK_IN_PROGRESS" => Some(TaskStatus::InProgress),
            "TASK_DONE" => Some(TaskStatus::Done),
            "TASK_CANCELED" => Some(TaskStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::InProgress)
    }
}

/// In-flight state of one remote task.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncTaskHandle {
    pub task_id: String,
    pub status: TaskStatus,
    pub result_location: Option<String>,
}

impl AsyncTaskHandle {
    fn new(task_id: String) -> Self {
        Self {
            task_id,
            status: TaskStatus::Queued,
            result_location: None,
        }
    }

    fn apply(&mut self, report: TaskStatusResponse) -> Result<(), RemoteError> {
        let raw = report.status.unwrap_or_default();
        let status = TaskStatus::from_wire(&raw).ok_or_else(|| {
            RemoteError::MalformedResult(format!("task {} reported status {raw:?}", self.task_id))
        })?;
        if status != self.status {
            debug!(task_id = %self.task_id, from = ?self.status, to = ?status, "task status changed");
        }
        self.status = status;
        if report.result_link.is_some() {
            self.result_location = report.result_link;
        }
        Ok(())
    }
}

/// One resolved source/target pair. Indices are positions in the point
/// sequence the request was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixEntry {
    pub source: usize,
    pub target: usize,
    pub distance: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixResult {
    pub entries: Vec<MatrixEntry>,
    /// Entries discarded for missing or non-finite fields.
    pub dropped_entries: usize,
}

/// Drives a matrix task from submission to downloaded result.
#[derive(Debug, Clone)]
pub struct RemoteMatrixClient<A, S> {
    api: A,
    sleeper: S,
    policy: PollPolicy,
}

impl<A: MatrixTaskApi, S: Sleeper> RemoteMatrixClient<A, S> {
    pub fn new(api: A, sleeper: S, policy: PollPolicy) -> Self {
        Self {
            api,
            sleeper,
            policy,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Full N x N matrix for `points`.
    pub fn resolve(
        &self,
        points: &[GeoPoint],
        modes: MatrixModes,
        cancel: &CancelToken,
    ) -> Result<MatrixResult, RemoteError> {
        let request = MatrixTaskRequest::full(points, modes.transport, modes.cost_model);
        self.resolve_request(&request, cancel)
    }

    pub fn resolve_request(
        &self,
        request: &MatrixTaskRequest,
        cancel: &CancelToken,
    ) -> Result<MatrixResult, RemoteError> {
        let mut handle = self.submit(request)?;
        let location = self.await_completion(&mut handle, cancel)?;
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        self.fetch(&location)
    }

    fn submit(&self, request: &MatrixTaskRequest) -> Result<AsyncTaskHandle, RemoteError> {
        let created = self.api.create_task(request)?;
        let task_id = created
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::Submission("no task id returned".to_string()))?;
        info!(task_id = %task_id, points = request.points.len(), "matrix task submitted");
        Ok(AsyncTaskHandle::new(task_id))
    }

    /// Polls until the task is done and returns its result location.
    fn await_completion(
        &self,
        handle: &mut AsyncTaskHandle,
        cancel: &CancelToken,
    ) -> Result<String, RemoteError> {
        let mut attempts: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }

            handle.apply(self.api.task_status(&handle.task_id)?)?;
            attempts += 1;

            match handle.status {
                TaskStatus::Done => {
                    return handle.result_location.clone().ok_or_else(|| {
                        RemoteError::MalformedResult(format!(
                            "task {} is done but has no result link",
                            handle.task_id
                        ))
                    });
                }
                TaskStatus::Canceled => {
                    return Err(RemoteError::TaskCanceled {
                        task_id: handle.task_id.clone(),
                    });
                }
                TaskStatus::Queued | TaskStatus::InProgress => {
                    if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(RemoteError::PollTimeout {
                            task_id: handle.task_id.clone(),
                            attempts,
                        });
                    }
                    self.sleeper.pause(self.policy.interval(), cancel);
                }
            }
        }
    }

    fn fetch(&self, location: &str) -> Result<MatrixResult, RemoteError> {
        let payload = self.api.fetch_result(location)?;
        let routes = payload
            .routes
            .ok_or_else(|| RemoteError::MalformedResult("result has no routes".to_string()))?;

        let total = routes.len();
        let entries: Vec<MatrixEntry> = routes.into_iter().filter_map(entry_from_wire).collect();
        let dropped_entries = total - entries.len();
        if dropped_entries > 0 {
            warn!(dropped = dropped_entries, "discarding incomplete matrix entries");
        }
        Ok(MatrixResult {
            entries,
            dropped_entries,
        })
    }
}

fn entry_from_wire(entry: RouteEntry) -> Option<MatrixEntry> {
    let distance = entry.distance.filter(|value| value.is_finite())?;
    let duration = entry.duration.filter(|value| value.is_finite())?;
    Some(MatrixEntry {
        source: entry.source_id?,
        target: entry.target_id?,
        distance,
        duration,
    })
}
