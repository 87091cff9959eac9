//! Exact tour solver: HTTP adapter, label parsing and client.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::async_matrix::decode;
use crate::config::TourSolverConfig;
use crate::error::RemoteError;
use crate::model::DistanceMatrix;
use crate::traits::TourSolverApi;

#[derive(Debug, Serialize)]
struct SolveRequest<'a> {
    distance_matrix: &'a DistanceMatrix,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolveResponse {
    pub route: Option<Vec<String>>,
    pub total_distance: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct HttpTourSolver {
    config: TourSolverConfig,
    client: reqwest::blocking::Client,
}

impl HttpTourSolver {
    pub fn new(config: TourSolverConfig) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| RemoteError::network("client setup", err))?;

        Ok(Self { config, client })
    }
}

impl TourSolverApi for HttpTourSolver {
    fn solve(&self, matrix: &DistanceMatrix) -> Result<SolveResponse, RemoteError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&SolveRequest {
                distance_matrix: matrix,
            })
            .send()
            .map_err(|err| RemoteError::network("solve tour", err))?;

        decode("solve tour", response)
    }
}

/// Node label prefix used by the solver.
pub const LABEL_PREFIX: &str = "City_";

/// Extracts the point index from a node label such as `City_12`.
///
/// The index is the digit run right after the first `City_` that has one;
/// digits anywhere else in the label are ignored.
pub fn label_index(label: &str) -> Option<usize> {
    label.match_indices(LABEL_PREFIX).find_map(|(start, _)| {
        let tail = &label[start + LABEL_PREFIX.len()..];
        let end = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
        tail[..end].parse().ok()
    })
}

/// Visiting order returned by the solver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourResult {
    /// Point indices in visiting order.
    pub order: Vec<usize>,
    pub total_cost: f64,
    /// Labels that carried no usable index.
    pub dropped_labels: usize,
}

#[derive(Debug, Clone)]
pub struct RemoteTourClient<T> {
    solver: T,
}

impl<T: TourSolverApi> RemoteTourClient<T> {
    pub fn new(solver: T) -> Self {
        Self { solver }
    }

    pub fn solver(&self) -> &T {
        &self.solver
    }

    /// Sends the matrix as-is and parses the returned visiting order.
    pub fn solve(&self, matrix: &DistanceMatrix) -> Result<TourResult, RemoteError> {
        let response = self.solver.solve(matrix)?;
        let labels = response
            .route
            .ok_or_else(|| RemoteError::MalformedResult("solver response has no route".to_string()))?;
        let total_cost = response
            .total_distance
            .ok_or_else(|| RemoteError::MalformedResult("solver response has no total distance".to_string()))?;

        let mut dropped_labels = 0;
        let order = labels
            .iter()
            .filter_map(|label| {
                let index = label_index(label);
                if index.is_none() {
                    warn!(label = %label, "discarding tour label without an index");
                    dropped_labels += 1;
                }
                index
            })
            .collect::<Vec<_>>();

        info!(stops = order.len(), total_cost, "tour solved");
        Ok(TourResult {
            order,
            total_cost,
            dropped_labels,
        })
    }
}
