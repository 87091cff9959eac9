//! Turns either remote result shape into the ordered segment collection the
//! presentation layer renders.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::async_matrix::MatrixResult;
use crate::error::RemoteError;
use crate::model::{DistanceMatrix, GeoPoint, RouteSegment};
use crate::tour::TourResult;

/// Output of one remote run.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResult {
    /// Unordered pairwise results.
    Matrix(MatrixResult),
    /// Visiting order plus the matrix that was sent to the solver.
    Tour { tour: TourResult, matrix: DistanceMatrix },
}

/// Segments built from one result, before they are published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    pub segments: Vec<RouteSegment>,
    pub total_cost: Option<f64>,
    /// Entries or legs that could not become a segment.
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct RouteReconstructor {
    average_speed_kmh: f64,
    segments: Arc<[RouteSegment]>,
    total_cost: Option<f64>,
}

impl RouteReconstructor {
    pub fn new(average_speed_kmh: f64) -> Self {
        Self {
            average_speed_kmh,
            segments: Arc::from(Vec::new()),
            total_cost: None,
        }
    }

    /// Current segments. The returned snapshot never changes underneath the
    /// caller.
    pub fn segments(&self) -> Arc<[RouteSegment]> {
        Arc::clone(&self.segments)
    }

    pub fn total_cost(&self) -> Option<f64> {
        self.total_cost
    }

    /// Builds segments from `result` without publishing them.
    ///
    /// `points` must be the same ordering the remote request was built from.
    pub fn build(&self, points: &[GeoPoint], result: &RemoteResult) -> Result<Reconstruction, RemoteError> {
        match result {
            RemoteResult::Matrix(matrix) => Ok(from_pairs(points, matrix)),
            RemoteResult::Tour { tour, matrix } => {
                from_tour(points, tour, matrix, self.average_speed_kmh)
            }
        }
    }

    /// Builds and publishes in one step. On error the held collection is
    /// left as it was.
    pub fn apply(&mut self, points: &[GeoPoint], result: &RemoteResult) -> Result<Reconstruction, RemoteError> {
        let reconstruction = self.build(points, result)?;
        self.publish(&reconstruction);
        Ok(reconstruction)
    }

    /// Replaces the held collection in one step.
    pub fn publish(&mut self, reconstruction: &Reconstruction) {
        self.segments = Arc::from(reconstruction.segments.clone());
        self.total_cost = reconstruction.total_cost;
        debug!(segments = self.segments.len(), "route segments replaced");
    }

    /// Drops every segment that starts or ends at `point_id`.
    pub fn remove_point(&mut self, point_id: u64) {
        if !self.segments.iter().any(|segment| segment.touches(point_id)) {
            return;
        }
        let kept: Vec<RouteSegment> = self
            .segments
            .iter()
            .filter(|segment| !segment.touches(point_id))
            .cloned()
            .collect();
        self.segments = Arc::from(kept);
    }

    pub fn clear(&mut self) {
        self.segments = Arc::from(Vec::new());
        self.total_cost = None;
    }
}

/// Pairwise results: self pairs removed, longest first.
fn from_pairs(points: &[GeoPoint], result: &MatrixResult) -> Reconstruction {
    let mut dropped = 0;
    let mut segments = Vec::with_capacity(result.entries.len());

    for entry in &result.entries {
        let (Some(start), Some(end)) = (points.get(entry.source), points.get(entry.target)) else {
            warn!(source = entry.source, target = entry.target, "matrix entry references unknown point");
            dropped += 1;
            continue;
        };
        // Self pairs are expected in a full matrix and are not counted.
        if let Some(segment) = RouteSegment::new(start.clone(), end.clone(), entry.distance, entry.duration) {
            segments.push(segment);
        }
    }

    segments.sort_by(|a, b| b.distance.total_cmp(&a.distance));

    Reconstruction {
        segments,
        total_cost: None,
        dropped,
    }
}

/// Consecutive tour legs in visiting order, durations in minutes.
fn from_tour(
    points: &[GeoPoint],
    tour: &TourResult,
    matrix: &DistanceMatrix,
    average_speed_kmh: f64,
) -> Result<Reconstruction, RemoteError> {
    let mut dropped = 0;
    let mut segments = Vec::with_capacity(tour.order.len().saturating_sub(1));

    for leg in tour.order.windows(2) {
        let (from, to) = (leg[0], leg[1]);
        let (Some(start), Some(end)) = (points.get(from), points.get(to)) else {
            return Err(RemoteError::MalformedResult(format!(
                "tour visits index {} but only {} point(s) exist",
                from.max(to),
                points.len()
            )));
        };
        let distance = matrix.get(from, to).ok_or_else(|| {
            RemoteError::MalformedResult(format!("no distance for tour leg {from} -> {to}"))
        })?;
        let duration = distance / average_speed_kmh * 60.0;

        match RouteSegment::new(start.clone(), end.clone(), distance, duration) {
            Some(segment) => segments.push(segment),
            None => {
                warn!(index = from, "tour repeats a point on consecutive stops");
                dropped += 1;
            }
        }
    }

    Ok(Reconstruction {
        segments,
        total_cost: Some(tour.total_cost),
        dropped,
    })
}
