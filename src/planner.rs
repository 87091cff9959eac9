//! Orchestration entry point.
//!
//! `Planner` owns the points, the imported matrix, the published route
//! segments and the run timer. Commands from the presentation layer (add,
//! remove, role change, import, run) all go through it. Locks are always
//! taken points first, then routes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::{info, warn};

use crate::async_matrix::{HttpMatrixTaskApi, RemoteMatrixClient};
use crate::cancel::CancelToken;
use crate::config::{MatrixModes, PlannerConfig, RoutingMode};
use crate::error::{PlannerError, RemoteError};
use crate::haversine::HaversineMatrix;
use crate::ingest::{IngestReport, MatrixIngestor, TableSource};
use crate::model::{DistanceMatrix, GeoPoint, PointRole, RouteSegment};
use crate::point_store::PointStore;
use crate::reconstruct::{RemoteResult, RouteReconstructor};
use crate::timer::ExecutionTimer;
use crate::tour::{HttpTourSolver, RemoteTourClient};
use crate::traits::{CancellableSleep, DistanceMatrixProvider, MatrixTaskApi, Sleeper, TourSolverApi};

/// Planner wired to the real HTTP services.
pub type HttpPlanner = Planner<HttpMatrixTaskApi, HttpTourSolver, CancellableSleep>;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub mode: RoutingMode,
    pub segments: usize,
    pub total_cost: Option<f64>,
    /// Remote entries, labels or legs that were discarded.
    pub dropped: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
struct ImportedMatrix {
    matrix: DistanceMatrix,
    /// Point-store revision the matrix is aligned with.
    revision: u64,
}

struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Planner<M, T, S> {
    matrix_client: RemoteMatrixClient<M, S>,
    tour_client: RemoteTourClient<T>,
    fallback: HaversineMatrix,
    ingestor: MatrixIngestor,
    modes: RwLock<MatrixModes>,
    points: RwLock<PointStore>,
    imported: RwLock<Option<ImportedMatrix>>,
    routes: RwLock<RouteReconstructor>,
    timer: Mutex<ExecutionTimer>,
    in_flight: AtomicBool,
}

impl HttpPlanner {
    /// Builds the production planner. An empty API key is filled from
    /// [`API_KEY_ENV`](crate::config::API_KEY_ENV).
    pub fn from_config(config: PlannerConfig) -> Result<Self, PlannerError> {
        config.validate()?;
        let matrix_api = HttpMatrixTaskApi::new(config.matrix.clone().with_env_api_key())?;
        let tour_api = HttpTourSolver::new(config.tour.clone())?;
        Ok(Self::new(&config, matrix_api, tour_api, CancellableSleep))
    }
}

impl<M, T, S> Planner<M, T, S>
where
    M: MatrixTaskApi,
    T: TourSolverApi,
    S: Sleeper,
{
    pub fn new(config: &PlannerConfig, matrix_api: M, tour_api: T, sleeper: S) -> Self {
        Self {
            matrix_client: RemoteMatrixClient::new(matrix_api, sleeper, config.poll),
            tour_client: RemoteTourClient::new(tour_api),
            fallback: HaversineMatrix,
            ingestor: MatrixIngestor::new(config.ragged_rows),
            modes: RwLock::new(config.matrix.modes()),
            points: RwLock::new(PointStore::new()),
            imported: RwLock::new(None),
            routes: RwLock::new(RouteReconstructor::new(config.average_speed_kmh)),
            timer: Mutex::new(ExecutionTimer::new(Duration::from_millis(config.tick_interval_ms))),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn matrix_client(&self) -> &RemoteMatrixClient<M, S> {
        &self.matrix_client
    }

    pub fn tour_client(&self) -> &RemoteTourClient<T> {
        &self.tour_client
    }

    // ------------------------------------------------------------------
    // Point commands
    // ------------------------------------------------------------------

    pub fn add_point(&self, lat: f64, lon: f64) -> GeoPoint {
        write(&self.points).add(lat, lon)
    }

    /// Removes a point and every published segment touching it.
    pub fn remove_point(&self, id: u64) {
        let mut points = write(&self.points);
        if points.remove(id) {
            write(&self.routes).remove_point(id);
        }
    }

    pub fn set_role(&self, id: u64, role: PointRole) {
        write(&self.points).set_role(id, role);
    }

    pub fn points(&self) -> Vec<GeoPoint> {
        read(&self.points).points().to_vec()
    }

    /// Transport profile and cost model used by the next matrix run.
    pub fn set_matrix_modes(&self, modes: MatrixModes) {
        *write(&self.modes) = modes;
    }

    pub fn matrix_modes(&self) -> MatrixModes {
        *read(&self.modes)
    }

    /// Replaces points and matrix with an imported table pair.
    ///
    /// Published segments are cleared since they refer to the old points.
    pub fn import(&self, tables: &[TableSource]) -> Result<IngestReport, PlannerError> {
        let ingested = self.ingestor.ingest(tables)?;
        let mut points = write(&self.points);
        points.replace_all(ingested.points);
        *write(&self.imported) = Some(ImportedMatrix {
            matrix: ingested.matrix,
            revision: points.revision(),
        });
        write(&self.routes).clear();
        info!(points = points.len(), clean = ingested.report.is_clean(), "tables imported");
        Ok(ingested.report)
    }

    pub fn imported_matrix(&self) -> Option<DistanceMatrix> {
        read(&self.imported).as_ref().map(|imported| imported.matrix.clone())
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    pub fn segments(&self) -> Arc<[RouteSegment]> {
        read(&self.routes).segments()
    }

    /// Total cost reported by the last successful tour run.
    pub fn total_cost(&self) -> Option<f64> {
        read(&self.routes).total_cost()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Coarse elapsed value for a progress display.
    pub fn progress(&self) -> Duration {
        lock(&self.timer).progress()
    }

    pub fn last_elapsed(&self) -> Option<Duration> {
        lock(&self.timer).final_elapsed()
    }

    // ------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------

    /// Resolves routes for the current points with the selected backend.
    ///
    /// Only one run may be in flight. On failure the previously published
    /// segments stay in place.
    pub fn run(&self, mode: RoutingMode, cancel: &CancelToken) -> Result<RunSummary, PlannerError> {
        let _guard = RunGuard::acquire(&self.in_flight).ok_or(PlannerError::RunInProgress)?;

        lock(&self.timer).start();
        let outcome = self.execute(mode, cancel);
        let elapsed = lock(&self.timer).finish();

        match outcome {
            Ok(summary) => {
                info!(?mode, segments = summary.segments, elapsed_ms = elapsed.as_millis() as u64, "run finished");
                Ok(RunSummary { elapsed, ..summary })
            }
            Err(err) => {
                warn!(?mode, error = %err, elapsed_ms = elapsed.as_millis() as u64, "run failed, keeping previous routes");
                Err(err)
            }
        }
    }

    fn execute(&self, mode: RoutingMode, cancel: &CancelToken) -> Result<RunSummary, PlannerError> {
        let (points, revision) = {
            let store = read(&self.points);
            (store.points().to_vec(), store.revision())
        };
        if points.len() < 2 {
            return Err(PlannerError::NotEnoughPoints(points.len()));
        }

        let (result, remote_dropped) = match mode {
            RoutingMode::Matrix => {
                let modes = self.matrix_modes();
                let matrix = self.matrix_client.resolve(&points, modes, cancel)?;
                let dropped = matrix.dropped_entries;
                (RemoteResult::Matrix(matrix), dropped)
            }
            RoutingMode::Tour => {
                let matrix = self.tour_matrix(&points, revision);
                let tour = self.tour_client.solve(&matrix)?;
                let dropped = tour.dropped_labels;
                (RemoteResult::Tour { tour, matrix }, dropped)
            }
        };
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled.into());
        }

        let mut reconstruction = read(&self.routes).build(&points, &result)?;

        // Points removed while the run was in flight must not reappear.
        let store = read(&self.points);
        reconstruction.segments.retain(|segment| {
            store.get(segment.start().id()).is_some() && store.get(segment.end().id()).is_some()
        });
        write(&self.routes).publish(&reconstruction);
        drop(store);

        Ok(RunSummary {
            mode,
            segments: reconstruction.segments.len(),
            total_cost: reconstruction.total_cost,
            dropped: reconstruction.dropped + remote_dropped,
            elapsed: Duration::ZERO,
        })
    }

    /// The imported matrix if it still matches the points, otherwise a
    /// straight-line estimate.
    fn tour_matrix(&self, points: &[GeoPoint], revision: u64) -> DistanceMatrix {
        if let Some(imported) = read(&self.imported).as_ref() {
            if imported.revision == revision && imported.matrix.len() == points.len() {
                return imported.matrix.clone();
            }
            info!("imported matrix is stale, using straight-line distances");
        }
        self.fallback.matrix_for(points)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
