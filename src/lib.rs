//! route-planner core
//!
//! Turns a set of map points into renderable route segments, using either an
//! asynchronous pairwise matrix service or an exact tour solver.

pub mod model;
pub mod point_store;
pub mod ingest;
pub mod traits;
pub mod cancel;
pub mod async_matrix;
pub mod tour;
pub mod reconstruct;
pub mod timer;
pub mod haversine;
pub mod config;
pub mod planner;
pub mod error;

pub use cancel::CancelToken;
pub use config::{MatrixModes, PlannerConfig, RoutingMode};
pub use error::{IngestError, PlannerError, RemoteError};
pub use model::{DistanceMatrix, GeoPoint, PointRole, RouteSegment};
pub use planner::{HttpPlanner, Planner, RunSummary};
