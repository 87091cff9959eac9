//! Core data model: points, distance matrices and route segments.

use serde::{Deserialize, Serialize};

/// Role of a point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointRole {
    Warehouse,
    #[default]
    Client,
}

/// A single geographic location.
///
/// The identifier is fixed at creation; only the role may change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    id: u64,
    pub lat: f64,
    pub lon: f64,
    pub role: PointRole,
}

impl GeoPoint {
    pub fn new(id: u64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            role: PointRole::Client,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Location as a (lat, lon) tuple.
    pub fn location(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// Square table of pairwise travel distances, index-aligned to point order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceMatrix {
    rows: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn get(&self, from: usize, to: usize) -> Option<f64> {
        self.rows.get(from).and_then(|row| row.get(to)).copied()
    }

    /// True when every row has exactly `len()` entries.
    pub fn is_square(&self) -> bool {
        let n = self.rows.len();
        self.rows.iter().all(|row| row.len() == n)
    }
}

/// One directed leg between two distinct points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    start: GeoPoint,
    end: GeoPoint,
    pub distance: f64,
    pub duration: f64,
    pub highlight: Option<bool>,
}

impl RouteSegment {
    /// Builds a segment, refusing self-loops.
    pub fn new(start: GeoPoint, end: GeoPoint, distance: f64, duration: f64) -> Option<Self> {
        if start.id() == end.id() {
            return None;
        }
        Some(Self {
            start,
            end,
            distance,
            duration,
            highlight: None,
        })
    }

    pub fn start(&self) -> &GeoPoint {
        &self.start
    }

    pub fn end(&self) -> &GeoPoint {
        &self.end
    }

    pub fn touches(&self, point_id: u64) -> bool {
        self.start.id() == point_id || self.end.id() == point_id
    }
}
