//! Ordered point storage.
//!
//! Insertion order is the index space used for request matrices, so every
//! mutation that changes the order bumps `revision`.

use tracing::debug;

use crate::model::{GeoPoint, PointRole};

#[derive(Debug, Clone, Default)]
pub struct PointStore {
    points: Vec<GeoPoint>,
    next_id: u64,
    revision: u64,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client point with the next unused identifier.
    pub fn add(&mut self, lat: f64, lon: f64) -> GeoPoint {
        let point = GeoPoint::new(self.next_id, lat, lon);
        self.next_id += 1;
        self.points.push(point.clone());
        self.revision += 1;
        debug!(id = point.id(), lat, lon, "point added");
        point
    }

    /// Removes a point. Returns whether anything was removed.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.points.len();
        self.points.retain(|point| point.id() != id);
        let removed = self.points.len() != before;
        if removed {
            self.revision += 1;
            debug!(id, "point removed");
        }
        removed
    }

    /// Changes a point's role; unknown ids are ignored.
    pub fn set_role(&mut self, id: u64, role: PointRole) {
        if let Some(point) = self.points.iter_mut().find(|point| point.id() == id) {
            point.role = role;
        }
    }

    /// Replaces the whole sequence with externally identified points.
    ///
    /// The allocator continues after the largest imported id.
    pub fn replace_all(&mut self, points: Vec<GeoPoint>) {
        self.next_id = points
            .iter()
            .map(|point| point.id() + 1)
            .max()
            .unwrap_or(0)
            .max(self.next_id);
        self.points = points;
        self.revision += 1;
    }

    pub fn get(&self, id: u64) -> Option<&GeoPoint> {
        self.points.iter().find(|point| point.id() == id)
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
