//! Haversine distance matrix provider (fallback when no imported matrix
//! matches the current points).
//!
//! Straight-line kilometres. Less accurate than a road network but always
//! available, which is enough to feed the tour solver.

use rayon::prelude::*;

use crate::model::{DistanceMatrix, GeoPoint};
use crate::traits::DistanceMatrixProvider;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineMatrix;

impl HaversineMatrix {
    /// Calculate haversine distance between two points in kilometers.
    pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, points: &[GeoPoint]) -> DistanceMatrix {
        let rows: Vec<Vec<f64>> = points
            .par_iter()
            .enumerate()
            .map(|(i, from)| {
                points
                    .iter()
                    .enumerate()
                    .map(|(j, to)| {
                        if i == j {
                            0.0
                        } else {
                            Self::haversine_km(from.location(), to.location())
                        }
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();

        DistanceMatrix::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0, 36.1, -115.1),
            GeoPoint::new(1, 36.2, -115.2),
            GeoPoint::new(2, 36.3, -115.3),
        ]
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = HaversineMatrix::haversine_km((36.1, -115.1), (36.1, -115.1));
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Las Vegas (36.17, -115.14) to Los Angeles (34.05, -118.24)
        // Actual distance ~370 km
        let dist = HaversineMatrix::haversine_km((36.17, -115.14), (34.05, -118.24));
        assert!(dist > 350.0 && dist < 400.0, "LV to LA should be ~370km, got {}", dist);
    }

    #[test]
    fn test_matrix_square_with_zero_diagonal() {
        let matrix = HaversineMatrix.matrix_for(&points());

        assert!(matrix.is_square());
        assert_eq!(matrix.len(), 3);
        for i in 0..matrix.len() {
            assert_eq!(matrix.get(i, i), Some(0.0), "Diagonal should be zero");
        }
    }

    #[test]
    fn test_matrix_symmetric() {
        let matrix = HaversineMatrix.matrix_for(&points());
        assert_eq!(matrix.get(0, 1), matrix.get(1, 0), "Matrix should be symmetric");
    }

    #[test]
    fn test_empty_points() {
        assert!(HaversineMatrix.matrix_for(&[]).is_empty());
    }
}
