//! Real Las Vegas locations and table builders for import tests.
//!
//! Coordinates sourced from OpenStreetMap.

use route_planner::haversine::HaversineMatrix;
use route_planner::ingest::TableSource;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }
}

pub const STRIP: &[Location] = &[
    Location::new("Wynn Las Vegas", 36.1263781, -115.1658180),
    Location::new("Bellagio", 36.1126, -115.1767),
    Location::new("MGM Grand", 36.1023654, -115.1688720),
    Location::new("Caesars Palace", 36.1162, -115.1745),
    Location::new("Longhorn Casino", 36.1070664, -115.0591256),
];

/// `cities.csv` content: header plus `name,lat,lon` rows.
pub fn cities_csv(locations: &[Location]) -> String {
    let mut csv = String::from("name,lat,lon\n");
    for loc in locations {
        csv.push_str(&format!("{},{},{}\n", loc.name, loc.lat, loc.lng));
    }
    csv
}

/// `distances.csv` content: straight-line km between every pair.
pub fn distances_csv(locations: &[Location]) -> String {
    let mut csv = String::from("from");
    for loc in locations {
        csv.push(',');
        csv.push_str(loc.name);
    }
    csv.push('\n');
    for from in locations {
        csv.push_str(from.name);
        for to in locations {
            let km = HaversineMatrix::haversine_km((from.lat, from.lng), (to.lat, to.lng));
            csv.push_str(&format!(",{km:.3}"));
        }
        csv.push('\n');
    }
    csv
}

pub fn table_pair(locations: &[Location]) -> Vec<TableSource> {
    vec![
        TableSource::new("cities.csv", cities_csv(locations)),
        TableSource::new("distances.csv", distances_csv(locations)),
    ]
}

/// The three-point square used throughout the tour scenarios.
pub fn triangle_tables() -> Vec<TableSource> {
    vec![
        TableSource::new("cities.csv", "name,lat,lon\nCity_0,0,0\nCity_1,1,0\nCity_2,1,1\n"),
        TableSource::new(
            "distances.csv",
            ",City_0,City_1,City_2\nCity_0,0,1,1.4\nCity_1,1,0,1\nCity_2,1.4,1,0\n",
        ),
    ]
}
