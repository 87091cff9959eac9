//! Paired point-table / distance-table import.
//!
//! Table A rows are `label, latitude, longitude, ...`; table B rows are
//! `label, d_0, d_1, ..., d_n`. Both carry a header row. Malformed rows and
//! cells are dropped and counted in [`IngestReport`]; only structural problems
//! fail the import.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::model::{DistanceMatrix, GeoPoint};

/// What to do with matrix rows left short after dropping bad cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaggedRows {
    /// Fail the import unless the cleaned matrix is exactly N x N.
    #[default]
    Reject,
    /// Pad short rows with zeros up to N; longer rows still fail.
    ZeroPad,
}

/// A named tabular input, e.g. an uploaded CSV file.
#[derive(Debug, Clone)]
pub struct TableSource {
    pub name: String,
    pub data: Vec<u8>,
}

impl TableSource {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, data })
    }
}

/// Data-quality counters for one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Line numbers of point rows whose coordinates did not parse.
    pub skipped_point_rows: Vec<u64>,
    /// Matrix cells removed because they were not finite numbers.
    pub dropped_cells: usize,
    /// Matrix rows removed because nothing in them parsed.
    pub dropped_empty_rows: usize,
    /// Zeros appended under [`RaggedRows::ZeroPad`].
    pub padded_cells: usize,
    /// True when the two tables were supplied in reverse order.
    pub swapped: bool,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_point_rows.is_empty()
            && self.dropped_cells == 0
            && self.dropped_empty_rows == 0
            && self.padded_cells == 0
    }
}

#[derive(Debug, Clone)]
pub struct Ingested {
    pub points: Vec<GeoPoint>,
    pub matrix: DistanceMatrix,
    pub report: IngestReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Points,
    Distances,
}

#[derive(Debug, Clone, Default)]
pub struct MatrixIngestor {
    ragged_rows: RaggedRows,
}

impl MatrixIngestor {
    pub fn new(ragged_rows: RaggedRows) -> Self {
        Self { ragged_rows }
    }

    /// Parses a point table and a distance table into aligned structures.
    ///
    /// Tables may arrive in either order: file names are checked first
    /// (`cities`/`points` vs `distances`/`matrix`), then a point table is
    /// recognised by a `lat`/`lon` header. Extra tables are ignored.
    pub fn ingest(&self, tables: &[TableSource]) -> Result<Ingested, IngestError> {
        let [first, second, rest @ ..] = tables else {
            return Err(IngestError::MissingTables {
                supplied: tables.len(),
            });
        };
        if !rest.is_empty() {
            warn!(ignored = rest.len(), "more than two tables supplied");
        }

        let swapped = should_swap(classify(first), classify(second));
        let (points_table, distance_table) = if swapped {
            (second, first)
        } else {
            (first, second)
        };

        let mut report = IngestReport {
            swapped,
            ..IngestReport::default()
        };
        let points = parse_points(points_table, &mut report)?;
        let rows = parse_matrix(distance_table, &mut report)?;
        let matrix = self.shape(rows, points.len(), &mut report)?;

        debug!(
            points = points.len(),
            swapped,
            dropped_cells = report.dropped_cells,
            "tables ingested"
        );
        Ok(Ingested {
            points,
            matrix,
            report,
        })
    }

    fn shape(
        &self,
        mut rows: Vec<Vec<f64>>,
        points: usize,
        report: &mut IngestReport,
    ) -> Result<DistanceMatrix, IngestError> {
        if rows.len() != points {
            return Err(IngestError::RowCountMismatch {
                points,
                rows: rows.len(),
            });
        }
        for (index, row) in rows.iter_mut().enumerate() {
            let too_short = row.len() < points;
            if row.len() > points || (too_short && self.ragged_rows == RaggedRows::Reject) {
                return Err(IngestError::ShapeMismatch {
                    points,
                    row: index,
                    len: row.len(),
                });
            }
            if too_short {
                report.padded_cells += points - row.len();
                row.resize(points, 0.0);
            }
        }
        Ok(DistanceMatrix::new(rows))
    }
}

fn reader(table: &TableSource) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(table.data.as_slice())
}

fn csv_error(table: &TableSource, source: csv::Error) -> IngestError {
    IngestError::Csv {
        table: table.name.clone(),
        source,
    }
}

/// Numeric value of a raw cell. Cells that are not UTF-8 count as non-numeric.
fn parse_finite(cell: &[u8]) -> Option<f64> {
    std::str::from_utf8(cell)
        .ok()?
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn parse_points(table: &TableSource, report: &mut IngestReport) -> Result<Vec<GeoPoint>, IngestError> {
    let mut points = Vec::new();
    let mut rdr = reader(table);
    // Byte records: an undecodable label must not abort the import.
    for record in rdr.byte_records() {
        let record = record.map_err(|err| csv_error(table, err))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let lat = record.get(1).and_then(parse_finite);
        let lon = record.get(2).and_then(parse_finite);
        match (lat, lon) {
            (Some(lat), Some(lon)) => {
                points.push(GeoPoint::new(points.len() as u64, lat, lon));
            }
            _ => {
                warn!(table = %table.name, line, "skipping point row with bad coordinates");
                report.skipped_point_rows.push(line);
            }
        }
    }
    Ok(points)
}

fn parse_matrix(table: &TableSource, report: &mut IngestReport) -> Result<Vec<Vec<f64>>, IngestError> {
    let mut rows = Vec::new();
    let mut rdr = reader(table);
    for record in rdr.byte_records() {
        let record = record.map_err(|err| csv_error(table, err))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let total = record.len().saturating_sub(1);
        let row: Vec<f64> = record.iter().skip(1).filter_map(parse_finite).collect();
        if row.len() < total {
            warn!(table = %table.name, line, dropped = total - row.len(), "dropping non-numeric distances");
            report.dropped_cells += total - row.len();
        }
        if row.is_empty() {
            report.dropped_empty_rows += 1;
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Guesses a table's role from its name, then from its header row.
fn classify(table: &TableSource) -> Option<TableKind> {
    let name = table.name.to_ascii_lowercase();
    if ["cities", "points", "coord"].iter().any(|hint| name.contains(hint)) {
        return Some(TableKind::Points);
    }
    if ["distances", "matrix"].iter().any(|hint| name.contains(hint)) {
        return Some(TableKind::Distances);
    }

    let mut rdr = reader(table);
    let headers = rdr.byte_headers().ok()?;
    let mentions_coordinates = headers.iter().any(|header| {
        let header = String::from_utf8_lossy(header).to_ascii_lowercase();
        header.starts_with("lat") || header.starts_with("lon") || header.starts_with("lng")
    });
    mentions_coordinates.then_some(TableKind::Points)
}

/// Swap only when the hints point to reversed order and do not contradict
/// each other; otherwise positional order wins.
fn should_swap(first: Option<TableKind>, second: Option<TableKind>) -> bool {
    let reversed = first == Some(TableKind::Distances) || second == Some(TableKind::Points);
    let in_order = first == Some(TableKind::Points) || second == Some(TableKind::Distances);
    reversed && !in_order
}
