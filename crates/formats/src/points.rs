use std::fs;
use std::path::{Path, PathBuf};

use foundation::math::is_lon_lat_valid;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// One weighted event location.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub lng: f64,
    pub lat: f64,
    pub count: f64,
    pub gender: Gender,
}

impl PointRecord {
    pub const fn new(lng: f64, lat: f64, count: f64, gender: Gender) -> Self {
        Self {
            lng,
            lat,
            count,
            gender,
        }
    }
}

#[derive(Debug)]
pub enum DatasetError {
    Json(serde_json::Error),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Json(e) => write!(f, "invalid dataset json: {e}"),
            DatasetError::Io { path, source } => {
                write!(f, "failed to read dataset {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DatasetError {}

pub fn parse_points(json: &str) -> Result<Vec<PointRecord>, DatasetError> {
    serde_json::from_str(json).map_err(DatasetError::Json)
}

pub fn load_points(path: impl AsRef<Path>) -> Result<Vec<PointRecord>, DatasetError> {
    let path = path.as_ref();
    let payload = fs::read_to_string(path).map_err(|e| DatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let points = parse_points(&payload)?;
    info!(path = %path.display(), records = points.len(), "loaded dataset");
    Ok(points)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RejectReason {
    Position { lng: f64, lat: f64 },
    Weight(f64),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Position { lng, lat } => write!(f, "position out of range ({lng}, {lat})"),
            RejectReason::Weight(w) => write!(f, "weight must be finite and >= 0 (got {w})"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RejectedRecord {
    /// Index in the input sequence.
    pub index: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    pub valid: Vec<PointRecord>,
    pub rejected: Vec<RejectedRecord>,
}

fn check_record(record: &PointRecord) -> Option<RejectReason> {
    if !is_lon_lat_valid(record.lng, record.lat) {
        return Some(RejectReason::Position {
            lng: record.lng,
            lat: record.lat,
        });
    }
    if !record.count.is_finite() || record.count < 0.0 {
        return Some(RejectReason::Weight(record.count));
    }
    None
}

/// Splits records into renderable ones and rejects, preserving input order.
pub fn validate_points(records: Vec<PointRecord>) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (index, record) in records.into_iter().enumerate() {
        match check_record(&record) {
            None => report.valid.push(record),
            Some(reason) => {
                warn!(index, %reason, "dropping dataset record");
                report.rejected.push(RejectedRecord { index, reason });
            }
        }
    }
    report
}
