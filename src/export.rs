//! Export record shaping and session persistence
//!
//! Measurement records go out as ordered rows with led_id assigned
//! sequentially over the row-major scan of the final measurement set. The
//! session document bundles array size, corners, positions, and results
//! for saving and reloading a whole measurement session.

use serde::{Deserialize, Serialize};

use crate::geometry::{CornerSet, LedPosition};
use crate::sample::MeasurementSet;

/// Detection method tag carried on every record. The grid-with-editable-
/// corners pipeline is the only detector, so this is a fixed value kept
/// for downstream compatibility.
pub const DETECTION_METHOD: &str = "grid";

/// One exported measurement row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedRecord {
    pub led_id: u32,
    pub row: u32,
    pub col: u32,
    pub brightness: f64,
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub interpolated: bool,
    pub detection_method: String,
    pub measurement_method: String,
}

/// Build export rows from a measurement set. Iteration over the set is
/// row-major, and led_id counts up from 1 in that order.
pub fn build_records(measurements: &MeasurementSet, measurement_method: &str) -> Vec<LedRecord> {
    measurements
        .iter()
        .enumerate()
        .map(|(i, (&(row, col), m))| LedRecord {
            led_id: i as u32 + 1,
            row,
            col,
            brightness: m.brightness,
            r: m.r,
            g: m.g,
            b: m.b,
            interpolated: m.interpolated,
            detection_method: DETECTION_METHOD.to_string(),
            measurement_method: measurement_method.to_string(),
        })
        .collect()
}

/// Format records as CSV. Fields are numerals and fixed tags, so no
/// quoting is required. Channel values keep full float precision; rounding
/// for presentation is a display concern.
pub fn to_csv(records: &[LedRecord]) -> String {
    let mut out = String::from(
        "led_id,row,col,brightness,r,g,b,interpolated,detection_method,measurement_method\n",
    );
    for rec in records {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            rec.led_id,
            rec.row,
            rec.col,
            rec.brightness,
            rec.r,
            rec.g,
            rec.b,
            rec.interpolated,
            rec.detection_method,
            rec.measurement_method,
        ));
    }
    out
}

/// Persistable snapshot of a whole session's results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub array_size: u32,
    /// TL, TR, BR, BL as (x, y) pairs; empty when no corners are defined
    pub grid_corners: Vec<[f64; 2]>,
    pub led_positions: Vec<LedPosition>,
    pub measurement_results: Vec<LedRecord>,
}

impl SessionDocument {
    pub fn new(
        array_size: u32,
        corners: Option<&CornerSet>,
        positions: &[LedPosition],
        measurement_results: Vec<LedRecord>,
    ) -> Self {
        let grid_corners = corners
            .map(|set| set.corners.iter().map(|c| [c.x, c.y]).collect())
            .unwrap_or_default();
        Self {
            array_size,
            grid_corners,
            led_positions: positions.to_vec(),
            measurement_results,
        }
    }
}
