//! Grid geometry: corners, array size, and LED position derivation
//!
//! Four user-marked corners bound the LED array in the photograph. Interior
//! LED positions are derived by bilinear interpolation between them, so a
//! perspective-skewed but roughly planar array still yields usable positions
//! without a full homography.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from grid definition and derivation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("expected exactly 4 grid corners, got {0}")]
    InvalidCornerCount(usize),
    #[error("array size must be at least 2, got {0}")]
    ArraySizeTooSmall(u32),
}

/// A 2D point in display-space pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub x: f64,
    pub y: f64,
}

impl Corner {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation between two corners, t in [0, 1]
    pub fn lerp(a: Corner, b: Corner, t: f64) -> Corner {
        Corner {
            x: a.x * (1.0 - t) + b.x * t,
            y: a.y * (1.0 - t) + b.y * t,
        }
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// The four corners of the LED array in the display image.
/// Order: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    pub corners: [Corner; 4],
}

impl CornerSet {
    pub fn new(corners: [Corner; 4]) -> Self {
        Self { corners }
    }

    /// Build from a click sequence; anything but exactly 4 points is rejected.
    pub fn from_points(points: &[Corner]) -> Result<Self, GridError> {
        match points {
            [tl, tr, br, bl] => Ok(Self::new([*tl, *tr, *br, *bl])),
            other => Err(GridError::InvalidCornerCount(other.len())),
        }
    }

    pub fn top_left(&self) -> Corner {
        self.corners[0]
    }

    pub fn top_right(&self) -> Corner {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Corner {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Corner {
        self.corners[3]
    }

    /// Index of the corner within `threshold` pixels of (x, y), closest first
    pub fn find_nearest(&self, x: f64, y: f64, threshold: f64) -> Option<usize> {
        let mut nearest = None;
        let mut min_distance = f64::INFINITY;
        for (i, corner) in self.corners.iter().enumerate() {
            let distance = corner.distance_to(x, y);
            if distance < threshold && distance < min_distance {
                min_distance = distance;
                nearest = Some(i);
            }
        }
        nearest
    }
}

/// Validated n×n array size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    n: u32,
}

impl GridSpec {
    pub fn new(n: u32) -> Result<Self, GridError> {
        if n < 2 {
            return Err(GridError::ArraySizeTooSmall(n));
        }
        Ok(Self { n })
    }

    pub fn size(&self) -> u32 {
        self.n
    }

    pub fn led_count(&self) -> usize {
        (self.n as usize) * (self.n as usize)
    }
}

/// A single LED position in display space, with its grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedPosition {
    pub x: i32,
    pub y: i32,
    pub row: u32,
    pub col: u32,
}

impl LedPosition {
    pub fn new(x: i32, y: i32, row: u32, col: u32) -> Self {
        Self { x, y, row, col }
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x as f64 - x).powi(2) + (self.y as f64 - y).powi(2)).sqrt()
    }
}

/// Derive all n² LED positions from the four grid corners.
///
/// For each cell, u = col/(n-1) and v = row/(n-1) (both 0 when n == 1);
/// the position is the bilinear blend of the corners, truncated to integer
/// pixels. Output is row-major with exactly one entry per (row, col).
/// For n > 1 the four extreme cells land exactly on the corners; n == 1
/// degenerates to a single position at the top-left corner.
pub fn compute_grid_positions(corners: &CornerSet, n: u32) -> Vec<LedPosition> {
    let mut positions = Vec::with_capacity((n as usize) * (n as usize));

    for row in 0..n {
        for col in 0..n {
            let u = if n > 1 { col as f64 / (n - 1) as f64 } else { 0.0 };
            let v = if n > 1 { row as f64 / (n - 1) as f64 } else { 0.0 };

            let top = Corner::lerp(corners.top_left(), corners.top_right(), u);
            let bottom = Corner::lerp(corners.bottom_left(), corners.bottom_right(), u);
            let pos = Corner::lerp(top, bottom, v);

            positions.push(LedPosition::new(pos.x as i32, pos.y as i32, row, col));
        }
    }

    positions
}
