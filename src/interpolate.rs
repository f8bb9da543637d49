//! Neighbor-based fallback for missing or too-dark measurements
//!
//! LEDs that were off or too dark to sample directly still need a plausible
//! value. Each missing or below-threshold cell is filled from the mean of
//! its 8-connected neighbors' direct measurements, scaled by a dark factor
//! (a dark LED is assumed to sit at a fixed fraction of its neighbors).

use crate::sample::{Measurement, MeasurementSet};

pub const DEFAULT_DARK_THRESHOLD: f64 = 10.0;
pub const DEFAULT_DARK_FACTOR: f64 = 0.1;

/// Complete a partial measurement set over the full n×n grid.
///
/// A cell qualifies for interpolation when it is absent from `direct` or its
/// brightness is below `dark_threshold`. Neighbor values are read from the
/// original `direct` set only, so the pass is order-independent and never
/// cascades through already-interpolated cells. Neighbors below the
/// threshold do not contribute; if no neighbor qualifies the cell gets a
/// floor value of 1.0 on every channel. The result always has exactly n²
/// entries.
pub fn complete_measurements(
    direct: &MeasurementSet,
    n: u32,
    dark_threshold: f64,
    dark_factor: f64,
) -> MeasurementSet {
    let mut completed = direct.clone();

    for row in 0..n {
        for col in 0..n {
            let key = (row, col);
            let needs_fill = match direct.get(&key) {
                Some(m) => m.brightness < dark_threshold,
                None => true,
            };
            if !needs_fill {
                continue;
            }

            let neighbors = collect_neighbors(direct, row, col, n, dark_threshold);
            let filled = if neighbors.is_empty() {
                Measurement {
                    brightness: 1.0,
                    r: 1.0,
                    g: 1.0,
                    b: 1.0,
                    interpolated: true,
                }
            } else {
                let count = neighbors.len() as f64;
                let mut sum = (0.0, 0.0, 0.0, 0.0);
                for m in &neighbors {
                    sum.0 += m.brightness;
                    sum.1 += m.r;
                    sum.2 += m.g;
                    sum.3 += m.b;
                }
                Measurement {
                    brightness: sum.0 / count * dark_factor,
                    r: sum.1 / count * dark_factor,
                    g: sum.2 / count * dark_factor,
                    b: sum.3 / count * dark_factor,
                    interpolated: true,
                }
            };

            completed.insert(key, filled);
        }
    }

    completed
}

/// Direct measurements in the Moore neighborhood of (row, col) that are at
/// or above the dark threshold
fn collect_neighbors(
    direct: &MeasurementSet,
    row: u32,
    col: u32,
    n: u32,
    dark_threshold: f64,
) -> Vec<Measurement> {
    let mut neighbors = Vec::new();
    for dr in -1i64..=1 {
        for dc in -1i64..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            let nr = row as i64 + dr;
            let nc = col as i64 + dc;
            if nr < 0 || nc < 0 || nr >= n as i64 || nc >= n as i64 {
                continue;
            }
            if let Some(m) = direct.get(&(nr as u32, nc as u32)) {
                if m.brightness >= dark_threshold {
                    neighbors.push(*m);
                }
            }
        }
    }
    neighbors
}
