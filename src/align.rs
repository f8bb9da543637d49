//! Heuristic auto-alignment: find bright LED blobs and map them to the grid
//!
//! Best-effort candidate detection: grayscale, Gaussian blur, Otsu
//! threshold, external contours, then a size/shape filter. Grid assignment
//! is naive -- candidates are consumed in contour-discovery order and given
//! row-major cells, with no spatial sorting or clustering. That ordering is
//! a documented limitation of the tool, kept intact rather than silently
//! reworked.

use image::RgbImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, warn};

use crate::geometry::LedPosition;
use crate::transform::ViewTransform;

/// Minimum polygon area for a candidate, in source-image px²
const MIN_CANDIDATE_AREA: f64 = 10.0;
/// Bounding-box aspect ratio band for a roughly square blob
const MIN_ASPECT: f64 = 0.5;
const MAX_ASPECT: f64 = 2.0;
/// Sigma matching a 5x5 Gaussian kernel
const BLUR_SIGMA: f32 = 1.1;

/// Result of an auto-alignment run
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    /// Positions in display space, row-major up to the candidate count
    pub positions: Vec<LedPosition>,
    /// Candidates that passed filtering
    pub candidates_found: usize,
    /// n² cells the grid wanted
    pub expected: usize,
}

impl AlignmentOutcome {
    pub fn is_complete(&self) -> bool {
        self.candidates_found >= self.expected
    }
}

/// Detect LED candidate centers in source-image space.
pub fn detect_candidates(image: &RgbImage) -> Vec<(i32, i32)> {
    let gray = image::imageops::grayscale(image);
    let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);

    let level = otsu_level(&blurred);
    let binary = threshold(&blurred, level);
    debug!("Otsu threshold level: {}", level);

    let contours = find_contours::<i32>(&binary);

    let mut candidates = Vec::new();
    for contour in &contours {
        // Outer contours nested inside holes pass this filter too, which an
        // external-only retrieval would drop. Bright blobs on a dark board
        // do not nest in practice.
        if contour.border_type != BorderType::Outer {
            continue;
        }
        if contour_area(contour) <= MIN_CANDIDATE_AREA {
            continue;
        }
        let Some((x, y, w, h)) = bounding_box(contour) else {
            continue;
        };
        let aspect = w as f64 / h as f64;
        if aspect <= MIN_ASPECT || aspect >= MAX_ASPECT {
            continue;
        }
        candidates.push((x + w / 2, y + h / 2));
    }

    candidates
}

/// Assign candidates to grid cells in discovery order: candidate i gets
/// (i / n, i % n), for the first n² candidates. Centers are source-space
/// and are mapped to display space through the view transform.
pub fn assign_grid(candidates: &[(i32, i32)], n: u32, view: &ViewTransform) -> Vec<LedPosition> {
    let expected = (n as usize) * (n as usize);
    candidates
        .iter()
        .take(expected)
        .enumerate()
        .map(|(i, &(x, y))| {
            let (dx, dy) = view.to_display(x as f64, y as f64);
            let i = i as u32;
            LedPosition::new(dx as i32, dy as i32, i / n, i % n)
        })
        .collect()
}

/// Run the full detection + naive assignment pipeline. A candidate
/// shortfall is a warning, not a failure: the partial grid proceeds.
pub fn auto_align(image: &RgbImage, n: u32, view: &ViewTransform) -> AlignmentOutcome {
    let candidates = detect_candidates(image);
    let expected = (n as usize) * (n as usize);

    if candidates.len() < expected {
        warn!(
            "auto-alignment found {} candidates, expected {}",
            candidates.len(),
            expected
        );
    }

    AlignmentOutcome {
        positions: assign_grid(&candidates, n, view),
        candidates_found: candidates.len(),
        expected,
    }
}

/// Polygon area of a contour via the shoelace formula
fn contour_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled = 0i64;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        doubled += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    doubled.abs() as f64 / 2.0
}

/// Axis-aligned bounding box (x, y, w, h) of a contour's points
fn bounding_box(contour: &Contour<i32>) -> Option<(i32, i32, i32, i32)> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Black frame with bright square blobs at the given top-left corners
    fn blob_image(width: u32, height: u32, blobs: &[(u32, u32)], size: u32) -> RgbImage {
        let mut image = RgbImage::from_pixel(width, height, Rgb([5, 5, 5]));
        for &(bx, by) in blobs {
            for y in by..(by + size).min(height) {
                for x in bx..(bx + size).min(width) {
                    image.put_pixel(x, y, Rgb([250, 250, 250]));
                }
            }
        }
        image
    }

    #[test]
    fn test_detects_square_blobs() {
        let image = blob_image(100, 100, &[(10, 10), (60, 10), (10, 60), (60, 60)], 10);
        let candidates = detect_candidates(&image);
        assert_eq!(candidates.len(), 4);

        // Each center should land near the middle of a blob.
        for &(cx, cy) in &candidates {
            let near = [(15, 15), (65, 15), (15, 65), (65, 65)]
                .iter()
                .any(|&(ex, ey)| (cx - ex).abs() <= 2 && (cy - ey).abs() <= 2);
            assert!(near, "unexpected candidate center ({}, {})", cx, cy);
        }
    }

    #[test]
    fn test_small_blobs_filtered_out() {
        // 2x2 blobs have polygon area well under the minimum.
        let image = blob_image(100, 100, &[(10, 10), (60, 60)], 2);
        let candidates = detect_candidates(&image);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_elongated_blobs_filtered_out() {
        let mut image = RgbImage::from_pixel(100, 100, Rgb([5, 5, 5]));
        // 40x5 bar: aspect ratio 8, outside (0.5, 2.0).
        for y in 20..25 {
            for x in 10..50 {
                image.put_pixel(x, y, Rgb([250, 250, 250]));
            }
        }
        let candidates = detect_candidates(&image);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_naive_assignment_is_discovery_order() {
        // Deliberately scrambled candidates: assignment must NOT sort them.
        let candidates = vec![(90, 90), (10, 10), (50, 50), (30, 70)];
        let positions = assign_grid(&candidates, 2, &ViewTransform::identity());
        assert_eq!(positions.len(), 4);
        assert_eq!(positions[0], LedPosition::new(90, 90, 0, 0));
        assert_eq!(positions[1], LedPosition::new(10, 10, 0, 1));
        assert_eq!(positions[2], LedPosition::new(50, 50, 1, 0));
        assert_eq!(positions[3], LedPosition::new(30, 70, 1, 1));
    }

    #[test]
    fn test_shortfall_produces_partial_grid() {
        let image = blob_image(100, 100, &[(10, 10), (60, 10), (10, 60), (60, 60)], 10);
        let outcome = auto_align(&image, 3, &ViewTransform::identity());
        assert_eq!(outcome.expected, 9);
        assert_eq!(outcome.candidates_found, 4);
        assert_eq!(outcome.positions.len(), 4);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_excess_candidates_truncated() {
        let candidates: Vec<_> = (0..10).map(|i| (i * 10, i * 10)).collect();
        let positions = assign_grid(&candidates, 2, &ViewTransform::identity());
        assert_eq!(positions.len(), 4);
    }

    #[test]
    fn test_centers_mapped_to_display_space() {
        let candidates = vec![(100, 40)];
        let view = ViewTransform::fit_to_canvas(200, 80, 100, 40);
        let positions = assign_grid(&candidates, 1, &view);
        assert_eq!((positions[0].x, positions[0].y), (50, 20));
    }
}
