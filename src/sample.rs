//! Region-based brightness sampling
//!
//! Each LED is measured by averaging a square pixel region around its
//! position in the original image. Brightness is BT.601 luminance over the
//! channel means.

use std::collections::BTreeMap;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::geometry::LedPosition;
use crate::transform::ViewTransform;

/// One measured (or interpolated) LED value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub brightness: f64,
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub interpolated: bool,
}

/// Measurements keyed by (row, col). BTreeMap iteration order is row-major,
/// which is the order exports and led_id assignment rely on.
pub type MeasurementSet = BTreeMap<(u32, u32), Measurement>;

/// BT.601 luminance from channel means
#[inline]
pub fn luminance(r: f64, g: f64, b: f64) -> f64 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Sample a square region of half-width `radius` around each LED position.
///
/// Positions are in display space and are mapped back to original-image
/// pixels first. The region `[x-radius, x+radius] x [y-radius, y+radius]`
/// is clipped to the image; a position whose clipped region is empty is
/// omitted from the result, leaving the set partial rather than failing.
pub fn sample_positions(
    image: &RgbImage,
    positions: &[LedPosition],
    radius: u32,
    view: &ViewTransform,
) -> MeasurementSet {
    let mut results = MeasurementSet::new();
    let (width, height) = (image.width() as i64, image.height() as i64);
    let radius = radius as i64;

    for pos in positions {
        let (ox, oy) = view.to_original(pos.x as f64, pos.y as f64);
        let (ox, oy) = (ox as i64, oy as i64);

        // Clip the inclusive square region to image bounds
        let x1 = (ox - radius).max(0);
        let y1 = (oy - radius).max(0);
        let x2 = (ox + radius + 1).min(width);
        let y2 = (oy + radius + 1).min(height);

        if x1 >= x2 || y1 >= y2 {
            continue;
        }

        let mut sum = [0.0f64; 3];
        let mut count = 0u64;
        for y in y1..y2 {
            for x in x1..x2 {
                let px = image.get_pixel(x as u32, y as u32);
                sum[0] += px[0] as f64;
                sum[1] += px[1] as f64;
                sum[2] += px[2] as f64;
                count += 1;
            }
        }

        let r = sum[0] / count as f64;
        let g = sum[1] / count as f64;
        let b = sum[2] / count as f64;

        results.insert(
            (pos.row, pos.col),
            Measurement {
                brightness: luminance(r, g, b),
                r,
                g,
                b,
                interpolated: false,
            },
        );
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn uniform_image(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn test_uniform_region_returns_exact_color() {
        let image = uniform_image(50, 50, [120, 60, 30]);
        let positions = vec![LedPosition::new(25, 25, 0, 0)];
        let results = sample_positions(&image, &positions, 5, &ViewTransform::identity());

        let m = results.get(&(0, 0)).unwrap();
        assert_eq!(m.r, 120.0);
        assert_eq!(m.g, 60.0);
        assert_eq!(m.b, 30.0);
        let expected = 0.299 * 120.0 + 0.587 * 60.0 + 0.114 * 30.0;
        assert!((m.brightness - expected).abs() < 1e-9);
        assert!(!m.interpolated);
    }

    #[test]
    fn test_region_clipped_at_border() {
        // A position at the corner still produces a measurement from the
        // in-bounds quadrant of its region.
        let image = uniform_image(20, 20, [200, 200, 200]);
        let positions = vec![LedPosition::new(0, 0, 0, 0)];
        let results = sample_positions(&image, &positions, 5, &ViewTransform::identity());
        let m = results.get(&(0, 0)).unwrap();
        assert_eq!(m.r, 200.0);
    }

    #[test]
    fn test_out_of_bounds_position_omitted() {
        let image = uniform_image(20, 20, [200, 200, 200]);
        let positions = vec![
            LedPosition::new(100, 100, 0, 0),
            LedPosition::new(10, 10, 0, 1),
        ];
        let results = sample_positions(&image, &positions, 2, &ViewTransform::identity());
        assert!(!results.contains_key(&(0, 0)));
        assert!(results.contains_key(&(0, 1)));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_display_coords_mapped_to_original() {
        // Left half black, right half white; at scale 0.5, display x=30
        // maps to original x=60, inside the white half.
        let mut image = uniform_image(80, 40, [0, 0, 0]);
        for y in 0..40 {
            for x in 40..80 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let view = ViewTransform::fit_to_canvas(80, 40, 40, 20);
        assert_eq!(view.scale_factor(), 0.5);

        let positions = vec![LedPosition::new(30, 10, 0, 0)];
        let results = sample_positions(&image, &positions, 2, &view);
        let m = results.get(&(0, 0)).unwrap();
        assert_eq!(m.r, 255.0);
    }

    #[test]
    fn test_mixed_region_averages() {
        // 3x3 region centered on a single white pixel in a black image:
        // mean = 255 / 9 per channel.
        let mut image = uniform_image(9, 9, [0, 0, 0]);
        image.put_pixel(4, 4, Rgb([255, 255, 255]));
        let positions = vec![LedPosition::new(4, 4, 0, 0)];
        let results = sample_positions(&image, &positions, 1, &ViewTransform::identity());
        let m = results.get(&(0, 0)).unwrap();
        assert!((m.r - 255.0 / 9.0).abs() < 1e-9);
        assert!((m.brightness - luminance(m.r, m.g, m.b)).abs() < 1e-9);
    }
}
