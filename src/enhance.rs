//! Dark-region enhancement pre-pass
//!
//! Optional transform applied to a working copy of the image before
//! sampling, so dim LEDs are measurable: gamma correction to lift dark
//! areas, then contrast-limited adaptive histogram equalization on the
//! luminance channel of a YCbCr working copy. Chrominance is carried
//! through untouched and the stored original image is never mutated.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Enhancement parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhanceParams {
    /// Gamma exponent; values < 1.0 brighten
    pub gamma: f32,
    /// CLAHE clip limit
    pub clip_limit: f32,
    /// CLAHE tile grid size (tiles per axis)
    pub tile_grid: u32,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            gamma: 0.5,
            clip_limit: 3.0,
            tile_grid: 8,
        }
    }
}

/// Precomputed 256-entry gamma table: out = 255 * (in / 255)^gamma
pub fn gamma_lut(gamma: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let v = (i as f32 / 255.0).powf(gamma);
        *entry = (v * 255.0).clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Enhance dark regions of the image. Deterministic for fixed inputs.
pub fn enhance_dark_regions(image: &RgbImage, params: &EnhanceParams) -> RgbImage {
    let (width, height) = image.dimensions();
    let lut = gamma_lut(params.gamma);

    // Gamma-correct into YCbCr planes. Chroma stays in f32 so it survives
    // the round trip unmodified.
    let pixels = (width as usize) * (height as usize);
    let mut luma = vec![0u8; pixels];
    let mut cb = vec![0.0f32; pixels];
    let mut cr = vec![0.0f32; pixels];

    for (i, px) in image.pixels().enumerate() {
        let r = lut[px[0] as usize] as f32;
        let g = lut[px[1] as usize] as f32;
        let b = lut[px[2] as usize] as f32;

        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        luma[i] = y.clamp(0.0, 255.0) as u8;
        cb[i] = 128.0 + (b - y) / 1.772;
        cr[i] = 128.0 + (r - y) / 1.402;
    }

    let equalized = clahe(
        &luma,
        width as usize,
        height as usize,
        params.tile_grid as usize,
        params.clip_limit,
    );

    // Back to RGB
    let mut out = RgbImage::new(width, height);
    for (i, px) in out.pixels_mut().enumerate() {
        let y = equalized[i] as f32;
        let r = y + 1.402 * (cr[i] - 128.0);
        let b = y + 1.772 * (cb[i] - 128.0);
        let g = (y - 0.299 * r - 0.114 * b) / 0.587;

        px[0] = r.clamp(0.0, 255.0) as u8;
        px[1] = g.clamp(0.0, 255.0) as u8;
        px[2] = b.clamp(0.0, 255.0) as u8;
    }

    out
}

/// Contrast-limited adaptive histogram equalization over a luma plane.
///
/// The plane is split into a `tiles` x `tiles` grid; each tile gets a
/// clipped-histogram equalization mapping, and every pixel blends the four
/// surrounding tile mappings bilinearly.
fn clahe(luma: &[u8], width: usize, height: usize, tiles: usize, clip_limit: f32) -> Vec<u8> {
    let tiles = tiles.max(1);
    let tile_w = width.div_ceil(tiles).max(1);
    let tile_h = height.div_ceil(tiles).max(1);

    // Per-tile equalization mappings
    let mut maps = vec![[0u8; 256]; tiles * tiles];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            if x0 >= width || y0 >= height {
                // Degenerate tile beyond a small image: identity mapping
                let map = &mut maps[ty * tiles + tx];
                for (i, entry) in map.iter_mut().enumerate() {
                    *entry = i as u8;
                }
                continue;
            }

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[luma[y * width + x] as usize] += 1;
                }
            }
            let total = ((x1 - x0) * (y1 - y0)) as u32;

            // Clip and redistribute the excess uniformly
            let clip = ((clip_limit * total as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let bonus = excess / 256;
            for bin in hist.iter_mut() {
                *bin += bonus;
            }
            // Spread the residual over evenly spaced bins so the CDF stays
            // close to linear for flat tiles
            let remainder = (excess % 256) as usize;
            if remainder > 0 {
                let step = (256 / remainder).max(1);
                for i in (0..256).step_by(step).take(remainder) {
                    hist[i] += 1;
                }
            }

            let map = &mut maps[ty * tiles + tx];
            let mut cum = 0u64;
            for i in 0..256 {
                cum += hist[i] as u64;
                map[i] = ((cum * 255) / total as u64).min(255) as u8;
            }
        }
    }

    // Bilinear blend of the four nearest tile mappings per pixel
    let mut out = vec![0u8; luma.len()];
    for y in 0..height {
        // Clamped tile-grid coordinate: border pixels use the nearest tile
        // mapping fully instead of extrapolating past the grid
        let gy = ((y as f32 + 0.5) / tile_h as f32 - 0.5).clamp(0.0, (tiles - 1) as f32);
        let ty0 = gy.floor() as usize;
        let wy = gy - ty0 as f32;
        let ty1 = (ty0 + 1).min(tiles - 1);

        for x in 0..width {
            let gx = ((x as f32 + 0.5) / tile_w as f32 - 0.5).clamp(0.0, (tiles - 1) as f32);
            let tx0 = gx.floor() as usize;
            let wx = gx - tx0 as f32;
            let tx1 = (tx0 + 1).min(tiles - 1);

            let v = luma[y * width + x] as usize;
            let m00 = maps[ty0 * tiles + tx0][v] as f32;
            let m10 = maps[ty0 * tiles + tx1][v] as f32;
            let m01 = maps[ty1 * tiles + tx0][v] as f32;
            let m11 = maps[ty1 * tiles + tx1][v] as f32;

            let top = m00 * (1.0 - wx) + m10 * wx;
            let bottom = m01 * (1.0 - wx) + m11 * wx;
            out[y * width + x] = (top * (1.0 - wy) + bottom * wy).clamp(0.0, 255.0) as u8;
        }
    }

    out
}
