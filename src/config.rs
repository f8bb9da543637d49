//! Configuration management for PixelQ

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::enhance::EnhanceParams;

/// Display canvas dimensions used for the fit scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// LED array and sampling configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    /// Array size n for an n×n grid
    pub array_size: u32,
    /// Half-width of the square sampling region, in original-image pixels.
    /// Valid range 3..=15.
    pub sampling_radius: u32,
}

pub const MIN_SAMPLING_RADIUS: u32 = 3;
pub const MAX_SAMPLING_RADIUS: u32 = 15;

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            array_size: 8,
            sampling_radius: 5,
        }
    }
}

/// Measurement tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Brightness below this is treated as unreliable and interpolated
    pub dark_threshold: f64,
    /// Interpolated value as a fraction of the neighbor mean
    pub dark_factor: f64,
    /// Run the dark-region enhancement pre-pass before sampling
    pub enhance_dark_leds: bool,
    /// Enhancement parameters (gamma, CLAHE clip limit, tile grid)
    #[serde(default)]
    pub enhancement: EnhanceParams,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 10.0,
            dark_factor: 0.1,
            enhance_dark_leds: true,
            enhancement: EnhanceParams::default(),
        }
    }
}

/// Zoom range and step
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoomConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 5.0,
            step: 0.1,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub measure: MeasureConfig,

    #[serde(default)]
    pub zoom: ZoomConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Sampling radius clamped to the supported range
    pub fn clamped_sampling_radius(&self) -> u32 {
        let radius = self.grid.sampling_radius;
        let clamped = radius.clamp(MIN_SAMPLING_RADIUS, MAX_SAMPLING_RADIUS);
        if clamped != radius {
            tracing::warn!(
                "sampling radius {} out of range, clamped to {}",
                radius,
                clamped
            );
        }
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.grid.array_size, 8);
        assert_eq!(config.grid.sampling_radius, 5);
        assert_eq!(config.measure.dark_threshold, 10.0);
        assert!(config.measure.enhance_dark_leds);
        assert_eq!(config.measure.enhancement.tile_grid, 8);
    }

    #[test]
    fn test_radius_clamping() {
        let mut config = Config::default();
        config.grid.sampling_radius = 50;
        assert_eq!(config.clamped_sampling_radius(), 15);
        config.grid.sampling_radius = 1;
        assert_eq!(config.clamped_sampling_radius(), 3);
        config.grid.sampling_radius = 7;
        assert_eq!(config.clamped_sampling_radius(), 7);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.grid.array_size, config.grid.array_size);
        assert_eq!(parsed.zoom.max_zoom, config.zoom.max_zoom);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[grid]\narray_size = 16\nsampling_radius = 4\n").unwrap();
        assert_eq!(parsed.grid.array_size, 16);
        assert_eq!(parsed.canvas.width, 800);
        assert_eq!(parsed.measure.dark_factor, 0.1);
    }
}
