use std::path::Path;

use serde::Deserialize;

use crate::model::page::{A4_HEIGHT_PT, A4_WIDTH_PT};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pixels per point when rasterizing filtered pages.
    pub raster_scale: f32,
    /// JPEG quality for embedded color rasters (1-100).
    pub raster_quality: u8,
    pub history_limit: usize,
    pub blank_width: f64,
    pub blank_height: f64,
    /// Distance from the page edge for corner-positioned watermarks, in points.
    pub stamp_margin: f64,
    /// Rows and columns of a tiled watermark.
    pub watermark_grid: u32,
    pub compress_streams: bool,
    pub archive_compression: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            raster_scale: 2.0,
            raster_quality: 90,
            history_limit: 20,
            blank_width: A4_WIDTH_PT,
            blank_height: A4_HEIGHT_PT,
            stamp_margin: 24.0,
            watermark_grid: 3,
            compress_streams: true,
            archive_compression: false,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::WorkbenchError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !(self.raster_scale.is_finite() && self.raster_scale > 0.0) {
            return Err(crate::error::WorkbenchError::config(format!(
                "raster_scale must be positive, got {}",
                self.raster_scale
            )));
        }
        if !(1..=100).contains(&self.raster_quality) {
            return Err(crate::error::WorkbenchError::config(format!(
                "raster_quality must be 1-100, got {}",
                self.raster_quality
            )));
        }
        if self.history_limit == 0 {
            return Err(crate::error::WorkbenchError::config(
                "history_limit must be at least 1",
            ));
        }
        if self.blank_width <= 0.0 || self.blank_height <= 0.0 {
            return Err(crate::error::WorkbenchError::config(
                "blank page dimensions must be positive",
            ));
        }
        if self.watermark_grid == 0 {
            return Err(crate::error::WorkbenchError::config(
                "watermark_grid must be at least 1",
            ));
        }
        Ok(())
    }
}
