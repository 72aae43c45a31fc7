use std::sync::Arc;

use serde::Deserialize;

use crate::error::WorkbenchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    #[default]
    Center,
    Tiled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatermarkKind {
    Text {
        text: String,
        font_size: f64,
        /// RGB components in 0.0-1.0.
        color: [f64; 3],
    },
    /// Encoded image bytes (PNG, JPEG, ...), decoded at export time.
    Image { data: Arc<[u8]> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    pub kind: WatermarkKind,
    pub opacity: f64,
    /// Counter-clockwise rotation of the stamp in degrees.
    pub rotation: f64,
    pub scale: f64,
    pub position: StampPosition,
}

impl WatermarkConfig {
    pub fn text(text: impl Into<String>) -> Self {
        WatermarkConfig {
            kind: WatermarkKind::Text {
                text: text.into(),
                font_size: 48.0,
                color: [0.5, 0.5, 0.5],
            },
            opacity: 0.5,
            rotation: 0.0,
            scale: 1.0,
            position: StampPosition::Center,
        }
    }

    pub fn image(data: impl Into<Arc<[u8]>>) -> Self {
        WatermarkConfig {
            kind: WatermarkKind::Image { data: data.into() },
            opacity: 0.5,
            rotation: 0.0,
            scale: 1.0,
            position: StampPosition::Center,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_position(mut self, position: StampPosition) -> Self {
        self.position = position;
        self
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WorkbenchError::config(format!(
                "watermark opacity must be 0-1, got {}",
                self.opacity
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(WorkbenchError::config(format!(
                "watermark scale must be positive, got {}",
                self.scale
            )));
        }
        if !self.rotation.is_finite() {
            return Err(WorkbenchError::config("watermark rotation must be finite"));
        }
        match &self.kind {
            WatermarkKind::Text {
                text, font_size, ..
            } => {
                if text.is_empty() {
                    return Err(WorkbenchError::config("watermark text is empty"));
                }
                if *font_size <= 0.0 {
                    return Err(WorkbenchError::config("watermark font size must be positive"));
                }
            }
            WatermarkKind::Image { data } => {
                if data.is_empty() {
                    return Err(WorkbenchError::config("watermark image is empty"));
                }
            }
        }
        Ok(())
    }
}
