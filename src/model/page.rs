// Page records: identity, source reference, accumulated edits

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkbenchError;
use crate::filter::ColorMode;
use crate::model::watermark::WatermarkConfig;
use crate::source::SourceId;

/// ISO A4 width in points.
pub const A4_WIDTH_PT: f64 = 595.28;
/// ISO A4 height in points.
pub const A4_HEIGHT_PT: f64 = 841.89;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// Where a page's content comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSource {
    Document { source_id: SourceId, page_index: u32 },
    Blank { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Original,
    Blank,
}

/// Page rotation, restricted to the four values PDF supports for lossless `/Rotate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Normalizes any multiple of 90 (negative included) into the enum.
    pub fn from_degrees(degrees: i64) -> crate::error::Result<Self> {
        if degrees % 90 != 0 {
            return Err(WorkbenchError::InvalidRotation(degrees));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::R0,
            90 => Rotation::R90,
            180 => Rotation::R180,
            _ => Rotation::R270,
        })
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Adds another rotation modulo 360.
    pub fn compose(self, other: Rotation) -> Rotation {
        match (self.degrees() + other.degrees()) % 360 {
            0 => Rotation::R0,
            90 => Rotation::R90,
            180 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    /// True when width and height trade places.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateDirection {
    Left,
    Right,
}

impl RotateDirection {
    pub fn as_rotation(self) -> Rotation {
        match self {
            RotateDirection::Left => Rotation::R270,
            RotateDirection::Right => Rotation::R90,
        }
    }
}

/// Crop rectangle in percent of the unrotated page box, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    /// Builds a crop rectangle, rejecting degenerate or out-of-page geometry.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> crate::error::Result<Self> {
        let rect = CropRect {
            x,
            y,
            width,
            height,
        };
        rect.validate()?;
        Ok(rect)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let values = [self.x, self.y, self.width, self.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(WorkbenchError::invalid_crop(format!(
                "non-finite value in {self:?}"
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(WorkbenchError::invalid_crop(format!(
                "zero-area crop {}x{}",
                self.width, self.height
            )));
        }
        if values.iter().any(|v| !(0.0..=100.0).contains(v)) {
            return Err(WorkbenchError::invalid_crop(format!(
                "values must lie within 0-100: {self:?}"
            )));
        }
        // Small tolerance for percentages produced by pixel arithmetic.
        if self.x + self.width > 100.0 + 1e-9 || self.y + self.height > 100.0 + 1e-9 {
            return Err(WorkbenchError::invalid_crop(format!(
                "crop extends past the page: {self:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: PageId,
    source: PageSource,
    pub rotation: Rotation,
    pub crop: Option<CropRect>,
    pub color_mode: ColorMode,
    pub watermark: Option<WatermarkConfig>,
    pub selected: bool,
}

impl Page {
    fn with_source(source: PageSource) -> Self {
        Page {
            id: PageId::new(),
            source,
            rotation: Rotation::R0,
            crop: None,
            color_mode: ColorMode::Original,
            watermark: None,
            selected: false,
        }
    }

    /// One page per source page, in source order, with no edits.
    pub fn create_from_source(source_id: SourceId, page_count: u32) -> Vec<Page> {
        (0..page_count)
            .map(|page_index| {
                Page::with_source(PageSource::Document {
                    source_id,
                    page_index,
                })
            })
            .collect()
    }

    pub fn create_blank(width: f64, height: f64) -> Page {
        Page::with_source(PageSource::Blank { width, height })
    }

    pub fn source(&self) -> PageSource {
        self.source
    }

    pub fn kind(&self) -> PageKind {
        match self.source {
            PageSource::Document { .. } => PageKind::Original,
            PageSource::Blank { .. } => PageKind::Blank,
        }
    }

    pub fn source_id(&self) -> Option<SourceId> {
        match self.source {
            PageSource::Document { source_id, .. } => Some(source_id),
            PageSource::Blank { .. } => None,
        }
    }

    pub fn source_page_index(&self) -> Option<u32> {
        match self.source {
            PageSource::Document { page_index, .. } => Some(page_index),
            PageSource::Blank { .. } => None,
        }
    }

    /// A value copy with a fresh id, independently editable.
    pub fn duplicate(&self) -> Page {
        Page {
            id: PageId::new(),
            ..self.clone()
        }
    }
}

/// Partial update applied by [`crate::model::PageModel::mutate`].
///
/// `crop` and `watermark` are `Some(None)` to clear and `Some(Some(..))` to set.
#[derive(Debug, Clone, Default)]
pub struct PagePatch {
    pub rotate_by: Option<Rotation>,
    pub crop: Option<Option<CropRect>>,
    pub color_mode: Option<ColorMode>,
    pub watermark: Option<Option<WatermarkConfig>>,
}

impl PagePatch {
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(Some(crop)) = &self.crop {
            crop.validate()?;
        }
        if let Some(Some(watermark)) = &self.watermark {
            watermark.validate()?;
        }
        Ok(())
    }

    pub fn apply(&self, page: &mut Page) {
        if let Some(delta) = self.rotate_by {
            page.rotation = page.rotation.compose(delta);
        }
        if let Some(crop) = self.crop {
            page.crop = crop;
        }
        if let Some(mode) = self.color_mode {
            page.color_mode = mode;
        }
        if let Some(watermark) = &self.watermark {
            page.watermark = watermark.clone();
        }
    }
}
