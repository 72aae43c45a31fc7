// Renderer adapter: source page -> pixels

#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod preview;

use image::{DynamicImage, RgbaImage};

use crate::filter::ColorMode;
use crate::source::SourceHandle;
use crate::transform::PageBox;

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRenderer;
pub use preview::{PreviewScheduler, PreviewTarget, PreviewTicket, render_preview};

/// Turns a source page into a raster.
///
/// Rasters are always the full, uncropped, unrotated page; `scale` is pixels
/// per point.
pub trait PageRenderer {
    fn render_page(
        &self,
        source: &SourceHandle,
        page_index: u32,
        scale: f32,
    ) -> crate::error::Result<DynamicImage>;

    /// Renders and applies `mode`.
    fn render_filtered(
        &self,
        source: &SourceHandle,
        page_index: u32,
        scale: f32,
        mode: ColorMode,
    ) -> crate::error::Result<RgbaImage> {
        let raster = self.render_page(source, page_index, scale)?;
        Ok(mode.apply_dynamic(&raster))
    }

    /// Visible page box in points, unrotated.
    fn page_box(&self, source: &SourceHandle, page_index: u32) -> crate::error::Result<PageBox> {
        source.reader().visible_box(page_index)
    }
}

/// Pixel dimensions of a page box rendered at `scale`, at least 1x1.
pub fn scaled_pixels(page_box: &PageBox, scale: f32) -> (u32, u32) {
    let px = |pt: f64| ((pt * scale as f64).round() as u32).max(1);
    (px(page_box.width()), px(page_box.height()))
}

/// Stand-in used when no rasterizer is available. Lossless exports still
/// work; any page that needs rendering fails with `RenderError`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRenderer;

impl PageRenderer for UnavailableRenderer {
    fn render_page(
        &self,
        _source: &SourceHandle,
        _page_index: u32,
        _scale: f32,
    ) -> crate::error::Result<DynamicImage> {
        Err(crate::error::WorkbenchError::render(
            "no renderer available (pdfium not loaded)",
        ))
    }
}
