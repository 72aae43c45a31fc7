// pdfium-render backed PageRenderer (in-memory only)

use std::path::PathBuf;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::WorkbenchError;
use crate::render::{PageRenderer, scaled_pixels};
use crate::source::SourceHandle;

/// Resolves the path to the pdfium shared library.
///
/// Search order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` environment variable
/// 2. `vendor/pdfium/lib/` relative to the project root (for development)
fn resolve_pdfium_lib_path() -> crate::error::Result<PathBuf> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Ok(p);
        }
        return Err(WorkbenchError::render(format!(
            "PDFIUM_DYNAMIC_LIB_PATH is set to '{}' but the path does not exist",
            path
        )));
    }

    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let vendor_path = PathBuf::from(&manifest_dir).join("vendor/pdfium/lib");
        if vendor_path.exists() {
            return Ok(vendor_path);
        }
    }

    Err(WorkbenchError::render(
        "pdfium library not found: set PDFIUM_DYNAMIC_LIB_PATH or place libpdfium.so in vendor/pdfium/lib/",
    ))
}

/// Renders source pages with a dynamically loaded pdfium.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    /// Binds to the pdfium shared library.
    pub fn new() -> crate::error::Result<Self> {
        let lib_path = resolve_pdfium_lib_path()?;
        let lib_path_str = lib_path.to_str().ok_or_else(|| {
            WorkbenchError::render("pdfium library path contains non-UTF-8 characters")
        })?;
        let bindings =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(lib_path_str))?;
        debug!(path = %lib_path.display(), "bound pdfium");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_page(
        &self,
        source: &SourceHandle,
        page_index: u32,
        scale: f32,
    ) -> crate::error::Result<DynamicImage> {
        source.ensure_available()?;
        // Target size comes from lopdf's MediaBox so rasters match the
        // geometry the assembler computes.
        let page_box = self.page_box(source, page_index)?;
        let (width_px, height_px) = scaled_pixels(&page_box, scale);

        let document = self.pdfium.load_pdf_from_byte_slice(source.bytes(), None)?;
        let page_index_u16 = u16::try_from(page_index)
            .map_err(|_| WorkbenchError::render("page index exceeds u16 range"))?;
        let page = document.pages().get(page_index_u16)?;

        // pdfium renders in display orientation; turn the raster back so it
        // is the unrotated page.
        let rotation = source.reader().page_rotation(page_index)?;
        let (target_w, target_h) = if rotation % 180 == 90 {
            (height_px, width_px)
        } else {
            (width_px, height_px)
        };

        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_target_height(target_h as i32);

        let image = page.render_with_config(&config)?.as_image();
        let image = match rotation {
            90 => image.rotate270(),
            180 => image.rotate180(),
            270 => image.rotate90(),
            _ => image,
        };
        debug!(source = %source.id(), page_index, scale, "rendered page");
        Ok(image)
    }
}
