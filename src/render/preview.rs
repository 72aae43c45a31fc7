// Cancellable high-resolution preview rendering

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::{Rgba, RgbaImage, imageops};
use tracing::debug;

use crate::error::WorkbenchError;
use crate::model::{Page, PageSource, Rotation};
use crate::render::PageRenderer;
use crate::source::SourceRegistry;
use crate::transform::PageBox;

/// What the preview pane wants to show.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewTarget {
    pub page: Page,
    pub scale: f32,
}

/// Hands out tickets; requesting a new target supersedes every older ticket.
#[derive(Debug, Default)]
pub struct PreviewScheduler {
    generation: Arc<AtomicU64>,
}

impl PreviewScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, target: PreviewTarget) -> PreviewTicket {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        PreviewTicket {
            generation,
            latest: Arc::clone(&self.generation),
            target,
        }
    }

    /// Supersedes any in-flight render without starting a new one.
    pub fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[derive(Debug, Clone)]
pub struct PreviewTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
    target: PreviewTarget,
}

impl PreviewTicket {
    pub fn target(&self) -> &PreviewTarget {
        &self.target
    }

    pub fn is_cancelled(&self) -> bool {
        self.latest.load(Ordering::Acquire) != self.generation
    }

    pub fn check(&self) -> crate::error::Result<()> {
        if self.is_cancelled() {
            return Err(WorkbenchError::PreviewCancelled);
        }
        Ok(())
    }
}

/// Renders the ticket's page as it will look once exported: filtered,
/// cropped and rotated. Watermarks and numbers are not drawn.
///
/// Fails with `PreviewCancelled` when a newer request arrived before or
/// during the render; the stale raster is discarded.
pub fn render_preview<R: PageRenderer + ?Sized>(
    registry: &mut SourceRegistry,
    renderer: &R,
    ticket: &PreviewTicket,
) -> crate::error::Result<RgbaImage> {
    ticket.check()?;
    let PreviewTarget { page, scale } = ticket.target();

    let mut base_rotation = Rotation::R0;
    let full = match page.source() {
        PageSource::Blank { width, height } => {
            let (w, h) = super::scaled_pixels(&PageBox::from_size(width, height), *scale);
            Arc::new(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
        }
        PageSource::Document {
            source_id,
            page_index,
        } => {
            let handle = registry.handle(source_id)?;
            base_rotation = Rotation::from_degrees(handle.reader().page_rotation(page_index)?)?;
            match registry.cached_preview(source_id, page_index, *scale, page.color_mode) {
                Some(raster) => raster,
                None => {
                    let raster =
                        renderer.render_filtered(&handle, page_index, *scale, page.color_mode)?;
                    if ticket.is_cancelled() {
                        debug!(page = %page.id, "dropping superseded preview");
                        return Err(WorkbenchError::PreviewCancelled);
                    }
                    let raster = Arc::new(raster);
                    registry.cache_preview(
                        source_id,
                        page_index,
                        *scale,
                        page.color_mode,
                        Arc::clone(&raster),
                    );
                    raster
                }
            }
        }
    };

    let mut view = match &page.crop {
        Some(crop) => {
            let (w, h) = full.dimensions();
            let x = (crop.x / 100.0 * w as f64).round() as u32;
            let y = (crop.y / 100.0 * h as f64).round() as u32;
            let cw = ((crop.width / 100.0 * w as f64).round() as u32).clamp(1, w - x.min(w - 1));
            let ch = ((crop.height / 100.0 * h as f64).round() as u32).clamp(1, h - y.min(h - 1));
            imageops::crop_imm(full.as_ref(), x.min(w - 1), y.min(h - 1), cw, ch).to_image()
        }
        None => full.as_ref().clone(),
    };
    view = match base_rotation.compose(page.rotation) {
        Rotation::R0 => view,
        Rotation::R90 => imageops::rotate90(&view),
        Rotation::R180 => imageops::rotate180(&view),
        Rotation::R270 => imageops::rotate270(&view),
    };

    ticket.check()?;
    Ok(view)
}

