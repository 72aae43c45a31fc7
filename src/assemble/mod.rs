// Export assembly: shared per-page pipeline for merge and split output
//
// Phases:
//   1. render:    rasterize pages with a color filter (sequential, renderer-bound)
//   2. encode:    apply filters and encode rasters, decode stamp images (rayon)
//   3. assemble:  create, crop, rotate, stamp and number each page (sequential)

pub mod archive;
pub mod document;
pub mod progress;
mod stamp;

use std::collections::HashMap;
use std::sync::Arc;

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::WorkbenchError;
use crate::model::{NumberingConfig, Page, PageId, PageKind, PageSource, Rotation, WatermarkKind};
use crate::pdf::image_xobject::{EncodedImage, StampImage, decode_stamp_image, encode_page_raster};
use crate::pdf::writer::{ImageRef, OutputDocument, PageRef};
use crate::render::PageRenderer;
use crate::source::{SourceHandle, SourceId};
use crate::transform::{crop_box, raster_layout, requires_rasterization, visible_frame};

pub use archive::assemble_archive;
pub use document::assemble_document;
pub use progress::Progress;

use progress::ProgressTracker;

/// Source handles an export may read, keyed by id.
pub type SourceMap = HashMap<SourceId, SourceHandle>;

/// Progress spans of the three phases.
const RENDER_END: f64 = 0.4;
const ENCODE_END: f64 = 0.5;
const ASSEMBLE_END: f64 = 0.95;

/// A visual element that could not be embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedFailure {
    pub page_id: PageId,
    /// Position of the page in the exported sequence (0-based).
    pub sequence_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub pages: usize,
    pub embed_failures: Vec<EmbedFailure>,
}

#[derive(Debug, Clone)]
pub enum ExportOutput {
    /// Merge mode: one document.
    Document { bytes: Vec<u8>, report: ExportReport },
    /// Split mode: an archive of single-page documents, with entry names in order.
    Archive {
        bytes: Vec<u8>,
        entries: Vec<String>,
        report: ExportReport,
    },
}

impl ExportOutput {
    pub fn bytes(&self) -> &[u8] {
        match self {
            ExportOutput::Document { bytes, .. } | ExportOutput::Archive { bytes, .. } => bytes,
        }
    }

    pub fn report(&self) -> &ExportReport {
        match self {
            ExportOutput::Document { report, .. } | ExportOutput::Archive { report, .. } => report,
        }
    }
}

/// Rasterized page ready for embedding.
struct PreparedRaster {
    image: EncodedImage,
    pixel_width: u32,
    pixel_height: u32,
}

/// Everything computed before pages are written.
struct Prepared {
    rasters: HashMap<usize, PreparedRaster>,
    /// Decoded stamp images keyed by the address of their shared bytes.
    stamps: HashMap<usize, StampImage>,
    failures: Vec<EmbedFailure>,
}

fn stamp_key(data: &Arc<[u8]>) -> usize {
    Arc::as_ptr(data) as *const u8 as usize
}

fn handle_for<'a>(sources: &'a SourceMap, id: SourceId) -> crate::error::Result<&'a SourceHandle> {
    let handle = sources.get(&id).ok_or(WorkbenchError::SourceUnavailable(id))?;
    handle.ensure_available()?;
    Ok(handle)
}

/// Fails with `SourceUnavailable` before any work when a page's source is gone.
fn check_sources(pages: &[Page], sources: &SourceMap) -> crate::error::Result<()> {
    for page in pages {
        if let Some(id) = page.source_id() {
            handle_for(sources, id)?;
        }
    }
    Ok(())
}

/// Phases 1 and 2.
fn prepare<R: PageRenderer + ?Sized>(
    pages: &[Page],
    sources: &SourceMap,
    renderer: &R,
    settings: &Settings,
    tracker: &mut ProgressTracker<'_>,
) -> crate::error::Result<Prepared> {
    check_sources(pages, sources)?;

    let to_render: Vec<(usize, &Page)> = pages
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind() == PageKind::Original && requires_rasterization(p))
        .collect();

    let mut rendered: Vec<(usize, DynamicImage)> = Vec::with_capacity(to_render.len());
    for (done, (seq, page)) in to_render.iter().enumerate() {
        tracker.step(
            0.0,
            RENDER_END,
            done,
            to_render.len(),
            format!("rendering page {}", seq + 1),
        );
        let PageSource::Document {
            source_id,
            page_index,
        } = page.source()
        else {
            continue;
        };
        let handle = handle_for(sources, source_id)?;
        let raster = renderer.render_page(handle, page_index, settings.raster_scale)?;
        rendered.push((*seq, raster));
    }

    tracker.report(RENDER_END, "filtering pages");
    let quality = settings.raster_quality;
    let encoded: Vec<(usize, crate::error::Result<PreparedRaster>)> = rendered
        .into_par_iter()
        .map(|(seq, raster)| {
            let mode = pages[seq].color_mode;
            let filtered = mode.apply_dynamic(&raster);
            let (pixel_width, pixel_height) = filtered.dimensions();
            let prepared = encode_page_raster(&filtered, mode.is_monochrome(), quality).map(
                |image| PreparedRaster {
                    image,
                    pixel_width,
                    pixel_height,
                },
            );
            (seq, prepared)
        })
        .collect();

    // A raster that cannot be encoded falls back to the unfiltered copy.
    let mut failures = Vec::new();
    let mut rasters = HashMap::new();
    for (seq, result) in encoded {
        match result {
            Ok(raster) => {
                rasters.insert(seq, raster);
            }
            Err(e) => failures.push(EmbedFailure {
                page_id: pages[seq].id,
                sequence_index: seq,
                reason: e.to_string(),
            }),
        }
    }

    let mut stamp_data: HashMap<usize, Arc<[u8]>> = HashMap::new();
    for page in pages {
        if let Some(WatermarkKind::Image { data }) = page.watermark.as_ref().map(|w| &w.kind) {
            stamp_data.entry(stamp_key(data)).or_insert_with(|| Arc::clone(data));
        }
    }
    let decoded: Vec<(usize, crate::error::Result<StampImage>)> = stamp_data
        .into_par_iter()
        .map(|(key, data)| (key, decode_stamp_image(&data)))
        .collect();

    let mut stamps = HashMap::new();
    let mut stamp_errors = HashMap::new();
    for (key, result) in decoded {
        match result {
            Ok(stamp) => {
                stamps.insert(key, stamp);
            }
            Err(e) => {
                stamp_errors.insert(key, e.to_string());
            }
        }
    }

    for (seq, page) in pages.iter().enumerate() {
        if let Some(WatermarkKind::Image { data }) = page.watermark.as_ref().map(|w| &w.kind)
            && let Some(reason) = stamp_errors.get(&stamp_key(data))
        {
            failures.push(EmbedFailure {
                page_id: page.id,
                sequence_index: seq,
                reason: reason.clone(),
            });
        }
    }

    failures.sort_by_key(|f| f.sequence_index);
    tracker.report(ENCODE_END, "assembling pages");
    Ok(Prepared {
        rasters,
        stamps,
        failures,
    })
}

/// Per-document cache of embedded stamp images.
#[derive(Default)]
struct StampRefs {
    refs: HashMap<usize, ImageRef>,
}

impl StampRefs {
    fn get_or_embed(
        &mut self,
        doc: &mut OutputDocument,
        prepared: &Prepared,
        data: &Arc<[u8]>,
    ) -> Option<ImageRef> {
        let key = stamp_key(data);
        if let Some(image) = self.refs.get(&key) {
            return Some(*image);
        }
        let stamp = prepared.stamps.get(&key)?;
        let image = doc.embed_stamp(stamp.clone());
        self.refs.insert(key, image);
        Some(image)
    }
}

/// Phase 3 for one page: steps 1-4 in their fixed order.
#[allow(clippy::too_many_arguments)]
fn emit_page(
    doc: &mut OutputDocument,
    stamp_refs: &mut StampRefs,
    page: &Page,
    seq: usize,
    sources: &SourceMap,
    prepared: &mut Prepared,
    numbering: &NumberingConfig,
    settings: &Settings,
) -> crate::error::Result<PageRef> {
    // 1. Create the output page.
    let (page_ref, base_rotation) = match page.source() {
        PageSource::Blank { width, height } => {
            let page_ref = doc.add_blank_page(width, height);
            if let Some(crop) = &page.crop {
                let media = doc.media_box(page_ref)?;
                doc.set_crop_box(page_ref, &crop_box(crop, &media))?;
            }
            (page_ref, 0)
        }
        PageSource::Document {
            source_id,
            page_index,
        } => {
            let handle = handle_for(sources, source_id)?;
            let base_rotation = handle.reader().page_rotation(page_index)?;
            let page_ref = match prepared.rasters.remove(&seq) {
                Some(raster) => {
                    let layout = raster_layout(
                        page.crop.as_ref(),
                        raster.pixel_width,
                        raster.pixel_height,
                        settings.raster_scale as f64,
                    );
                    let image = doc.embed_raster(raster.image);
                    doc.add_image_page(
                        layout.page.width,
                        layout.page.height,
                        &image,
                        (
                            layout.image_x,
                            layout.image_y,
                            layout.image_width,
                            layout.image_height,
                        ),
                    )?
                }
                None => {
                    let page_ref = doc.copy_page(source_id, handle.reader(), page_index)?;
                    if let Some(crop) = &page.crop {
                        let visible = handle.reader().visible_box(page_index)?;
                        doc.set_crop_box(page_ref, &crop_box(crop, &visible))?;
                    }
                    page_ref
                }
            };
            (page_ref, base_rotation)
        }
    };

    // 2. Rotation, added to whatever the page already carries.
    let final_rotation = Rotation::from_degrees(base_rotation)?.compose(page.rotation);
    doc.set_rotation(page_ref, final_rotation.degrees())?;

    let frame = visible_frame(&doc.visible_box(page_ref)?, final_rotation);

    // 3. Watermark.
    if let Some(watermark) = &page.watermark {
        let image = match &watermark.kind {
            WatermarkKind::Image { data } => stamp_refs.get_or_embed(doc, prepared, data),
            WatermarkKind::Text { .. } => None,
        };
        stamp::draw_watermark(doc, page_ref, &frame, watermark, image.as_ref(), settings)?;
    }

    // 4. Page number.
    if numbering.applies_to(page.selected) {
        let label = numbering.label(seq)?;
        stamp::draw_page_number(doc, page_ref, &frame, numbering, &label)?;
    }

    debug!(page = %page.id, seq, rotation = final_rotation.degrees(), "emitted page");
    Ok(page_ref)
}

/// Logs all embed failures of a run in one place.
fn log_failures(failures: &[EmbedFailure]) {
    if failures.is_empty() {
        return;
    }
    let pages: Vec<usize> = failures.iter().map(|f| f.sequence_index + 1).collect();
    warn!(
        count = failures.len(),
        pages = ?pages,
        reason = %failures[0].reason,
        "page elements could not be embedded; pages exported without them"
    );
}
