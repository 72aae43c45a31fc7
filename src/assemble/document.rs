// Merge export: every page into one document

use tracing::info;

use crate::assemble::progress::{Progress, ProgressTracker};
use crate::assemble::{
    ASSEMBLE_END, ENCODE_END, ExportOutput, ExportReport, SourceMap, StampRefs, emit_page,
    log_failures, prepare,
};
use crate::config::Settings;
use crate::model::{NumberingConfig, Page};
use crate::pdf::writer::OutputDocument;
use crate::render::PageRenderer;

/// Assembles `pages` in order into a single PDF.
///
/// Fails without output when a page's source is missing or released.
pub fn assemble_document<R: PageRenderer + ?Sized>(
    pages: &[Page],
    sources: &SourceMap,
    numbering: &NumberingConfig,
    renderer: &R,
    settings: &Settings,
    progress: &mut dyn FnMut(Progress),
) -> crate::error::Result<ExportOutput> {
    let mut tracker = ProgressTracker::new(progress);
    let mut prepared = prepare(pages, sources, renderer, settings, &mut tracker)?;

    let mut doc = OutputDocument::new();
    let mut stamp_refs = StampRefs::default();
    for (seq, page) in pages.iter().enumerate() {
        tracker.step(
            ENCODE_END,
            ASSEMBLE_END,
            seq,
            pages.len(),
            format!("processing page {}", seq + 1),
        );
        emit_page(
            &mut doc,
            &mut stamp_refs,
            page,
            seq,
            sources,
            &mut prepared,
            numbering,
            settings,
        )?;
    }

    tracker.report(ASSEMBLE_END, "finalizing");
    let bytes = doc.finish(settings.compress_streams)?;
    log_failures(&prepared.failures);
    tracker.finish();

    info!(pages = pages.len(), bytes = bytes.len(), "assembled document");
    Ok(ExportOutput::Document {
        bytes,
        report: ExportReport {
            pages: pages.len(),
            embed_failures: prepared.failures,
        },
    })
}
