// Split export: one single-page document per page, collected into a tar archive

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

use crate::assemble::progress::{Progress, ProgressTracker};
use crate::assemble::{
    ASSEMBLE_END, ENCODE_END, ExportOutput, ExportReport, SourceMap, StampRefs, emit_page,
    log_failures, prepare,
};
use crate::config::Settings;
use crate::error::WorkbenchError;
use crate::model::{NumberingConfig, Page};
use crate::pdf::writer::OutputDocument;
use crate::render::PageRenderer;

/// Entry name for the page at `sequence_index` (0-based) of `total`.
///
/// Zero-padded to three digits, or wider when the count needs it, so names
/// sort in page order.
pub fn entry_name(sequence_index: usize, total: usize) -> String {
    let width = total.to_string().len().max(3);
    format!("page-{:0width$}.pdf", sequence_index + 1)
}

/// Packs `entries` into a tar stream, gzip-compressed when `gzip` is set.
pub fn write_archive(entries: &[(String, Vec<u8>)], gzip: bool) -> crate::error::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data.as_slice())
            .map_err(|e| WorkbenchError::archive(format!("cannot add {name}: {e}")))?;
    }
    let tar_bytes = builder
        .into_inner()
        .map_err(|e| WorkbenchError::archive(e.to_string()))?;

    if !gzip {
        return Ok(tar_bytes);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&tar_bytes)
        .map_err(|e| WorkbenchError::archive(format!("gzip failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| WorkbenchError::archive(format!("gzip failed: {e}")))
}

/// Assembles each page into its own PDF and archives them in sequence order.
pub fn assemble_archive<R: PageRenderer + ?Sized>(
    pages: &[Page],
    sources: &SourceMap,
    numbering: &NumberingConfig,
    renderer: &R,
    settings: &Settings,
    progress: &mut dyn FnMut(Progress),
) -> crate::error::Result<ExportOutput> {
    let mut tracker = ProgressTracker::new(progress);
    let mut prepared = prepare(pages, sources, renderer, settings, &mut tracker)?;

    let mut files = Vec::with_capacity(pages.len());
    for (seq, page) in pages.iter().enumerate() {
        tracker.step(
            ENCODE_END,
            ASSEMBLE_END,
            seq,
            pages.len(),
            format!("processing page {}", seq + 1),
        );
        let mut doc = OutputDocument::new();
        let mut stamp_refs = StampRefs::default();
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
        let bytes = doc.finish(settings.compress_streams)?;
        files.push((entry_name(seq, pages.len()), bytes));
    }

    tracker.report(ASSEMBLE_END, "finalizing");
    let bytes = write_archive(&files, settings.archive_compression)?;
    log_failures(&prepared.failures);
    tracker.finish();

    info!(pages = pages.len(), bytes = bytes.len(), "assembled archive");
    Ok(ExportOutput::Archive {
        bytes,
        entries: files.into_iter().map(|(name, _)| name).collect(),
        report: ExportReport {
            pages: pages.len(),
            embed_failures: prepared.failures,
        },
    })
}
