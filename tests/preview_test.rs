mod common;

use common::{FakeRenderer, PageSpec, build_pdf, upload};
use image::Rgba;
use pdf_workbench::filter::ColorMode;
use pdf_workbench::model::{CropRect, PageId, RotateDirection};
use pdf_workbench::{WorkbenchError, Workspace};

fn workspace_with(spec: PageSpec) -> (Workspace, PageId) {
    let mut workspace = Workspace::default();
    workspace.upload([upload("doc.pdf", build_pdf(&[spec]))]);
    let id = workspace.pages()[0].id;
    (workspace, id)
}

// ============================================================
// Rendering
// ============================================================

#[test]
fn test_preview_applies_filter_crop_and_rotation() {
    let (mut workspace, id) = workspace_with(PageSpec::new(200, 100));
    workspace.apply_color_mode(&[id], ColorMode::Invert).unwrap();
    workspace
        .crop(id, Some(CropRect::new(0.0, 0.0, 50.0, 100.0).unwrap()))
        .unwrap();
    workspace.rotate(&[id], RotateDirection::Right).unwrap();

    let renderer = FakeRenderer::new();
    let ticket = workspace.request_preview(id, 1.0).unwrap();
    let image = workspace.render_preview(&ticket, &renderer).unwrap();

    // 200x100 -> crop to 100x100 -> quarter turn stays 100x100
    assert_eq!(image.dimensions(), (100, 100));
    let [r, g, b, _] = FakeRenderer::COLOR;
    assert_eq!(*image.get_pixel(0, 0), Rgba([255 - r, 255 - g, 255 - b, 255]));
}

#[test]
fn test_preview_composes_source_rotation() {
    let (mut workspace, id) = workspace_with(PageSpec::new(200, 100).rotated(90));
    let renderer = FakeRenderer::new();
    let ticket = workspace.request_preview(id, 1.0).unwrap();
    let image = workspace.render_preview(&ticket, &renderer).unwrap();
    assert_eq!(image.dimensions(), (100, 200));
}

#[test]
fn test_blank_preview_needs_no_renderer() {
    let mut workspace = Workspace::default();
    workspace.add_blank(None).unwrap();
    let id = workspace.pages()[0].id;

    let renderer = FakeRenderer::new();
    let ticket = workspace.request_preview(id, 0.5).unwrap();
    let image = workspace.render_preview(&ticket, &renderer).unwrap();
    assert_eq!(renderer.call_count(), 0);
    assert_eq!(*image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
}

#[test]
fn test_repeated_preview_hits_cache() {
    let (mut workspace, id) = workspace_with(PageSpec::new(100, 100));
    let renderer = FakeRenderer::new();
    for _ in 0..3 {
        let ticket = workspace.request_preview(id, 1.5).unwrap();
        workspace.render_preview(&ticket, &renderer).unwrap();
    }
    assert_eq!(renderer.call_count(), 1);

    // A different filter is a different raster.
    workspace.apply_color_mode(&[id], ColorMode::Sepia).unwrap();
    let ticket = workspace.request_preview(id, 1.5).unwrap();
    workspace.render_preview(&ticket, &renderer).unwrap();
    assert_eq!(renderer.call_count(), 2);
}

// ============================================================
// Cancellation
// ============================================================

#[test]
fn test_superseded_ticket_is_cancelled() {
    let (mut workspace, id) = workspace_with(PageSpec::new(100, 100));
    let renderer = FakeRenderer::new();

    let stale = workspace.request_preview(id, 1.0).unwrap();
    let fresh = workspace.request_preview(id, 2.0).unwrap();
    assert!(stale.is_cancelled());
    assert!(!fresh.is_cancelled());

    assert!(matches!(
        workspace.render_preview(&stale, &renderer),
        Err(WorkbenchError::PreviewCancelled)
    ));
    assert_eq!(renderer.call_count(), 0);
    assert_eq!(
        workspace.render_preview(&fresh, &renderer).unwrap().dimensions(),
        (200, 200)
    );
}

#[test]
fn test_reset_cancels_outstanding_preview() {
    let (mut workspace, id) = workspace_with(PageSpec::new(100, 100));
    let ticket = workspace.request_preview(id, 1.0).unwrap();
    workspace.reset();
    assert!(ticket.is_cancelled());
}

#[test]
fn test_preview_of_unknown_page() {
    let mut workspace = Workspace::default();
    assert!(matches!(
        workspace.request_preview(PageId::new(), 1.0),
        Err(WorkbenchError::UnknownPage(_))
    ));
}
