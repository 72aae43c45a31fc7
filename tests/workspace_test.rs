mod common;

use common::{FakeRenderer, PageSpec, build_pdf, uniform_pdf, upload};
use pdf_workbench::config::Settings;
use pdf_workbench::filter::ColorMode;
use pdf_workbench::model::{
    CropRect, NumberingConfig, PageId, PageKind, RotateDirection, Rotation, WatermarkConfig,
};
use pdf_workbench::transform::Size;
use pdf_workbench::{ExportMode, WorkbenchError, Workspace};

fn ids(workspace: &Workspace) -> Vec<PageId> {
    workspace.pages().iter().map(|p| p.id).collect()
}

fn workspace_with_pages(count: usize) -> Workspace {
    let mut workspace = Workspace::default();
    workspace.upload([upload("doc.pdf", uniform_pdf(count, 200, 300))]);
    workspace
}

// ============================================================
// Upload
// ============================================================

#[test]
fn test_upload_appends_pages_in_source_order() {
    let mut workspace = Workspace::default();
    let report = workspace.upload([
        upload("a.pdf", uniform_pdf(2, 100, 100)),
        upload("b.pdf", uniform_pdf(3, 100, 100)),
    ]);
    assert_eq!(report.added.len(), 2);
    assert_eq!(report.added[1].page_count, 3);
    assert_eq!(workspace.pages().len(), 5);

    let a = report.added[0].source_id;
    let b = report.added[1].source_id;
    let origin: Vec<_> = workspace
        .pages()
        .iter()
        .map(|p| (p.source_id().unwrap(), p.source_page_index().unwrap()))
        .collect();
    assert_eq!(origin, vec![(a, 0), (a, 1), (b, 0), (b, 1), (b, 2)]);
}

#[test]
fn test_upload_rejects_bad_file_but_keeps_others() {
    let mut workspace = Workspace::default();
    let report = workspace.upload([
        upload("good.pdf", uniform_pdf(2, 100, 100)),
        upload("bad.pdf", b"garbage".to_vec()),
    ]);
    assert_eq!(report.added.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        WorkbenchError::UnreadableSource { name, .. } if name == "bad.pdf"
    ));
    assert_eq!(workspace.pages().len(), 2);
    assert_eq!(workspace.registry().len(), 1);
}

#[test]
fn test_upload_batch_is_one_undo_step() {
    let mut workspace = Workspace::default();
    workspace.upload([
        upload("a.pdf", uniform_pdf(2, 100, 100)),
        upload("b.pdf", uniform_pdf(1, 100, 100)),
    ]);
    assert_eq!(workspace.history().len(), 2);
    workspace.undo();
    assert!(workspace.pages().is_empty());
    workspace.redo();
    assert_eq!(workspace.pages().len(), 3);
}

#[test]
fn test_upload_of_only_bad_files_pushes_nothing() {
    let mut workspace = Workspace::default();
    workspace.upload([upload("bad.pdf", b"garbage".to_vec())]);
    assert!(!workspace.can_undo());
    assert!(workspace.pages().is_empty());
}

// ============================================================
// Mutations and history
// ============================================================

#[test]
fn test_rotate_delete_undo_scenario() {
    let mut workspace = workspace_with_pages(3);
    let all = ids(&workspace);
    let (p1, p2, p3) = (all[0], all[1], all[2]);

    workspace.rotate(&[p2], RotateDirection::Right).unwrap();
    workspace.delete(&[p1]).unwrap();
    assert_eq!(ids(&workspace), vec![p2, p3]);

    workspace.undo();
    assert_eq!(ids(&workspace), vec![p1, p2, p3]);
    assert_eq!(workspace.pages()[1].rotation, Rotation::R90);

    workspace.undo();
    assert_eq!(workspace.pages()[1].rotation, Rotation::R0);
}

#[test]
fn test_every_mutation_is_undoable() {
    let mut workspace = workspace_with_pages(2);
    let first = ids(&workspace)[0];
    let initial = workspace.state().clone();

    let steps: Vec<Box<dyn Fn(&mut Workspace)>> = vec![
        Box::new(move |w: &mut Workspace| {
            w.rotate(&[first], RotateDirection::Left).unwrap();
        }),
        Box::new(move |w: &mut Workspace| {
            w.crop(first, Some(CropRect::new(0.0, 0.0, 50.0, 50.0).unwrap()))
                .unwrap();
        }),
        Box::new(move |w: &mut Workspace| {
            w.apply_color_mode(&[first], ColorMode::Invert).unwrap();
        }),
        Box::new(move |w: &mut Workspace| {
            w.apply_watermark(&[first], WatermarkConfig::text("W")).unwrap();
        }),
        Box::new(move |w: &mut Workspace| {
            w.remove_watermark(&[first]).unwrap();
        }),
        Box::new(move |w: &mut Workspace| {
            w.duplicate(&[first]).unwrap();
        }),
        Box::new(|w: &mut Workspace| {
            w.reorder(0, 1).unwrap();
        }),
        Box::new(|w: &mut Workspace| {
            w.add_blank(Some(0)).unwrap();
        }),
        Box::new(|w: &mut Workspace| {
            w.set_numbering(NumberingConfig {
                enabled: true,
                ..NumberingConfig::default()
            })
            .unwrap();
        }),
    ];

    for step in &steps {
        let before = workspace.state().clone();
        step(&mut workspace);
        assert_ne!(*workspace.state(), before);
        workspace.undo();
        assert_eq!(*workspace.state(), before);
        workspace.redo();
    }

    for _ in &steps {
        workspace.undo();
    }
    assert_eq!(*workspace.state(), initial);
}

#[test]
fn test_new_action_after_undo_discards_redo() {
    let mut workspace = workspace_with_pages(2);
    let first = ids(&workspace)[0];
    workspace.rotate(&[first], RotateDirection::Right).unwrap();
    workspace.undo();
    assert!(workspace.can_redo());

    workspace.apply_color_mode(&[first], ColorMode::Sepia).unwrap();
    assert!(!workspace.can_redo());
    let before = workspace.state().clone();
    workspace.redo();
    assert_eq!(*workspace.state(), before);
}

#[test]
fn test_failed_mutation_changes_nothing() {
    let mut workspace = workspace_with_pages(2);
    let first = ids(&workspace)[0];
    let len = workspace.history().len();
    let before = workspace.state().clone();

    let bad_crop = CropRect {
        x: 80.0,
        y: 0.0,
        width: 40.0,
        height: 10.0,
    };
    assert!(matches!(
        workspace.crop(first, Some(bad_crop)),
        Err(WorkbenchError::InvalidCropGeometry(_))
    ));
    assert!(matches!(
        workspace.reorder(0, 7),
        Err(WorkbenchError::IndexOutOfRange { .. })
    ));
    let stranger = PageId::new();
    assert!(matches!(
        workspace.delete(&[stranger]),
        Err(WorkbenchError::UnknownPage(_))
    ));

    assert_eq!(workspace.history().len(), len);
    assert_eq!(*workspace.state(), before);
}

#[test]
fn test_color_mode_is_idempotent() {
    let mut workspace = workspace_with_pages(1);
    let first = ids(&workspace)[0];
    workspace.apply_color_mode(&[first], ColorMode::Grayscale).unwrap();
    let once = workspace.state().clone();
    workspace.apply_color_mode(&[first], ColorMode::Grayscale).unwrap();
    assert_eq!(*workspace.state(), once);
}

#[test]
fn test_duplicate_is_independent_copy() {
    let mut workspace = workspace_with_pages(1);
    let first = ids(&workspace)[0];
    workspace.duplicate(&[first]).unwrap();
    let copy = ids(&workspace)[1];
    assert_ne!(copy, first);

    workspace.rotate(&[copy], RotateDirection::Right).unwrap();
    assert_eq!(workspace.pages()[0].rotation, Rotation::R0);
    assert_eq!(workspace.pages()[1].rotation, Rotation::R90);
}

#[test]
fn test_history_limit_from_settings() {
    let settings = Settings {
        history_limit: 3,
        ..Settings::default()
    };
    let mut workspace = Workspace::new(settings).unwrap();
    for _ in 0..6 {
        workspace.add_blank(None).unwrap();
    }
    let mut undos = 0;
    while workspace.can_undo() {
        workspace.undo();
        undos += 1;
    }
    assert_eq!(undos, 2);
    assert_eq!(workspace.pages().len(), 4);
}

#[test]
fn test_new_rejects_invalid_settings() {
    let settings = Settings {
        raster_scale: 0.0,
        ..Settings::default()
    };
    assert!(matches!(
        Workspace::new(settings),
        Err(WorkbenchError::ConfigError(_))
    ));
}

#[test]
fn test_numbering_start_out_of_range_is_rejected() {
    let mut workspace = workspace_with_pages(2);
    let before = workspace.state().clone();
    let result = workspace.set_numbering(NumberingConfig {
        enabled: true,
        start_from: i64::MAX,
        ..NumberingConfig::default()
    });
    assert!(matches!(result, Err(WorkbenchError::ConfigError(_))));
    assert_eq!(*workspace.state(), before);
}

#[test]
fn test_reset_clears_everything() {
    let mut workspace = workspace_with_pages(2);
    workspace.reset();
    assert!(workspace.pages().is_empty());
    assert!(workspace.registry().is_empty());
    assert!(!workspace.can_undo());
}

// ============================================================
// Selection
// ============================================================

#[test]
fn test_selection_is_not_an_undo_step() {
    let mut workspace = workspace_with_pages(3);
    let all = ids(&workspace);
    let len = workspace.history().len();

    workspace.select(&all[..2], true);
    assert_eq!(workspace.state().selection().len(), 2);
    workspace.select_all();
    assert_eq!(workspace.state().selection().len(), 3);
    workspace.clear_selection();
    assert!(workspace.state().selection().is_empty());
    assert_eq!(workspace.history().len(), len);
}

#[test]
fn test_blank_page_at_position() {
    let mut workspace = workspace_with_pages(2);
    workspace.add_blank(Some(1)).unwrap();
    let kinds: Vec<PageKind> = workspace.pages().iter().map(|p| p.kind()).collect();
    assert_eq!(kinds, vec![PageKind::Original, PageKind::Blank, PageKind::Original]);
    assert!(workspace.add_blank(Some(10)).is_err());
}

// ============================================================
// Geometry
// ============================================================

#[test]
fn test_display_size_reflects_crop_and_rotation() {
    let mut workspace = Workspace::default();
    workspace.upload([upload("doc.pdf", build_pdf(&[PageSpec::new(200, 300)]))]);
    let id = ids(&workspace)[0];
    assert_eq!(workspace.display_size(id).unwrap(), Size::new(200.0, 300.0));

    workspace.rotate(&[id], RotateDirection::Right).unwrap();
    workspace
        .crop(id, Some(CropRect::new(0.0, 0.0, 50.0, 100.0).unwrap()))
        .unwrap();
    assert_eq!(workspace.display_size(id).unwrap(), Size::new(300.0, 100.0));
}

#[test]
fn test_display_size_matches_preview_on_rotated_source() {
    let mut workspace = Workspace::default();
    workspace.upload([upload(
        "rotated.pdf",
        build_pdf(&[PageSpec::new(200, 100).rotated(90)]),
    )]);
    let id = ids(&workspace)[0];
    assert_eq!(workspace.display_size(id).unwrap(), Size::new(100.0, 200.0));

    let renderer = FakeRenderer::new();
    let ticket = workspace.request_preview(id, 1.0).unwrap();
    let preview = workspace.render_preview(&ticket, &renderer).unwrap();
    assert_eq!(preview.dimensions(), (100, 200));

    workspace.rotate(&[id], RotateDirection::Left).unwrap();
    assert_eq!(workspace.display_size(id).unwrap(), Size::new(200.0, 100.0));
}

// ============================================================
// Export coordination
// ============================================================

#[test]
fn test_second_export_is_rejected_while_first_is_alive() {
    let mut workspace = workspace_with_pages(1);
    let job = workspace.begin_export(ExportMode::Merge).unwrap();
    assert!(matches!(
        workspace.begin_export(ExportMode::Split),
        Err(WorkbenchError::ExportInProgress)
    ));

    job.run(&FakeRenderer::new(), &mut |_| {}).unwrap();
    assert!(workspace.begin_export(ExportMode::Split).is_ok());
}

#[test]
fn test_export_uses_snapshot_taken_at_start() {
    let mut workspace = workspace_with_pages(2);
    let job = workspace.begin_export(ExportMode::Merge).unwrap();
    assert_eq!(job.page_count(), 2);

    // Edits during the export do not reach it.
    let first = ids(&workspace)[0];
    workspace.delete(&[first]).unwrap();
    let output = job.run(&FakeRenderer::new(), &mut |_| {}).unwrap();
    assert_eq!(output.report().pages, 2);
    assert_eq!(workspace.pages().len(), 1);
}

#[test]
fn test_export_job_can_run_on_another_thread() {
    let mut workspace = workspace_with_pages(2);
    let job = workspace.begin_export(ExportMode::Merge).unwrap();
    let handle = std::thread::spawn(move || job.run(&FakeRenderer::new(), &mut |_| {}));
    let output = handle.join().unwrap().unwrap();
    assert_eq!(output.report().pages, 2);
}
