mod common;

use std::path::Path;

use common::{FakeRenderer, PageSpec, build_pdf, load_output, page_images, uniform_pdf, upload};
use pdf_workbench::config::Settings;
use pdf_workbench::config::job::{Action, JobFile, PageSelector};
use pdf_workbench::config::merged::MergedConfig;
use pdf_workbench::model::{PageKind, Rotation, RotateDirection};
use pdf_workbench::pipeline::job_runner::{JobConfig, apply_action, resolve_path, run_all_jobs};
use pdf_workbench::{WorkbenchError, Workspace};

fn workspace_with_pages(count: usize) -> Workspace {
    let mut workspace = Workspace::default();
    workspace.upload([upload("doc.pdf", uniform_pdf(count, 200, 300))]);
    workspace
}

fn job_configs(dir: &Path, yaml: &str) -> Vec<JobConfig> {
    let job_file: JobFile = serde_yml::from_str(yaml).unwrap();
    job_file
        .jobs
        .into_iter()
        .map(|job| JobConfig {
            merged: MergedConfig::new(&Settings::default(), &job).unwrap(),
            job,
            base_dir: dir.to_path_buf(),
        })
        .collect()
}

// ============================================================
// apply_action
// ============================================================

#[test]
fn test_positions_are_one_based() {
    let mut workspace = workspace_with_pages(3);
    let second = workspace.pages()[1].id;
    apply_action(
        &mut workspace,
        &Action::Rotate {
            pages: PageSelector::Positions(vec![2]),
            direction: RotateDirection::Right,
        },
        Path::new("."),
    )
    .unwrap();
    assert_eq!(workspace.pages()[1].id, second);
    assert_eq!(workspace.pages()[1].rotation, Rotation::R90);
    assert_eq!(workspace.pages()[0].rotation, Rotation::R0);
}

#[test]
fn test_position_past_end_fails() {
    let mut workspace = workspace_with_pages(2);
    let result = apply_action(
        &mut workspace,
        &Action::Delete {
            pages: PageSelector::Positions(vec![3]),
        },
        Path::new("."),
    );
    assert!(matches!(result, Err(WorkbenchError::IndexOutOfRange { .. })));
    assert_eq!(workspace.pages().len(), 2);
}

#[test]
fn test_reorder_and_add_blank_positions() {
    let mut workspace = workspace_with_pages(3);
    let last = workspace.pages()[2].id;
    apply_action(&mut workspace, &Action::Reorder { from: 3, to: 1 }, Path::new(".")).unwrap();
    assert_eq!(workspace.pages()[0].id, last);

    apply_action(&mut workspace, &Action::AddBlank { at: Some(2) }, Path::new(".")).unwrap();
    assert_eq!(workspace.pages()[1].kind(), PageKind::Blank);
    assert!(apply_action(&mut workspace, &Action::Reorder { from: 0, to: 1 }, Path::new(".")).is_err());
}

#[test]
fn test_undo_redo_actions() {
    let mut workspace = workspace_with_pages(2);
    apply_action(
        &mut workspace,
        &Action::Delete {
            pages: PageSelector::All,
        },
        Path::new("."),
    )
    .unwrap();
    assert!(workspace.pages().is_empty());
    apply_action(&mut workspace, &Action::Undo, Path::new(".")).unwrap();
    assert_eq!(workspace.pages().len(), 2);
    apply_action(&mut workspace, &Action::Redo, Path::new(".")).unwrap();
    assert!(workspace.pages().is_empty());
}

// ============================================================
// run_all_jobs
// ============================================================

#[test]
fn test_run_all_jobs_empty() {
    let results = run_all_jobs(&[], &FakeRenderer::new());
    assert!(results.is_empty());
}

#[test]
fn test_image_watermark_path_is_relative_to_job() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.pdf"), build_pdf(&[PageSpec::new(300, 300)])).unwrap();
    std::fs::write(dir.path().join("logo.png"), common::tiny_png(8, 8)).unwrap();
    let configs = job_configs(
        dir.path(),
        r#"
jobs:
  - inputs: [in.pdf]
    output: out.pdf
    actions:
      - op: watermark
        pages: all
        image: logo.png
        position: bottom_right
"#,
    );

    let results = run_all_jobs(&configs, &FakeRenderer::new());
    let result = results[0].as_ref().unwrap();
    assert_eq!(result.pages, 1);
    assert_eq!(result.embed_failures, 0);

    let bytes = std::fs::read(&result.output_path).unwrap();
    let (doc, pages) = load_output(&bytes);
    assert_eq!(page_images(&doc, pages[0]).len(), 1);
}

#[test]
fn test_failing_job_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.pdf"), uniform_pdf(2, 100, 100)).unwrap();
    let configs = job_configs(
        dir.path(),
        r#"
jobs:
  - inputs: [missing.pdf]
    output: a.pdf
  - inputs: [in.pdf]
    output: b.pdf
    actions:
      - op: watermark
        pages: all
"#,
    );
    let results = run_all_jobs(&configs, &FakeRenderer::new());
    assert!(matches!(results[0], Err(WorkbenchError::IoError(_))));
    // A watermark with neither text nor image is a configuration error.
    assert!(matches!(results[1], Err(WorkbenchError::ConfigError(_))));
}

#[test]
fn test_resolve_path() {
    let base = Path::new("/jobs");
    assert_eq!(resolve_path(base, "a.pdf"), Path::new("/jobs/a.pdf"));
    assert_eq!(resolve_path(base, "/abs/a.pdf"), Path::new("/abs/a.pdf"));
}
