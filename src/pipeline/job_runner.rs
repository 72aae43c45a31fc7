// One batch job: upload inputs -> replay actions -> export -> write output

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::assemble::Progress;
use crate::config::job::{Action, Job, WatermarkSpec};
use crate::config::merged::MergedConfig;
use crate::error::WorkbenchError;
use crate::model::{WatermarkConfig, WatermarkKind};
use crate::render::PageRenderer;
use crate::source::UploadFile;
use crate::workspace::{ExportMode, Workspace};

/// A job with its paths resolved against the job file's directory.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub job: Job,
    pub base_dir: PathBuf,
    pub merged: MergedConfig,
}

impl JobConfig {
    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.job
            .inputs
            .iter()
            .map(|p| resolve_path(&self.base_dir, p))
            .collect()
    }

    pub fn output_path(&self) -> PathBuf {
        resolve_path(&self.base_dir, &self.job.output)
    }
}

/// Result of processing a single job.
#[derive(Debug)]
pub struct JobResult {
    pub output_path: PathBuf,
    pub mode: ExportMode,
    pub pages: usize,
    pub embed_failures: usize,
}

/// Resolves a potentially relative path against a base directory.
/// If the path is already absolute, returns it as-is.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn watermark_from_spec(
    spec: &WatermarkSpec,
    base_dir: &Path,
) -> crate::error::Result<WatermarkConfig> {
    let mut config = match (&spec.text, &spec.image) {
        (Some(text), None) => {
            let mut config = WatermarkConfig::text(text.clone());
            if let WatermarkKind::Text {
                font_size, color, ..
            } = &mut config.kind
            {
                if let Some(size) = spec.font_size {
                    *font_size = size;
                }
                if let Some(c) = spec.color {
                    *color = c;
                }
            }
            config
        }
        (None, Some(image)) => {
            let path = resolve_path(base_dir, image);
            let data = std::fs::read(&path).map_err(|e| {
                WorkbenchError::config(format!(
                    "cannot read watermark image {}: {e}",
                    path.display()
                ))
            })?;
            WatermarkConfig::image(data)
        }
        _ => {
            return Err(WorkbenchError::config(
                "watermark needs exactly one of 'text' or 'image'",
            ));
        }
    };
    if let Some(opacity) = spec.opacity {
        config = config.with_opacity(opacity);
    }
    if let Some(rotation) = spec.rotation {
        config = config.with_rotation(rotation);
    }
    if let Some(scale) = spec.scale {
        config = config.with_scale(scale);
    }
    if let Some(position) = spec.position {
        config = config.with_position(position);
    }
    Ok(config)
}

/// Replays one action against the workspace.
pub fn apply_action(
    workspace: &mut Workspace,
    action: &Action,
    base_dir: &Path,
) -> crate::error::Result<()> {
    match action {
        Action::Rotate { pages, direction } => {
            let ids = pages.resolve(workspace.state())?;
            workspace.rotate(&ids, *direction)?;
        }
        Action::Crop { pages, rect } => {
            for id in pages.resolve(workspace.state())? {
                workspace.crop(id, *rect)?;
            }
        }
        Action::ColorMode { pages, mode } => {
            let ids = pages.resolve(workspace.state())?;
            workspace.apply_color_mode(&ids, *mode)?;
        }
        Action::Watermark { pages, stamp } => {
            let ids = pages.resolve(workspace.state())?;
            let config = watermark_from_spec(stamp, base_dir)?;
            workspace.apply_watermark(&ids, config)?;
        }
        Action::RemoveWatermark { pages } => {
            let ids = pages.resolve(workspace.state())?;
            workspace.remove_watermark(&ids)?;
        }
        Action::Delete { pages } => {
            let ids = pages.resolve(workspace.state())?;
            workspace.delete(&ids)?;
        }
        Action::Duplicate { pages } => {
            let ids = pages.resolve(workspace.state())?;
            workspace.duplicate(&ids)?;
        }
        Action::Reorder { from, to } => {
            let len = workspace.pages().len();
            for position in [*from, *to] {
                if position == 0 {
                    return Err(WorkbenchError::IndexOutOfRange { index: 0, len });
                }
            }
            workspace.reorder(from - 1, to - 1)?;
        }
        Action::AddBlank { at } => {
            workspace.add_blank(at.map(|n| n.saturating_sub(1)))?;
        }
        Action::Select { pages } => {
            let ids = pages.resolve(workspace.state())?;
            workspace.clear_selection();
            workspace.select(&ids, true);
        }
        Action::Numbering(config) => {
            workspace.set_numbering(*config)?;
        }
        Action::Undo => {
            workspace.undo();
        }
        Action::Redo => {
            workspace.redo();
        }
    }
    Ok(())
}

/// Runs a single job end to end and writes its output file.
pub fn run_job<R: PageRenderer + ?Sized>(
    config: &JobConfig,
    renderer: &R,
) -> crate::error::Result<JobResult> {
    let mut workspace = Workspace::new(config.merged.settings.clone())?;

    let mut files = Vec::new();
    for path in config.input_paths() {
        let bytes = std::fs::read(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(UploadFile::new(name, bytes));
    }
    let report = workspace.upload(files);
    if let Some(failure) = report.failures.into_iter().next() {
        return Err(failure);
    }

    if let Some(numbering) = config.job.numbering {
        workspace.set_numbering(numbering)?;
    }
    for action in &config.job.actions {
        apply_action(&mut workspace, action, &config.base_dir)?;
    }

    let output = workspace.export(config.job.mode, renderer, &mut |p: Progress| {
        debug!(percent = p.percent, phase = %p.phase, "progress");
    })?;

    let output_path = config.output_path();
    std::fs::write(&output_path, output.bytes())?;
    let pages = output.report().pages;
    let embed_failures = output.report().embed_failures.len();
    info!(output = %output_path.display(), pages, "job finished");

    Ok(JobResult {
        output_path,
        mode: config.job.mode,
        pages,
        embed_failures,
    })
}

/// Runs multiple jobs, collecting results.
/// One job failure does NOT prevent other jobs from running.
pub fn run_all_jobs<R: PageRenderer + ?Sized>(
    jobs: &[JobConfig],
    renderer: &R,
) -> Vec<crate::error::Result<JobResult>> {
    jobs.iter().map(|job| run_job(job, renderer)).collect()
}
