// Export jobs: one at a time per workspace, running on an immutable snapshot

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tracing::info;

use crate::assemble::{ExportOutput, Progress, SourceMap, assemble_archive, assemble_document};
use crate::config::Settings;
use crate::error::WorkbenchError;
use crate::model::{NumberingConfig, Page};
use crate::render::PageRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// One combined document.
    #[default]
    Merge,
    /// One single-page document per page, archived.
    Split,
}

impl ExportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportMode::Merge => "merge",
            ExportMode::Split => "split",
        }
    }
}

/// Marks a workspace as exporting for as long as it lives.
#[derive(Debug)]
pub struct ExportGuard {
    flag: Arc<AtomicBool>,
}

impl ExportGuard {
    /// Fails with `ExportInProgress` when another guard on `flag` is alive.
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> crate::error::Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkbenchError::ExportInProgress)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A pending export. Owns everything it reads, so it can be moved to
/// another thread while the workspace keeps accepting edits.
#[derive(Debug)]
pub struct ExportJob {
    pub(crate) mode: ExportMode,
    pub(crate) pages: Vec<Page>,
    pub(crate) numbering: NumberingConfig,
    pub(crate) sources: SourceMap,
    pub(crate) settings: Settings,
    pub(crate) _guard: ExportGuard,
}

impl ExportJob {
    pub fn mode(&self) -> ExportMode {
        self.mode
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Runs the assembler for the job's mode. The guard is released when
    /// this returns, whatever the outcome.
    pub fn run<R: PageRenderer + ?Sized>(
        self,
        renderer: &R,
        progress: &mut dyn FnMut(Progress),
    ) -> crate::error::Result<ExportOutput> {
        info!(mode = self.mode.as_str(), pages = self.pages.len(), "export started");
        let output = match self.mode {
            ExportMode::Merge => assemble_document(
                &self.pages,
                &self.sources,
                &self.numbering,
                renderer,
                &self.settings,
                progress,
            ),
            ExportMode::Split => assemble_archive(
                &self.pages,
                &self.sources,
                &self.numbering,
                renderer,
                &self.settings,
                progress,
            ),
        }?;
        info!(
            mode = self.mode.as_str(),
            embed_failures = output.report().embed_failures.len(),
            "export finished"
        );
        Ok(output)
    }
}
