// Workspace controller: user actions -> page model mutations + history

pub mod export;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::assemble::{ExportOutput, Progress};
use crate::config::Settings;
use crate::error::WorkbenchError;
use crate::filter::ColorMode;
use crate::history::History;
use crate::model::{
    CropRect, NumberingConfig, Page, PageId, PagePatch, PageSource, RotateDirection, Rotation,
    WatermarkConfig, WorkspaceState,
};
use crate::render::{PageRenderer, PreviewScheduler, PreviewTarget, PreviewTicket, render_preview};
use crate::source::{SourceId, SourceRegistry, UploadFile};
use crate::transform::{self, Size};

pub use export::{ExportGuard, ExportJob, ExportMode};

/// A source accepted by [`Workspace::upload`].
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedSource {
    pub source_id: SourceId,
    pub name: String,
    pub page_count: u32,
}

/// Outcome of one upload batch. A file that fails does not block the others.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub added: Vec<UploadedSource>,
    pub failures: Vec<WorkbenchError>,
}

/// One independent editing session: sources, page model history and settings.
pub struct Workspace {
    sources: SourceRegistry,
    history: History<WorkspaceState>,
    settings: Settings,
    exporting: Arc<AtomicBool>,
    previews: PreviewScheduler,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl Workspace {
    /// Fails with `ConfigError` when `settings` does not validate.
    pub fn new(settings: Settings) -> crate::error::Result<Self> {
        settings.validate()?;
        Ok(Self::with_settings(settings))
    }

    fn with_settings(settings: Settings) -> Self {
        let history = History::new(WorkspaceState::default(), settings.history_limit);
        Self {
            sources: SourceRegistry::new(),
            history,
            settings,
            exporting: Arc::new(AtomicBool::new(false)),
            previews: PreviewScheduler::new(),
        }
    }

    /// The currently displayed state.
    pub fn state(&self) -> &WorkspaceState {
        self.history.current()
    }

    pub fn pages(&self) -> &[Page] {
        self.state().pages.pages()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &History<WorkspaceState> {
        &self.history
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn registry_mut(&mut self) -> &mut SourceRegistry {
        &mut self.sources
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Applies `f` to a copy of the current state and pushes it on success.
    /// On error nothing changes.
    fn commit<F>(&mut self, action: &str, f: F) -> crate::error::Result<&WorkspaceState>
    where
        F: FnOnce(&mut WorkspaceState) -> crate::error::Result<()>,
    {
        let mut next = self.history.current().clone();
        f(&mut next)?;
        self.history.push(next);
        debug!(action, history = self.history.len(), "committed");
        Ok(self.history.current())
    }

    /// Changes that are visible now but not undoable on their own.
    fn amend<F>(&mut self, f: F) -> &WorkspaceState
    where
        F: FnOnce(&mut WorkspaceState),
    {
        let mut next = self.history.current().clone();
        f(&mut next);
        self.history.replace_current(next);
        self.history.current()
    }

    /// Registers each file and appends its pages. Pushes one history entry
    /// when at least one file was accepted.
    pub fn upload(&mut self, files: impl IntoIterator<Item = UploadFile>) -> UploadReport {
        let mut report = UploadReport::default();
        let mut new_pages = Vec::new();
        for file in files {
            let name = file.name.clone();
            let id = self.sources.register(file.name, file.bytes);
            match self.sources.page_count(id) {
                Ok(page_count) => {
                    new_pages.extend(Page::create_from_source(id, page_count));
                    report.added.push(UploadedSource {
                        source_id: id,
                        name,
                        page_count,
                    });
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "rejected upload");
                    self.sources.evict(id);
                    report.failures.push(e);
                }
            }
        }
        if !new_pages.is_empty() {
            let count = new_pages.len();
            let mut next = self.history.current().clone();
            next.pages.append(new_pages);
            self.history.push(next);
            info!(sources = report.added.len(), pages = count, "uploaded");
        }
        report
    }

    /// Inserts a blank page of the configured default size at `at`, or at the end.
    pub fn add_blank(&mut self, at: Option<usize>) -> crate::error::Result<&WorkspaceState> {
        let page = Page::create_blank(self.settings.blank_width, self.settings.blank_height);
        self.commit("add_blank", |state| {
            let at = at.unwrap_or(state.pages.len());
            state.pages.insert(at, page)
        })
    }

    pub fn rotate(
        &mut self,
        ids: &[PageId],
        direction: RotateDirection,
    ) -> crate::error::Result<&WorkspaceState> {
        let patch = PagePatch {
            rotate_by: Some(direction.as_rotation()),
            ..PagePatch::default()
        };
        self.commit("rotate", |state| state.pages.mutate(ids, &patch))
    }

    /// Sets (`Some`) or clears (`None`) the crop of one page.
    pub fn crop(
        &mut self,
        page_id: PageId,
        crop: Option<CropRect>,
    ) -> crate::error::Result<&WorkspaceState> {
        let patch = PagePatch {
            crop: Some(crop),
            ..PagePatch::default()
        };
        self.commit("crop", |state| state.pages.mutate(&[page_id], &patch))
    }

    pub fn apply_color_mode(
        &mut self,
        ids: &[PageId],
        mode: ColorMode,
    ) -> crate::error::Result<&WorkspaceState> {
        let patch = PagePatch {
            color_mode: Some(mode),
            ..PagePatch::default()
        };
        self.commit("color_mode", |state| state.pages.mutate(ids, &patch))
    }

    pub fn apply_watermark(
        &mut self,
        ids: &[PageId],
        config: WatermarkConfig,
    ) -> crate::error::Result<&WorkspaceState> {
        let patch = PagePatch {
            watermark: Some(Some(config)),
            ..PagePatch::default()
        };
        self.commit("watermark", |state| state.pages.mutate(ids, &patch))
    }

    pub fn remove_watermark(&mut self, ids: &[PageId]) -> crate::error::Result<&WorkspaceState> {
        let patch = PagePatch {
            watermark: Some(None),
            ..PagePatch::default()
        };
        self.commit("remove_watermark", |state| state.pages.mutate(ids, &patch))
    }

    pub fn delete(&mut self, ids: &[PageId]) -> crate::error::Result<&WorkspaceState> {
        self.commit("delete", |state| state.pages.remove(ids))
    }

    pub fn duplicate(&mut self, ids: &[PageId]) -> crate::error::Result<&WorkspaceState> {
        self.commit("duplicate", |state| state.pages.duplicate(ids).map(|_| ()))
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> crate::error::Result<&WorkspaceState> {
        self.commit("reorder", |state| state.pages.reorder(from, to))
    }

    pub fn set_numbering(
        &mut self,
        config: NumberingConfig,
    ) -> crate::error::Result<&WorkspaceState> {
        config.validate()?;
        self.commit("numbering", |state| {
            state.numbering = config;
            Ok(())
        })
    }

    pub fn select(&mut self, ids: &[PageId], selected: bool) -> &WorkspaceState {
        self.amend(|state| state.pages.set_selected(ids, selected))
    }

    pub fn select_all(&mut self) -> &WorkspaceState {
        self.amend(|state| state.pages.set_all_selected(true))
    }

    pub fn clear_selection(&mut self) -> &WorkspaceState {
        self.amend(|state| state.pages.set_all_selected(false))
    }

    /// Steps back one entry; a no-op on the oldest entry.
    pub fn undo(&mut self) -> &WorkspaceState {
        if self.history.undo().is_none() {
            debug!("nothing to undo");
        }
        self.history.current()
    }

    /// Steps forward one entry; a no-op when there is nothing to redo.
    pub fn redo(&mut self) -> &WorkspaceState {
        if self.history.redo().is_none() {
            debug!("nothing to redo");
        }
        self.history.current()
    }

    /// Drops every page, source and history entry.
    pub fn reset(&mut self) -> &WorkspaceState {
        self.previews.cancel_all();
        self.sources.evict_all();
        self.history.clear(WorkspaceState::default());
        info!("workspace reset");
        self.history.current()
    }

    /// On-screen size of a page in points, after crop and rotation, with the
    /// source page's own `/Rotate` counted as the preview and export do.
    pub fn display_size(&mut self, page_id: PageId) -> crate::error::Result<Size> {
        let page = self
            .state()
            .pages
            .get(page_id)
            .ok_or(WorkbenchError::UnknownPage(page_id))?
            .clone();
        let (native, base) = match page.source() {
            PageSource::Blank { width, height } => (Size::new(width, height), Rotation::R0),
            PageSource::Document {
                source_id,
                page_index,
            } => {
                let handle = self.sources.handle(source_id)?;
                let reader = handle.reader();
                (
                    reader.visible_box(page_index)?.size(),
                    Rotation::from_degrees(reader.page_rotation(page_index)?)?,
                )
            }
        };
        Ok(transform::display_size(&page, native, base))
    }

    /// Supersedes any earlier preview request and returns a ticket for this one.
    pub fn request_preview(
        &mut self,
        page_id: PageId,
        scale: f32,
    ) -> crate::error::Result<PreviewTicket> {
        let page = self
            .state()
            .pages
            .get(page_id)
            .ok_or(WorkbenchError::UnknownPage(page_id))?
            .clone();
        Ok(self.previews.request(PreviewTarget { page, scale }))
    }

    pub fn render_preview<R: PageRenderer + ?Sized>(
        &mut self,
        ticket: &PreviewTicket,
        renderer: &R,
    ) -> crate::error::Result<RgbaImage> {
        render_preview(&mut self.sources, renderer, ticket)
    }

    /// Snapshots the current pages and claims the workspace's export slot.
    ///
    /// Fails with `ExportInProgress` while another job from this workspace
    /// is alive.
    pub fn begin_export(&mut self, mode: ExportMode) -> crate::error::Result<ExportJob> {
        let guard = ExportGuard::acquire(&self.exporting)?;
        let state = self.history.current().clone();
        let mut sources = HashMap::new();
        for page in state.pages.pages() {
            if let Some(id) = page.source_id()
                && !sources.contains_key(&id)
            {
                sources.insert(id, self.sources.handle(id)?);
            }
        }
        Ok(ExportJob {
            mode,
            pages: state.pages.pages().to_vec(),
            numbering: state.numbering,
            sources,
            settings: self.settings.clone(),
            _guard: guard,
        })
    }

    /// Exports the current pages and waits for the result.
    pub fn export<R: PageRenderer + ?Sized>(
        &mut self,
        mode: ExportMode,
        renderer: &R,
        progress: &mut dyn FnMut(Progress),
    ) -> crate::error::Result<ExportOutput> {
        self.begin_export(mode)?.run(renderer, progress)
    }
}
