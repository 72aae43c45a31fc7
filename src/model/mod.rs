pub mod numbering;
pub mod page;
pub mod watermark;

use std::collections::{BTreeSet, HashSet};

pub use numbering::{NumberingConfig, NumberingScope};
pub use page::{
    CropRect, Page, PageId, PageKind, PagePatch, PageSource, RotateDirection, Rotation,
};
pub use watermark::{StampPosition, WatermarkConfig, WatermarkKind};

use crate::error::WorkbenchError;

/// Ordered page sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageModel {
    pages: Vec<Page>,
}

impl PageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn position(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    /// Fails with `UnknownPage` for the first id not in the sequence.
    pub fn ensure_contains(&self, ids: &[PageId]) -> crate::error::Result<()> {
        match ids.iter().find(|id| self.get(**id).is_none()) {
            Some(missing) => Err(WorkbenchError::UnknownPage(*missing)),
            None => Ok(()),
        }
    }

    pub fn append(&mut self, pages: impl IntoIterator<Item = Page>) {
        self.pages.extend(pages);
    }

    pub fn insert(&mut self, at: usize, page: Page) -> crate::error::Result<()> {
        if at > self.pages.len() {
            return Err(WorkbenchError::IndexOutOfRange {
                index: at,
                len: self.pages.len(),
            });
        }
        self.pages.insert(at, page);
        Ok(())
    }

    /// Applies `patch` to every targeted page. Validation happens before any page changes.
    pub fn mutate(&mut self, ids: &[PageId], patch: &PagePatch) -> crate::error::Result<()> {
        self.ensure_contains(ids)?;
        patch.validate()?;
        let targets: HashSet<PageId> = ids.iter().copied().collect();
        for page in self.pages.iter_mut().filter(|p| targets.contains(&p.id)) {
            patch.apply(page);
        }
        Ok(())
    }

    /// Moves the page at `from` so that it ends up at index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> crate::error::Result<()> {
        let len = self.pages.len();
        for index in [from, to] {
            if index >= len {
                return Err(WorkbenchError::IndexOutOfRange { index, len });
            }
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        Ok(())
    }

    pub fn remove(&mut self, ids: &[PageId]) -> crate::error::Result<()> {
        self.ensure_contains(ids)?;
        let targets: HashSet<PageId> = ids.iter().copied().collect();
        self.pages.retain(|p| !targets.contains(&p.id));
        Ok(())
    }

    /// Inserts a copy right after each targeted page. Returns the new ids in sequence order.
    pub fn duplicate(&mut self, ids: &[PageId]) -> crate::error::Result<Vec<PageId>> {
        self.ensure_contains(ids)?;
        let targets: HashSet<PageId> = ids.iter().copied().collect();
        let mut new_ids = Vec::new();
        let mut result = Vec::with_capacity(self.pages.len() + targets.len());
        for page in self.pages.drain(..) {
            let copy = targets.contains(&page.id).then(|| page.duplicate());
            result.push(page);
            if let Some(copy) = copy {
                new_ids.push(copy.id);
                result.push(copy);
            }
        }
        self.pages = result;
        Ok(new_ids)
    }

    /// Sets the selection flag; unknown ids are ignored.
    pub fn set_selected(&mut self, ids: &[PageId], selected: bool) {
        let targets: HashSet<PageId> = ids.iter().copied().collect();
        for page in self.pages.iter_mut().filter(|p| targets.contains(&p.id)) {
            page.selected = selected;
        }
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        for page in &mut self.pages {
            page.selected = selected;
        }
    }
}

/// Everything a history entry records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceState {
    pub pages: PageModel,
    pub numbering: NumberingConfig,
}

impl WorkspaceState {
    pub fn selection(&self) -> BTreeSet<PageId> {
        self.pages
            .pages()
            .iter()
            .filter(|p| p.selected)
            .map(|p| p.id)
            .collect()
    }
}
