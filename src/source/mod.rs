// Source registry: uploaded documents, lazily parsed and shared read-only

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::WorkbenchError;
use crate::filter::ColorMode;
use crate::pdf::reader::PdfReader;
use crate::transform::PageBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Uuid);

impl SourceId {
    pub fn new() -> Self {
        SourceId(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// A file handed to the workspace by the caller.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        UploadFile {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Shared, read-only view of a parsed source.
///
/// Clones share the parsed document. Once the registry evicts the source
/// every clone reports itself released.
#[derive(Clone)]
pub struct SourceHandle {
    id: SourceId,
    name: Arc<str>,
    bytes: Arc<[u8]>,
    reader: Arc<PdfReader>,
    released: Arc<AtomicBool>,
}

impl SourceHandle {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original file bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn reader(&self) -> &PdfReader {
        &self.reader
    }

    pub fn page_count(&self) -> u32 {
        self.reader.page_count()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Fails with `SourceUnavailable` once the source has been evicted.
    pub fn ensure_available(&self) -> crate::error::Result<()> {
        if self.is_released() {
            return Err(WorkbenchError::SourceUnavailable(self.id));
        }
        Ok(())
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pages", &self.reader.page_count())
            .field("released", &self.is_released())
            .finish()
    }
}

struct SourceEntry {
    name: Arc<str>,
    bytes: Arc<[u8]>,
    handle: Option<SourceHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PreviewKey {
    source: SourceId,
    page_index: u32,
    scale_bits: u32,
    mode: ColorMode,
}

impl PreviewKey {
    fn new(source: SourceId, page_index: u32, scale: f32, mode: ColorMode) -> Self {
        PreviewKey {
            source,
            page_index,
            scale_bits: scale.to_bits(),
            mode,
        }
    }
}

#[derive(Default)]
pub struct SourceRegistry {
    entries: HashMap<SourceId, SourceEntry>,
    previews: HashMap<PreviewKey, Arc<RgbaImage>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the bytes under a fresh id. Parsing waits for the first query.
    pub fn register(&mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> SourceId {
        let id = SourceId::new();
        let name: Arc<str> = Arc::from(name.into());
        debug!(source = %id, name = %name, "registered source");
        self.entries.insert(
            id,
            SourceEntry {
                name,
                bytes: bytes.into(),
                handle: None,
            },
        );
        id
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the parsed handle, parsing on first use.
    pub fn handle(&mut self, id: SourceId) -> crate::error::Result<SourceHandle> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(WorkbenchError::SourceUnavailable(id))?;
        if let Some(handle) = &entry.handle {
            return Ok(handle.clone());
        }

        let reader = PdfReader::from_bytes(&entry.bytes)
            .map_err(|e| WorkbenchError::unreadable(entry.name.as_ref(), e.to_string()))?;
        if reader.is_encrypted() {
            return Err(WorkbenchError::unreadable(
                entry.name.as_ref(),
                "document is encrypted",
            ));
        }
        if reader.page_count() == 0 {
            return Err(WorkbenchError::unreadable(
                entry.name.as_ref(),
                "document has no pages",
            ));
        }
        info!(source = %id, name = %entry.name, pages = reader.page_count(), "parsed source");

        let handle = SourceHandle {
            id,
            name: Arc::clone(&entry.name),
            bytes: Arc::clone(&entry.bytes),
            reader: Arc::new(reader),
            released: Arc::new(AtomicBool::new(false)),
        };
        entry.handle = Some(handle.clone());
        Ok(handle)
    }

    pub fn page_count(&mut self, id: SourceId) -> crate::error::Result<u32> {
        Ok(self.handle(id)?.page_count())
    }

    pub fn page_box(&mut self, id: SourceId, page_index: u32) -> crate::error::Result<PageBox> {
        self.handle(id)?.reader().visible_box(page_index)
    }

    /// Releases the source and every cached preview raster for it.
    ///
    /// Returns `false` when the id was not registered.
    pub fn evict(&mut self, id: SourceId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        if let Some(handle) = entry.handle {
            handle.released.store(true, Ordering::Release);
        }
        self.previews.retain(|key, _| key.source != id);
        debug!(source = %id, "evicted source");
        true
    }

    pub fn evict_all(&mut self) {
        let ids: Vec<SourceId> = self.entries.keys().copied().collect();
        for id in ids {
            self.evict(id);
        }
        self.previews.clear();
    }

    pub fn cache_preview(
        &mut self,
        id: SourceId,
        page_index: u32,
        scale: f32,
        mode: ColorMode,
        raster: Arc<RgbaImage>,
    ) {
        if self.entries.contains_key(&id) {
            self.previews
                .insert(PreviewKey::new(id, page_index, scale, mode), raster);
        }
    }

    pub fn cached_preview(
        &self,
        id: SourceId,
        page_index: u32,
        scale: f32,
        mode: ColorMode,
    ) -> Option<Arc<RgbaImage>> {
        self.previews
            .get(&PreviewKey::new(id, page_index, scale, mode))
            .cloned()
    }

    pub fn preview_count(&self) -> usize {
        self.previews.len()
    }
}
