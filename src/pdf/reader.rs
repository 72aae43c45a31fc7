use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::WorkbenchError;
use crate::transform::PageBox;

/// Page attributes that a page may inherit from its ancestors in the page tree.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page dimensions (14,400 pt = 200 in).
const PDF_MAX_DIMENSION_PT: f64 = 14_400.0;

pub struct PdfReader {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfReader {
    /// Opens a PDF file.
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let doc = Document::load(path)?;
        Ok(Self::from_document(doc))
    }

    /// Parses PDF bytes held in memory.
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self::from_document(doc))
    }

    fn from_document(doc: Document) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self { doc, page_ids }
    }

    /// The underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    pub fn is_encrypted(&self) -> bool {
        self.doc.trailer.get(b"Encrypt").is_ok()
    }

    /// Object id of the page at `page_index` (0-based).
    pub fn page_id(&self, page_index: u32) -> crate::error::Result<ObjectId> {
        self.page_ids
            .get(page_index as usize)
            .copied()
            .ok_or_else(|| {
                WorkbenchError::pdf_read(format!(
                    "page index {} out of range (document has {} pages)",
                    page_index,
                    self.page_ids.len()
                ))
            })
    }

    /// Looks up `key` on the page dictionary, walking `/Parent` for inheritable keys.
    pub fn inherited_attribute(
        &self,
        page_id: ObjectId,
        key: &[u8],
    ) -> crate::error::Result<Option<Object>> {
        let mut dict = self.doc.get_dictionary(page_id)?;
        // Bounded walk so a cyclic /Parent chain cannot loop forever.
        for _ in 0..64 {
            if let Ok(obj) = dict.get(key) {
                return Ok(Some(self.resolve(obj)?.clone()));
            }
            let parent_id = match dict.get(b"Parent") {
                Ok(Object::Reference(id)) => *id,
                _ => return Ok(None),
            };
            dict = self.doc.get_dictionary(parent_id)?;
        }
        Ok(None)
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> crate::error::Result<&'a Object> {
        match obj {
            Object::Reference(id) => Ok(self.doc.get_object(*id)?),
            other => Ok(other),
        }
    }

    /// MediaBox of the page at `page_index` (0-based), honoring inheritance.
    pub fn page_box(&self, page_index: u32) -> crate::error::Result<PageBox> {
        let page_id = self.page_id(page_index)?;
        let media_box = self
            .inherited_attribute(page_id, b"MediaBox")?
            .ok_or_else(|| WorkbenchError::pdf_read("MediaBox not found"))?;
        let page_box = box_from_object(&media_box)?;

        let (width, height) = (page_box.width(), page_box.height());
        if width <= 0.0 || height <= 0.0 {
            return Err(WorkbenchError::pdf_read(
                "Invalid MediaBox: non-positive page dimensions",
            ));
        }
        if width > PDF_MAX_DIMENSION_PT || height > PDF_MAX_DIMENSION_PT {
            return Err(WorkbenchError::pdf_read(
                "Invalid MediaBox: page dimensions exceed PDF limits",
            ));
        }
        Ok(page_box)
    }

    /// The region viewers display: CropBox clipped to the MediaBox, or the MediaBox.
    pub fn visible_box(&self, page_index: u32) -> crate::error::Result<PageBox> {
        let media = self.page_box(page_index)?;
        let page_id = self.page_id(page_index)?;
        let Some(crop) = self.inherited_attribute(page_id, b"CropBox")? else {
            return Ok(media);
        };
        let crop = box_from_object(&crop)?;
        let clipped = PageBox {
            x0: crop.x0.max(media.x0),
            y0: crop.y0.max(media.y0),
            x1: crop.x1.min(media.x1),
            y1: crop.y1.min(media.y1),
        };
        if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
            return Ok(media);
        }
        Ok(clipped)
    }

    /// The page's own `/Rotate`, normalized to 0, 90, 180 or 270.
    ///
    /// Values that are not multiples of 90 are ignored, as viewers do.
    pub fn page_rotation(&self, page_index: u32) -> crate::error::Result<i64> {
        let page_id = self.page_id(page_index)?;
        let rotate = match self.inherited_attribute(page_id, b"Rotate")? {
            Some(Object::Integer(v)) => v,
            Some(Object::Real(v)) => v as i64,
            _ => 0,
        };
        if rotate % 90 != 0 {
            return Ok(0);
        }
        Ok(rotate.rem_euclid(360))
    }

    /// Decoded content of the page at `page_index` (0-based).
    pub fn page_content_stream(&self, page_index: u32) -> crate::error::Result<Vec<u8>> {
        let page_id = self.page_id(page_index)?;
        Ok(self.doc.get_page_content(page_id)?)
    }

    /// The page dictionary itself.
    pub fn page_dictionary(&self, page_index: u32) -> crate::error::Result<&Dictionary> {
        let page_id = self.page_id(page_index)?;
        Ok(self.doc.get_dictionary(page_id)?)
    }
}

/// Reads a `[x0 y0 x1 y1]` rectangle; integer or real entries.
pub fn box_from_object(obj: &Object) -> crate::error::Result<PageBox> {
    let array = obj.as_array()?;
    if array.len() < 4 {
        return Err(WorkbenchError::pdf_read("Invalid box: fewer than 4 entries"));
    }
    let to_f64 = |obj: &Object| -> crate::error::Result<f64> {
        match obj {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f as f64),
            _ => Err(WorkbenchError::pdf_read("Invalid box value")),
        }
    };
    Ok(PageBox::from_corners(
        to_f64(&array[0])?,
        to_f64(&array[1])?,
        to_f64(&array[2])?,
        to_f64(&array[3])?,
    ))
}
