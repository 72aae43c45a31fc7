// Output document: page creation, lossless page copy, image embedding, overlays

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::WorkbenchError;
use crate::pdf::content_stream::ContentBuilder;
use crate::pdf::image_xobject::{EncodedImage, StampImage};
use crate::pdf::optimizer;
use crate::pdf::reader::{INHERITABLE_KEYS, PdfReader, box_from_object};
use crate::source::SourceId;
use crate::transform::PageBox;

/// Page entries whose objects belong to a single page and must not be
/// shared between two copies of it.
const PAGE_OWNED_KEYS: [&[u8]; 1] = [b"Annots"];

/// Handle to a page in an [`OutputDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRef(ObjectId);

impl PageRef {
    pub fn object_id(self) -> ObjectId {
        self.0
    }
}

/// Handle to an embedded image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl ImageRef {
    pub fn object_id(&self) -> ObjectId {
        self.id
    }
}

/// Resource categories an overlay may register on a page.
#[derive(Debug, Clone, Copy)]
enum ResourceKind {
    Font,
    XObject,
    ExtGState,
}

impl ResourceKind {
    fn key(self) -> &'static [u8] {
        match self {
            ResourceKind::Font => b"Font",
            ResourceKind::XObject => b"XObject",
            ResourceKind::ExtGState => b"ExtGState",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ResourceKind::Font => "PwF",
            ResourceKind::XObject => "PwIm",
            ResourceKind::ExtGState => "PwGs",
        }
    }
}

/// A PDF under construction.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    /// Source object id -> output object id, per source document.
    copy_caches: HashMap<SourceId, HashMap<ObjectId, ObjectId>>,
    /// Streams created here (never copied ones), eligible for compression.
    generated_streams: Vec<ObjectId>,
    /// Pages whose original content has been wrapped in q/Q already.
    wrapped: HashSet<ObjectId>,
    font_id: Option<ObjectId>,
    ext_gstates: HashMap<u64, ObjectId>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            copy_caches: HashMap::new(),
            generated_streams: Vec::new(),
            wrapped: HashSet::new(),
            font_id: None,
            ext_gstates: HashMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn add_generated_stream(&mut self, stream: Stream) -> ObjectId {
        let id = self.doc.add_object(Object::Stream(stream));
        self.generated_streams.push(id);
        id
    }

    fn push_page(&mut self, mut page_dict: Dictionary) -> PageRef {
        page_dict.set("Type", "Page");
        page_dict.set("Parent", Object::Reference(self.pages_id));
        let id = self.doc.add_object(page_dict);
        self.kids.push(id);
        PageRef(id)
    }

    fn media_box_object(page_box: &PageBox) -> Object {
        Object::Array(vec![
            Object::Real(page_box.x0 as f32),
            Object::Real(page_box.y0 as f32),
            Object::Real(page_box.x1 as f32),
            Object::Real(page_box.y1 as f32),
        ])
    }

    /// Appends an empty page of the given size.
    pub fn add_blank_page(&mut self, width: f64, height: f64) -> PageRef {
        let content_id = self.add_generated_stream(Stream::new(dictionary! {}, Vec::new()));
        self.push_page(dictionary! {
            "MediaBox" => Self::media_box_object(&PageBox::from_size(width, height)),
            "Resources" => Dictionary::new(),
            "Contents" => content_id,
        })
    }

    /// Copies page `page_index` of `reader` into this document without touching its content.
    ///
    /// Inherited attributes are materialized on the copy. References to other
    /// pages of the source (link destinations, annotation back-pointers) are
    /// nulled so the copy never drags in the source page tree.
    pub fn copy_page(
        &mut self,
        source_id: SourceId,
        reader: &PdfReader,
        page_index: u32,
    ) -> crate::error::Result<PageRef> {
        let source_page_id = reader.page_id(page_index)?;
        let mut page_dict = reader.page_dictionary(page_index)?.clone();
        for key in INHERITABLE_KEYS {
            if page_dict.get(key).is_err()
                && let Some(value) = reader.inherited_attribute(source_page_id, key)?
            {
                page_dict.set(key.to_vec(), value);
            }
        }
        page_dict.remove(b"Parent");
        page_dict.remove(b"B");

        let new_page_id = self.doc.new_object_id();
        let mut cache = self.copy_caches.remove(&source_id).unwrap_or_default();
        // Each copy of the same source page is a distinct output page.
        cache.insert(source_page_id, new_page_id);

        let mut copied = Dictionary::new();
        let mut result = Ok(());
        for (key, value) in page_dict.iter() {
            // Page-owned objects are copied afresh for every copy of the page;
            // everything else (resources, fonts, images) is shared per source.
            let obj = if PAGE_OWNED_KEYS.contains(&key.as_slice()) {
                let mut own_cache = cache.clone();
                copy_object_deep(&mut self.doc, reader.document(), value, &mut own_cache)
            } else {
                copy_object_deep(&mut self.doc, reader.document(), value, &mut cache)
            };
            match obj {
                Ok(obj) => copied.set(key.clone(), obj),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        cache.remove(&source_page_id);
        self.copy_caches.insert(source_id, cache);
        result?;

        copied.set("Type", "Page");
        copied.set("Parent", Object::Reference(self.pages_id));
        self.doc
            .objects
            .insert(new_page_id, Object::Dictionary(copied));
        self.kids.push(new_page_id);
        Ok(PageRef(new_page_id))
    }

    /// Adds an encoded raster as an image XObject.
    pub fn embed_raster(&mut self, image: EncodedImage) -> ImageRef {
        let (width, height) = (image.width, image.height);
        let id = self.doc.add_object(Object::Stream(image.into_stream(None)));
        ImageRef { id, width, height }
    }

    /// Adds a stamp image, with its alpha channel as a soft mask.
    pub fn embed_stamp(&mut self, stamp: StampImage) -> ImageRef {
        let smask = stamp
            .alpha
            .map(|alpha| self.doc.add_object(Object::Stream(alpha.into_stream(None))));
        let (width, height) = (stamp.color.width, stamp.color.height);
        let id = self
            .doc
            .add_object(Object::Stream(stamp.color.into_stream(smask)));
        ImageRef { id, width, height }
    }

    /// Appends a page of the given size whose only content is `image` drawn at `rect`.
    pub fn add_image_page(
        &mut self,
        width: f64,
        height: f64,
        image: &ImageRef,
        rect: (f64, f64, f64, f64),
    ) -> crate::error::Result<PageRef> {
        let page = self.push_page(dictionary! {
            "MediaBox" => Self::media_box_object(&PageBox::from_size(width, height)),
            "Resources" => Dictionary::new(),
        });
        self.draw_image(page, image, rect)?;
        Ok(page)
    }

    /// Draws `image` into `rect = (x, y, width, height)` in the page's user space.
    pub fn draw_image(
        &mut self,
        page: PageRef,
        image: &ImageRef,
        rect: (f64, f64, f64, f64),
    ) -> crate::error::Result<()> {
        let name = self.register_image(page, image)?;
        let mut ops = ContentBuilder::new();
        ops.draw_image(&name, rect.0, rect.1, rect.2, rect.3);
        self.append_content(page, ops)
    }

    fn page_dict(&self, page: PageRef) -> crate::error::Result<&Dictionary> {
        Ok(self.doc.get_dictionary(page.0)?)
    }

    fn page_dict_mut(&mut self, page: PageRef) -> crate::error::Result<&mut Dictionary> {
        Ok(self.doc.get_dictionary_mut(page.0)?)
    }

    fn read_box(&self, page: PageRef, key: &[u8]) -> crate::error::Result<Option<PageBox>> {
        let dict = self.page_dict(page)?;
        let Ok(obj) = dict.get(key) else {
            return Ok(None);
        };
        let obj = match obj {
            Object::Reference(id) => self.doc.get_object(*id)?,
            other => other,
        };
        Ok(Some(box_from_object(obj)?))
    }

    pub fn media_box(&self, page: PageRef) -> crate::error::Result<PageBox> {
        self.read_box(page, b"MediaBox")?
            .ok_or_else(|| WorkbenchError::pdf_write("page has no MediaBox"))
    }

    /// The visible region: CropBox when present, MediaBox otherwise.
    pub fn visible_box(&self, page: PageRef) -> crate::error::Result<PageBox> {
        match self.read_box(page, b"CropBox")? {
            Some(crop) => Ok(crop),
            None => self.media_box(page),
        }
    }

    /// Sets the CropBox (the region viewers display and print).
    pub fn set_crop_box(&mut self, page: PageRef, page_box: &PageBox) -> crate::error::Result<()> {
        let obj = Self::media_box_object(page_box);
        self.page_dict_mut(page)?.set("CropBox", obj);
        Ok(())
    }

    pub fn rotation(&self, page: PageRef) -> crate::error::Result<i64> {
        let rotate = match self.page_dict(page)?.get(b"Rotate") {
            Ok(Object::Integer(v)) => *v,
            Ok(Object::Real(v)) => *v as i64,
            _ => 0,
        };
        Ok(if rotate % 90 == 0 { rotate.rem_euclid(360) } else { 0 })
    }

    pub fn set_rotation(&mut self, page: PageRef, degrees: i64) -> crate::error::Result<()> {
        let normalized = degrees.rem_euclid(360);
        let dict = self.page_dict_mut(page)?;
        if normalized == 0 {
            dict.remove(b"Rotate");
        } else {
            dict.set("Rotate", Object::Integer(normalized));
        }
        Ok(())
    }

    /// Registers the shared Helvetica font on the page, returning its resource name.
    pub fn register_font(&mut self, page: PageRef) -> crate::error::Result<String> {
        let font_id = match self.font_id {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                });
                self.font_id = Some(id);
                id
            }
        };
        self.register_resource(page, ResourceKind::Font, font_id)
    }

    pub fn register_image(
        &mut self,
        page: PageRef,
        image: &ImageRef,
    ) -> crate::error::Result<String> {
        self.register_resource(page, ResourceKind::XObject, image.id)
    }

    /// Registers a graphics state with fill and stroke alpha set to `opacity`.
    pub fn register_opacity(&mut self, page: PageRef, opacity: f64) -> crate::error::Result<String> {
        let key = opacity.to_bits();
        let gs_id = match self.ext_gstates.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(opacity as f32),
                    "CA" => Object::Real(opacity as f32),
                });
                self.ext_gstates.insert(key, id);
                id
            }
        };
        self.register_resource(page, ResourceKind::ExtGState, gs_id)
    }

    /// Adds `target` to the page's resource category under a fresh name.
    ///
    /// Shared resource dictionaries of copied pages are cloned onto the page
    /// first so other pages never see the addition.
    fn register_resource(
        &mut self,
        page: PageRef,
        kind: ResourceKind,
        target: ObjectId,
    ) -> crate::error::Result<String> {
        let mut resources = match self.page_dict(page)?.get(b"Resources") {
            Ok(Object::Reference(id)) => self.doc.get_dictionary(*id)?.clone(),
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let mut category = match resources.get(kind.key()) {
            Ok(Object::Reference(id)) => self.doc.get_dictionary(*id)?.clone(),
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };

        // Reuse an existing entry for the same object.
        let existing = category.iter().find_map(|(name, value)| match value {
            Object::Reference(id) if *id == target => {
                Some(String::from_utf8_lossy(name).into_owned())
            }
            _ => None,
        });
        let name = match existing {
            Some(name) => name,
            None => {
                let mut n = 1;
                let name = loop {
                    let candidate = format!("{}{}", kind.prefix(), n);
                    if category.get(candidate.as_bytes()).is_err() {
                        break candidate;
                    }
                    n += 1;
                };
                category.set(name.as_bytes().to_vec(), Object::Reference(target));
                name
            }
        };

        resources.set(kind.key().to_vec(), Object::Dictionary(category));
        self.page_dict_mut(page)?
            .set("Resources", Object::Dictionary(resources));
        Ok(name)
    }

    /// Appends drawing operators after the page's existing content.
    ///
    /// Existing content is bracketed by q/Q once so that graphics state left
    /// behind by the original stream cannot leak into the overlay. The
    /// original content streams themselves are left byte-identical.
    pub fn append_content(&mut self, page: PageRef, ops: ContentBuilder) -> crate::error::Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let existing: Vec<Object> = match self.page_dict(page)?.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            // An indirect array of streams is spliced in, a stream is kept by reference.
            Ok(Object::Reference(id)) => match self.doc.get_object(*id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            _ => Vec::new(),
        };

        let mut contents = Vec::with_capacity(existing.len() + 3);
        if !existing.is_empty() && !self.wrapped.contains(&page.0) {
            let open = self.add_generated_stream(Stream::new(dictionary! {}, b"q\n".to_vec()));
            let close = self.add_generated_stream(Stream::new(dictionary! {}, b"Q\n".to_vec()));
            contents.push(Object::Reference(open));
            contents.extend(existing);
            contents.push(Object::Reference(close));
            self.wrapped.insert(page.0);
        } else {
            if existing.is_empty() {
                self.wrapped.insert(page.0);
            }
            contents.extend(existing);
        }
        let overlay = self.add_generated_stream(Stream::new(dictionary! {}, ops.finish()));
        contents.push(Object::Reference(overlay));

        let value = if contents.len() == 1 {
            contents.remove(0)
        } else {
            Object::Array(contents)
        };
        self.page_dict_mut(page)?.set("Contents", value);
        Ok(())
    }

    /// Builds the page tree and catalog, optimizes, and serializes.
    pub fn finish(mut self, compress: bool) -> crate::error::Result<Vec<u8>> {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.kids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        optimizer::optimize(&mut self.doc, &self.generated_streams, compress);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| WorkbenchError::pdf_write(e.to_string()))?;
        Ok(buf)
    }
}

/// Deep-copies `obj` from `source` into `output`, following references.
///
/// `cache` maps already copied source ids to their output ids. References to
/// page objects not present in the cache resolve to `null`.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> crate::error::Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }
            let Ok(referenced) = source.get_object(*id) else {
                // Dangling reference: PDF readers treat it as null.
                return Ok(Object::Null);
            };
            if is_page_node(referenced) {
                return Ok(Object::Null);
            }
            // Reserve the id first so cycles resolve to it.
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);
            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: crate::error::Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            let mut copied = stream.clone();
            copied.dict = new_dict;
            Ok(Object::Stream(copied))
        }
        _ => Ok(obj.clone()),
    }
}

fn is_page_node(obj: &Object) -> bool {
    match obj {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name == b"Page" || name == b"Pages"
        ),
        _ => false,
    }
}
