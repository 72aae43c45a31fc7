// Shared helpers: lopdf-built source PDFs and a renderer that needs no pdfium

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, Rgba, RgbaImage};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use pdf_workbench::render::{PageRenderer, scaled_pixels};
use pdf_workbench::source::{SourceHandle, UploadFile};

pub fn int_array(values: [i64; 4]) -> Vec<Object> {
    values.into_iter().map(Object::Integer).collect()
}

/// One page of a generated source PDF.
#[derive(Debug, Clone)]
pub struct PageSpec {
    pub width: i64,
    pub height: i64,
    pub rotate: Option<i64>,
}

impl PageSpec {
    pub fn new(width: i64, height: i64) -> Self {
        PageSpec {
            width,
            height,
            rotate: None,
        }
    }

    pub fn rotated(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }
}

/// Content stream written for page `index` (0-based) of a generated PDF.
pub fn page_content(index: usize) -> Vec<u8> {
    format!("BT\n/F1 24 Tf\n72 72 Td\n(Source page {index}) Tj\nET\n").into_bytes()
}

/// Builds a PDF whose pages share one Resources dictionary and carry
/// distinct, uncompressed content streams.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (index, spec) in pages.iter().enumerate() {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(index)));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(spec.width),
                Object::Integer(spec.height),
            ],
            "Contents" => content_id,
            "Resources" => resources_id,
        };
        if let Some(rotate) = spec.rotate {
            page.set("Rotate", Object::Integer(rotate));
        }
        kids.push(doc.add_object(page).into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// One 200 x 200 page carrying a text annotation whose `/P` points back at it.
pub fn annotated_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let annot_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Text",
        "Rect" => int_array([10, 10, 30, 30]),
        "Contents" => Object::string_literal("note"),
        "P" => page_id,
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(0)));
    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => int_array([0, 0, 200, 200]),
            "Contents" => content_id,
            "Annots" => vec![Object::Reference(annot_id)],
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// Annotation object ids of `page_id` paired with each annotation's `/P`.
pub fn page_annots(doc: &Document, page_id: ObjectId) -> Vec<(ObjectId, Option<ObjectId>)> {
    let Ok(annots) = doc.get_dictionary(page_id).unwrap().get(b"Annots") else {
        return Vec::new();
    };
    annots
        .as_array()
        .unwrap()
        .iter()
        .map(|obj| {
            let id = obj.as_reference().unwrap();
            let parent = doc
                .get_dictionary(id)
                .unwrap()
                .get(b"P")
                .and_then(Object::as_reference)
                .ok();
            (id, parent)
        })
        .collect()
}

/// `count` pages of `width` x `height` points.
pub fn uniform_pdf(count: usize, width: i64, height: i64) -> Vec<u8> {
    build_pdf(&vec![PageSpec::new(width, height); count])
}

pub fn upload(name: &str, bytes: Vec<u8>) -> UploadFile {
    UploadFile::new(name, bytes)
}

/// A PDF whose page tree is empty.
pub fn zero_page_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// Encodes a small RGBA PNG, half transparent.
pub fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 128]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode PNG");
    buf.into_inner()
}

/// Renders every page as a solid color at the requested scale and counts calls.
#[derive(Debug, Default)]
pub struct FakeRenderer {
    pub calls: AtomicUsize,
}

impl FakeRenderer {
    pub const COLOR: [u8; 4] = [200, 40, 40, 255];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageRenderer for FakeRenderer {
    fn render_page(
        &self,
        source: &SourceHandle,
        page_index: u32,
        scale: f32,
    ) -> pdf_workbench::Result<DynamicImage> {
        source.ensure_available()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page_box = self.page_box(source, page_index)?;
        let (w, h) = scaled_pixels(&page_box, scale);
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba(Self::COLOR),
        )))
    }
}

/// Loaded output plus its page ids in order.
pub fn load_output(bytes: &[u8]) -> (Document, Vec<ObjectId>) {
    let doc = Document::load_mem(bytes).expect("output should be a valid PDF");
    let ids = doc.get_pages().into_values().collect();
    (doc, ids)
}

/// Reads a numeric `[a b c d]` box from a page dictionary.
pub fn page_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<[f64; 4]> {
    let dict = doc.get_dictionary(page_id).ok()?;
    let array = dict.get(key).ok()?.as_array().ok()?;
    let num = |o: &Object| match o {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => *r as f64,
        _ => f64::NAN,
    };
    Some([num(&array[0]), num(&array[1]), num(&array[2]), num(&array[3])])
}

pub fn page_rotate(doc: &Document, page_id: ObjectId) -> i64 {
    match doc.get_dictionary(page_id).and_then(|d| d.get(b"Rotate")) {
        Ok(Object::Integer(v)) => *v,
        _ => 0,
    }
}

/// Image XObjects reachable from the page's resources.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let resources = match page.get(b"Resources") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(d)) => Some(d),
        _ => None,
    };
    let Some(xobjects) = resources.and_then(|r| match r.get(b"XObject") {
        Ok(Object::Dictionary(d)) => Some(d),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        _ => None,
    }) else {
        return Vec::new();
    };
    xobjects
        .iter()
        .filter_map(|(_, v)| match v {
            Object::Reference(id) => Some(*id),
            _ => None,
        })
        .filter(|id| {
            matches!(
                doc.get_object(*id),
                Ok(Object::Stream(s)) if matches!(s.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
            )
        })
        .collect()
}

/// Decoded page content with all streams concatenated.
pub fn content_text(doc: &Document, page_id: ObjectId) -> String {
    let bytes = doc.get_page_content(page_id).expect("page content");
    String::from_utf8_lossy(&bytes).into_owned()
}
