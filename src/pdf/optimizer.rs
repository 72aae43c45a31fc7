// FlateDecode compression of generated streams, orphan removal

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId};

use crate::error::WorkbenchError;

/// Zlib-compresses `data` for a `/FlateDecode` stream.
pub fn deflate(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| WorkbenchError::pdf_write(format!("deflate failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| WorkbenchError::pdf_write(format!("deflate failed: {e}")))
}

/// Applies FlateDecode to the listed streams that have no filter yet.
///
/// Only streams the writer generated are passed in, so copied page content
/// keeps its original bytes.
pub fn compress_streams(doc: &mut Document, stream_ids: &[ObjectId]) {
    for id in stream_ids {
        let Some(Object::Stream(stream)) = doc.objects.get_mut(id) else {
            continue;
        };
        // Skip streams that already have a filter
        if stream.dict.get(b"Filter").is_ok() || stream.content.is_empty() {
            continue;
        }
        let Ok(compressed) = deflate(&stream.content) else {
            continue;
        };
        stream.dict.set("Filter", "FlateDecode");
        stream.set_content(compressed);
    }
}

/// Removes objects nothing refers to.
pub fn delete_unused_objects(doc: &mut Document) {
    doc.prune_objects();
}

/// Runs every optimization pass in order.
pub fn optimize(doc: &mut Document, generated_streams: &[ObjectId], compress: bool) {
    if compress {
        compress_streams(doc, generated_streams);
    }
    delete_unused_objects(doc);
}
