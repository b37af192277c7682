// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — load and inspect existing PDF documents using the `lopdf`
// crate.
//
// A reader owns its `lopdf::Document` exclusively; nothing here is shared
// between requests.

use std::path::Path;

use folio_core::error::{FolioError, Result};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, instrument};

/// Page attributes a page may inherit from its ancestors in the page tree.
pub(crate) const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// US Letter, used when neither a page nor its ancestors carry a /MediaBox.
pub(crate) const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guards against malformed page trees whose /Parent chain loops.
const MAX_TREE_DEPTH: usize = 64;

/// Reads and inspects existing PDF files.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)?;
        Self::from_bytes(&data).map_err(|err| match err {
            FolioError::CorruptSource(msg) => {
                FolioError::CorruptSource(format!("{}: {}", path_ref.display(), msg))
            }
            other => other,
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document =
            Document::load_mem(data).map_err(|err| FolioError::CorruptSource(err.to_string()))?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Wrap a document that was built in memory.
    pub fn from_document(document: Document) -> Self {
        Self { document }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Page object ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }

    /// Object id of the 1-indexed page `number`.
    pub fn page_id(&self, number: u32) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        pages.get(&number).copied().ok_or_else(|| {
            FolioError::InvalidRange(format!(
                "page {} out of range (document has {} pages)",
                number,
                pages.len()
            ))
        })
    }


    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Look up `key` on the page, then on each ancestor in the page tree.
    pub fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.document.get_dictionary(page_id).ok();
        for _ in 0..MAX_TREE_DEPTH {
            let dict = current?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict
                .get(b"Parent")
                .and_then(Object::as_reference)
                .ok()
                .and_then(|parent| self.document.get_dictionary(parent).ok());
        }
        None
    }

    /// Effective `/MediaBox` as `[llx, lly, urx, ury]`.
    pub fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        let Some(Object::Array(items)) = self
            .inherited_attribute(page_id, b"MediaBox")
            .map(|obj| resolve(&self.document, obj))
        else {
            return DEFAULT_MEDIA_BOX;
        };
        let values: Vec<f32> = items
            .iter()
            .filter_map(|item| resolve(&self.document, item).as_float().ok())
            .collect();
        match values.as_slice() {
            [llx, lly, urx, ury] => [*llx, *lly, *urx, *ury],
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    /// Page width and height in points.
    pub fn page_size(&self, page_id: ObjectId) -> (f32, f32) {
        let [llx, lly, urx, ury] = self.media_box(page_id);
        ((urx - llx).abs(), (ury - lly).abs())
    }

    /// Effective `/Rotate` in degrees, normalised into `0..360`.
    pub fn rotation(&self, page_id: ObjectId) -> i64 {
        self.inherited_attribute(page_id, b"Rotate")
            .and_then(|obj| resolve(&self.document, obj).as_i64().ok())
            .unwrap_or(0)
            .rem_euclid(360)
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| FolioError::PdfError(format!("failed to serialise PDF: {}", err)))?;
        Ok(output)
    }
}

/// Follow a single level of indirection.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{numbered_pdf, page_texts};

    #[test]
    fn loads_and_counts_pages() {
        let reader = PdfReader::from_bytes(&numbered_pdf(3)).expect("load");
        assert_eq!(reader.page_count(), 3);
        assert_eq!(reader.page_ids().len(), 3);
        assert_eq!(page_texts(reader.document()), vec!["Page 1", "Page 2", "Page 3"]);
    }

    #[test]
    fn garbage_is_a_corrupt_source() {
        let err = PdfReader::from_bytes(b"definitely not a pdf")
            .err()
            .expect("should fail");
        assert!(matches!(err, FolioError::CorruptSource(_)), "{err}");
    }

    #[test]
    fn page_attributes_are_inherited_from_the_tree() {
        let reader = PdfReader::from_bytes(&numbered_pdf(2)).expect("load");
        let first = reader.page_id(1).expect("page 1");
        // The fixture declares MediaBox and Resources on the /Pages node only.
        assert_eq!(reader.media_box(first), [0.0, 0.0, 595.0, 842.0]);
        assert_eq!(reader.page_size(first), (595.0, 842.0));
        assert!(reader.inherited_attribute(first, b"Resources").is_some());
        assert_eq!(reader.rotation(first), 0);
    }

    #[test]
    fn out_of_range_page_is_rejected() {
        let reader = PdfReader::from_bytes(&numbered_pdf(2)).expect("load");
        assert!(matches!(reader.page_id(0), Err(FolioError::InvalidRange(_))));
        let err = reader.page_id(3).unwrap_err();
        assert_eq!(err.kind(), folio_core::ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "invalid page range: page 3 out of range (document has 2 pages)"
        );
    }
}
