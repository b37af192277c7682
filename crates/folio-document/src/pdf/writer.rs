// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — assemble a fresh document from pages deep-copied out of one or
// more source documents.
//
// Copying never touches the source: every object a page reaches is cloned
// into the target under a new id. A per-source memo maps source ids to
// target ids, so shared resources (fonts, images) are copied once and
// reference cycles terminate.

use std::collections::HashMap;
use std::path::Path;

use folio_core::error::{FolioError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, instrument, warn};

use crate::pdf::reader::{DEFAULT_MEDIA_BOX, INHERITABLE, PdfReader};

/// Builds a new standalone PDF out of copied pages.
pub struct PdfWriter {
    document: Document,
    /// Reserved id of the root /Pages node, written by [`PdfWriter::finish`].
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfWriter {
    /// Start an empty document with a catalog and an (as yet empty) page tree.
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> u32 {
        self.kids.len() as u32
    }

    /// Append the 1-indexed `pages` of `source`, in the order given.
    #[instrument(skip(self, source), fields(count = pages.len()))]
    pub fn import_pages(&mut self, source: &PdfReader, pages: &[u32]) -> Result<()> {
        let mut copier = ObjectCopier::new(source.document());
        for &number in pages {
            let page_id = source.page_id(number)?;
            self.import_page(source, &mut copier, page_id)?;
        }
        Ok(())
    }

    /// Append every page of `source` in document order.
    pub fn import_all(&mut self, source: &PdfReader) -> Result<()> {
        let mut copier = ObjectCopier::new(source.document());
        for page_id in source.page_ids() {
            self.import_page(source, &mut copier, page_id)?;
        }
        Ok(())
    }

    fn import_page(
        &mut self,
        source: &PdfReader,
        copier: &mut ObjectCopier<'_>,
        page_id: ObjectId,
    ) -> Result<()> {
        let page = source.document().get_dictionary(page_id).map_err(|err| {
            FolioError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        // Reserve the new id first so annotations pointing back at the page
        // (/P) resolve to the copy rather than cloning the page again.
        let new_id = self.document.new_object_id();
        copier.copied.insert(page_id, new_id);

        let mut copied = copier.copy_dictionary(&mut self.document, page);

        // Attributes inherited in the source tree must live on the page now
        // that it hangs off a different parent.
        for key in INHERITABLE {
            if copied.has(key) {
                continue;
            }
            if let Some(value) = source.inherited_attribute(page_id, key) {
                let value = copier.copy(&mut self.document, value);
                copied.set(key.to_vec(), value);
            }
        }
        if !copied.has(b"MediaBox") {
            let media_box: Vec<Object> = DEFAULT_MEDIA_BOX.iter().map(|v| Object::Real(*v)).collect();
            copied.set("MediaBox", media_box);
        }

        copied.set("Parent", Object::Reference(self.pages_id));
        self.document
            .objects
            .insert(new_id, Object::Dictionary(copied));
        self.kids.push(Object::Reference(new_id));
        Ok(())
    }

    /// Write the page tree and hand over the finished document.
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        self.document
    }

    /// Finish and serialise to bytes.
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut document = self.finish();
        let mut output = Vec::new();
        document
            .save_to(&mut output)
            .map_err(|err| FolioError::PdfError(format!("failed to serialise PDF: {}", err)))?;
        Ok(output)
    }

    /// Finish and write to `path`, returning the number of bytes written.
    ///
    /// The document is fully serialised in memory first; a failure while
    /// writing the file is reported as a partial write.
    #[instrument(skip(self, path), fields(path = %path.display(), pages = self.kids.len()))]
    pub fn write_to(self, path: &Path) -> Result<u64> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)
            .map_err(|err| FolioError::PartialWrite(format!("{}: {}", path.display(), err)))?;
        debug!(bytes = bytes.len(), "document written");
        Ok(bytes.len() as u64)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep copy of objects from one source document into a target.
struct ObjectCopier<'a> {
    source: &'a Document,
    /// Source id -> target id for everything copied so far.
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    fn copy(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(target, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy(target, item)).collect())
            }
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(target, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    /// Copy a dictionary, dropping /Parent. Page tree parents are patched by
    /// the writer; following them would drag the whole source tree along.
    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.copy(target, value));
        }
        copy
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Object {
        if let Some(&new_id) = self.copied.get(&id) {
            return Object::Reference(new_id);
        }
        let Ok(object) = self.source.get_object(id) else {
            warn!(?id, "cannot resolve reference, using Null");
            return Object::Null;
        };

        // Register before recursing so cycles come back to this id.
        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy(target, object);
        target.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}
