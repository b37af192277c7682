// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document merger — concatenate the pages of several documents, in the order
// the sources are listed.

use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Result};
use folio_staging::{CleanupGuard, StagingArea};
use tracing::{info, instrument};

use crate::pdf::{PdfReader, PdfWriter};

/// Writes merged documents into the staging area.
pub struct DocumentMerger<'a> {
    staging: &'a StagingArea,
}

impl<'a> DocumentMerger<'a> {
    pub fn new(staging: &'a StagingArea) -> Self {
        Self { staging }
    }

    /// Merge `sources` into one new document and return its path.
    ///
    /// Every source is parsed and copied in memory before anything is
    /// written, so a corrupt source leaves no output behind.
    #[instrument(skip(self, sources), fields(sources = sources.len()))]
    pub fn merge<P: AsRef<Path>>(&self, sources: &[P]) -> Result<PathBuf> {
        if sources.is_empty() {
            return Err(FolioError::NoInputs);
        }

        let mut writer = PdfWriter::new();
        for source in sources {
            let reader = PdfReader::open(source)?;
            writer.import_all(&reader)?;
        }
        let pages = writer.page_count();

        let path = self.staging.artifact_path("merged", "", "pdf");
        let mut guard = CleanupGuard::new("merge");
        guard.track(&path);
        writer.write_to(&path)?;
        guard.disarm();

        info!(pages, path = %path.display(), "PDFs merged");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{file_page_texts, numbered_pdf};
    use crate::split::DocumentSplitter;
    use folio_core::types::SplitStrategy;

    #[test]
    fn output_order_follows_input_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staging = StagingArea::open(dir.path()).expect("staging");
        let two = dir.path().join("two.pdf");
        let three = dir.path().join("three.pdf");
        std::fs::write(&two, numbered_pdf(2)).expect("write");
        std::fs::write(&three, numbered_pdf(3)).expect("write");

        let merged = DocumentMerger::new(&staging)
            .merge(&[&three, &two])
            .expect("merge");

        assert_eq!(
            file_page_texts(&merged),
            vec!["Page 1", "Page 2", "Page 3", "Page 1", "Page 2"]
        );
    }

    #[test]
    fn corrupt_source_leaves_nothing_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staging = StagingArea::open(dir.path()).expect("staging");
        let good = dir.path().join("good.pdf");
        let bad = dir.path().join("bad.pdf");
        std::fs::write(&good, numbered_pdf(2)).expect("write");
        std::fs::write(&bad, b"not a pdf at all").expect("write");

        let err = DocumentMerger::new(&staging)
            .merge(&[&good, &bad])
            .unwrap_err();

        assert_eq!(err.kind(), folio_core::ErrorKind::CorruptSource);
        let leftovers = std::fs::read_dir(staging.processed_dir()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn empty_input_list_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staging = StagingArea::open(dir.path()).expect("staging");
        let none: [&Path; 0] = [];
        assert!(matches!(
            DocumentMerger::new(&staging).merge(&none),
            Err(FolioError::NoInputs)
        ));
    }

    #[test]
    fn merging_individual_split_outputs_restores_the_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staging = StagingArea::open(dir.path()).expect("staging");
        let source = PdfReader::from_bytes(&numbered_pdf(4)).expect("load");

        let mut entries = DocumentSplitter::new(&staging)
            .split(&source, &SplitStrategy::Individual)
            .expect("split");
        entries.sort_by_key(|entry| entry.sequence);
        let paths: Vec<_> = entries.iter().map(|entry| entry.path.clone()).collect();

        let merged = DocumentMerger::new(&staging).merge(&paths).expect("merge");
        assert_eq!(
            file_page_texts(&merged),
            vec!["Page 1", "Page 2", "Page 3", "Page 4"]
        );
    }
}
