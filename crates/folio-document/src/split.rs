// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document splitter — divide one document into standalone sub-documents.
//
// Strategies:
//   individual  one output per page
//   selected    one output holding a parsed page selection, in selection order
//   equal       `parts` outputs of ceil(total / parts) pages
//   chunk       outputs of `chunk_size` pages, the last holding the remainder
//
// Splitting is all-or-nothing: if any output fails, every output already
// written is removed before the error is returned.

use std::path::Path;

use folio_core::error::{FolioError, Result};
use folio_core::types::{SplitEntry, SplitStrategy};
use folio_staging::{CleanupGuard, StagingArea};
use tracing::{info, instrument};

use crate::pdf::{PdfReader, PdfWriter};
use crate::selection::{PageSelection, describe_pages, pages_file_label};

/// One sub-document of a split plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPart {
    /// 1-based position among the outputs.
    pub sequence: u32,
    /// Source pages (1-based) in output order.
    pub pages: Vec<u32>,
}

/// Work out which pages go into which output, validating the parameters
/// against a document of `total_pages` pages.
pub fn plan_split(strategy: &SplitStrategy, total_pages: u32) -> Result<Vec<PlannedPart>> {
    if total_pages < 2 {
        return Err(FolioError::SingleOrEmptyDocument { pages: total_pages });
    }

    let groups: Vec<Vec<u32>> = match strategy {
        SplitStrategy::Individual => (1..=total_pages).map(|page| vec![page]).collect(),

        SplitStrategy::Selected { pages } => {
            vec![PageSelection::parse(pages, total_pages)?.into_pages()]
        }

        SplitStrategy::Equal { parts } => {
            let parts = *parts;
            if parts < 2 || parts > total_pages {
                return Err(FolioError::InvalidPartCount { parts, total_pages });
            }
            let size = total_pages.div_ceil(parts);
            // Rounding up can exhaust the pages before the last partition;
            // such partitions are omitted.
            (0..parts)
                .map(|index| index * size)
                .take_while(|&start| start < total_pages)
                .map(|start| (start + 1..=(start + size).min(total_pages)).collect())
                .collect()
        }

        SplitStrategy::Chunk { chunk_size } => {
            let chunk_size = *chunk_size;
            if chunk_size < 1 || chunk_size >= total_pages {
                return Err(FolioError::InvalidChunkSize {
                    chunk_size,
                    total_pages,
                });
            }
            (1..=total_pages)
                .step_by(chunk_size as usize)
                .map(|start| (start..=(start + chunk_size - 1).min(total_pages)).collect())
                .collect()
        }
    };

    Ok(groups
        .into_iter()
        .enumerate()
        .map(|(index, pages)| PlannedPart {
            sequence: index as u32 + 1,
            pages,
        })
        .collect())
}

/// Writes split outputs into the staging area.
pub struct DocumentSplitter<'a> {
    staging: &'a StagingArea,
}

impl<'a> DocumentSplitter<'a> {
    pub fn new(staging: &'a StagingArea) -> Self {
        Self { staging }
    }

    /// Split `source` according to `strategy`.
    ///
    /// Returns one entry per output in sequence order. On error no output
    /// file remains.
    #[instrument(skip(self, source), fields(pages = source.page_count()))]
    pub fn split(&self, source: &PdfReader, strategy: &SplitStrategy) -> Result<Vec<SplitEntry>> {
        let plan = plan_split(strategy, source.page_count())?;
        info!(outputs = plan.len(), strategy = strategy.purpose(), "splitting PDF");

        self.emit_parts(strategy, &plan, |part, path| {
            let mut writer = PdfWriter::new();
            writer.import_pages(source, &part.pages)?;
            writer.write_to(path).map(|_| ())
        })
    }

    fn emit_parts<F>(
        &self,
        strategy: &SplitStrategy,
        plan: &[PlannedPart],
        mut write: F,
    ) -> Result<Vec<SplitEntry>>
    where
        F: FnMut(&PlannedPart, &Path) -> Result<()>,
    {
        let mut guard = CleanupGuard::new("split");
        let mut entries = Vec::with_capacity(plan.len());

        for part in plan {
            let (file_label, display_name) = naming(strategy, part);
            let path = self
                .staging
                .artifact_path(strategy.purpose(), &file_label, "pdf");
            guard.track(&path);
            write(part, &path)?;

            entries.push(SplitEntry {
                path,
                display_name,
                page_range_label: describe_pages(&part.pages),
                sequence: part.sequence,
                pages: part.pages.clone(),
            });
        }

        guard.disarm();
        Ok(entries)
    }
}

/// File-name label and download name for one output.
fn naming(strategy: &SplitStrategy, part: &PlannedPart) -> (String, String) {
    let first = part.pages.first().copied().unwrap_or_default();
    let last = part.pages.last().copied().unwrap_or_default();
    match strategy {
        SplitStrategy::Individual => (first.to_string(), format!("page-{first}.pdf")),
        SplitStrategy::Selected { .. } => {
            let label = pages_file_label(&part.pages);
            (format!("pages-{label}"), format!("split-pages-{label}.pdf"))
        }
        SplitStrategy::Equal { .. } | SplitStrategy::Chunk { .. } => {
            let label = format!("{}-pages-{first}-{last}", part.sequence);
            let display = format!("{}-{label}.pdf", strategy.purpose());
            (label, display)
        }
    }
}
