// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Document operations for the Folio PDF engine.
//
// Provides page selection parsing, splitting, merging, rotation and text
// overlays on top of `lopdf`, the compression pipeline (external optimizer
// with a verified structural fallback), and zip bundling of outputs.

pub mod archive;
pub mod compress;
pub mod edit;
pub mod merge;
pub mod pdf;
pub mod selection;
pub mod split;

// Re-export the primary structs so callers can use `folio_document::PdfReader` etc.
pub use archive::bundle;
pub use compress::CompressionPipeline;
pub use edit::{Anchor, PageTarget, TextOverlay, overlay_text, rotate_pages};
pub use merge::DocumentMerger;
pub use pdf::{PdfReader, PdfWriter};
pub use selection::PageSelection;
pub use split::{DocumentSplitter, plan_split};

use folio_core::error::{FolioError, Result};

/// Run CPU-bound document work on the blocking pool.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| FolioError::PdfError(format!("document worker failed: {}", err)))?
}
