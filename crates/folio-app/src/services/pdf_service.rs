// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF service — owns the staging area and its background lifecycle tasks,
// and runs every document operation against staged inputs.
//
// Document work is CPU-bound and `lopdf` documents never leave the blocking
// pool: each operation opens its inputs inside `run_blocking` and hands back
// only paths and reports. Inputs are released as soon as an operation
// finishes, whatever the outcome; outputs are released after delivery.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use folio_core::error::{FolioError, Result};
use folio_core::types::{CompressionLevel, CompressionReport, SplitEntry, SplitStrategy, StagedFile};
use folio_core::{ErrorReport, FolioConfig, report_error};
use folio_document::{
    CompressionPipeline, DocumentMerger, DocumentSplitter, PageSelection, PdfReader, TextOverlay,
    archive, overlay_text, rotate_pages, run_blocking,
};
use folio_staging::{
    CleanupGuard, CleanupScheduler, StagingArea, SweepReport, Sweeper, SweeperHandle, sweep_once,
};
use tracing::{debug, info, instrument, warn};

/// Position overrides for the signature and note overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Placement {
    /// 0-based page index.
    pub page: Option<usize>,
    pub at: Option<(f32, f32)>,
}

impl Placement {
    fn apply(self, mut overlay: TextOverlay) -> TextOverlay {
        if let Some(page) = self.page {
            overlay = overlay.on_page(page);
        }
        if let Some((x, y)) = self.at {
            overlay = overlay.at(x, y);
        }
        overlay
    }
}

/// Shared handle to the document services.
///
/// All fields are cheaply cloneable (Arc-wrapped) so the service can be moved
/// into tasks freely.
#[derive(Clone)]
pub struct PdfService {
    config: Arc<FolioConfig>,
    staging: StagingArea,
    scheduler: Arc<CleanupScheduler>,
    sweeper: Arc<Mutex<Option<SweeperHandle>>>,
    compression: Arc<CompressionPipeline>,
}

impl PdfService {
    /// Open the staging area and start the cleanup scheduler and sweeper.
    /// Must be called inside a tokio runtime.
    ///
    /// The staging root is `config.staging_root`, or `<data_dir>/staging`.
    pub fn init(config: FolioConfig, data_dir: &Path) -> Result<Self> {
        let root = config
            .staging_root
            .clone()
            .unwrap_or_else(|| data_dir.join("staging"));
        info!(path = %root.display(), "initialising pdf service");

        let staging = StagingArea::open(&root)?;
        let scheduler = CleanupScheduler::start();
        let sweeper = Sweeper::new(
            staging.managed_dirs(),
            config.retention(),
            config.sweep_interval(),
        )
        .start();
        let compression =
            CompressionPipeline::new(staging.clone(), config.optimizer_candidates.clone());

        Ok(Self {
            config: Arc::new(config),
            staging,
            scheduler: Arc::new(scheduler),
            sweeper: Arc::new(Mutex::new(Some(sweeper))),
            compression: Arc::new(compression),
        })
    }

    /// Stop the sweeper and delete every pending deferred release. Returns
    /// how many deferred files were flushed.
    pub async fn shutdown(&self) -> usize {
        let sweeper = self.sweeper.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = sweeper {
            handle.stop().await;
        }
        let flushed = self.scheduler.shutdown().await;
        info!(flushed, "pdf service stopped");
        flushed
    }

    // -- Upload / download boundary ------------------------------------------

    /// Persist uploaded bytes under `uploads/`.
    pub async fn stage_upload(&self, bytes: Vec<u8>, name: &str) -> Result<StagedFile> {
        let staging = self.staging.clone();
        let name = name.to_string();
        run_blocking(move || staging.stage(&bytes, &name)).await
    }

    /// Mark `paths` as delivered; each is deleted after the grace delay.
    pub fn complete_delivery(&self, paths: &[PathBuf]) {
        self.release_after(paths, self.config.grace_delay());
    }

    /// Like [`complete_delivery`](Self::complete_delivery) for split outputs
    /// and their bundles, which use the shorter split grace delay.
    pub fn complete_split_delivery(&self, paths: &[PathBuf]) {
        self.release_after(paths, self.config.split_grace_delay());
    }

    fn release_after(&self, paths: &[PathBuf], delay: Duration) {
        for path in paths {
            self.scheduler.release(path.clone(), Some(delay));
        }
        debug!(count = paths.len(), delay_secs = delay.as_secs(), "delivery complete");
    }

    // -- Operations -----------------------------------------------------------

    /// Merge `inputs` in order into one document.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn merge(&self, inputs: Vec<PathBuf>) -> Result<PathBuf> {
        let staging = self.staging.clone();
        let sources = inputs.clone();
        let result = run_blocking(move || DocumentMerger::new(&staging).merge(&sources)).await;
        self.settle(&inputs, result)
    }

    #[instrument(skip(self, input), fields(input = %input.display()))]
    pub async fn split(&self, input: PathBuf, strategy: SplitStrategy) -> Result<Vec<SplitEntry>> {
        let staging = self.staging.clone();
        let source = input.clone();
        let result = run_blocking(move || {
            let reader = PdfReader::open(&source)?;
            DocumentSplitter::new(&staging).split(&reader, &strategy)
        })
        .await;
        self.settle(&[input], result)
    }

    /// Compress at the named level, or the configured default when `level`
    /// is `None`.
    #[instrument(skip(self, input), fields(input = %input.display()))]
    pub async fn compress(
        &self,
        input: PathBuf,
        level: Option<&str>,
    ) -> Result<CompressionReport> {
        let level = level
            .map(CompressionLevel::from_name)
            .unwrap_or(self.config.default_compression);
        let result = self.compression.compress(&input, level).await;
        self.settle(&[input], result)
    }

    /// Rotate the selected pages (all when `pages` is `None`) by `degrees`.
    #[instrument(skip(self, input), fields(input = %input.display()))]
    pub async fn rotate(
        &self,
        input: PathBuf,
        degrees: i32,
        pages: Option<String>,
    ) -> Result<PathBuf> {
        let label = degrees.rem_euclid(360).to_string();
        let result = self
            .rewrite(&input, "rotated", &label, move |reader| {
                let selection = pages
                    .as_deref()
                    .map(|expression| PageSelection::parse(expression, reader.page_count()))
                    .transpose()?;
                rotate_pages(reader, degrees, selection.as_ref())?;
                Ok(())
            })
            .await;
        self.settle(&[input], result)
    }

    pub async fn watermark(&self, input: PathBuf, text: Option<String>) -> Result<PathBuf> {
        let overlay = TextOverlay::watermark(text.as_deref());
        self.stamp(input, "watermarked", overlay).await
    }

    pub async fn sign(
        &self,
        input: PathBuf,
        text: Option<String>,
        placement: Placement,
    ) -> Result<PathBuf> {
        let overlay = placement.apply(TextOverlay::signature(text.as_deref()));
        self.stamp(input, "signed", overlay).await
    }

    pub async fn edit(&self, input: PathBuf, text: &str, placement: Placement) -> Result<PathBuf> {
        let overlay = placement.apply(TextOverlay::note(text));
        self.stamp(input, "edited", overlay).await
    }

    /// Zip the outputs of a split into one archive. The bundled files are
    /// released once the archive exists.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn bundle(&self, entries: Vec<SplitEntry>) -> Result<PathBuf> {
        let inputs: Vec<PathBuf> = entries.iter().map(|entry| entry.path.clone()).collect();
        let staging = self.staging.clone();
        let result = run_blocking(move || archive::bundle(&staging, &entries)).await;
        self.settle(&inputs, result)
    }

    /// Run one sweep pass now, outside the background schedule.
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        let dirs = self.staging.managed_dirs();
        let retention = self.config.retention();
        run_blocking(move || Ok(sweep_once(&dirs, retention, SystemTime::now()))).await
    }

    /// Render `err` for the caller according to the configured mode.
    pub fn render_error(&self, err: &FolioError) -> ErrorReport {
        report_error(err, self.config.production)
    }

    // -- Internals ------------------------------------------------------------

    async fn stamp(
        &self,
        input: PathBuf,
        purpose: &'static str,
        overlay: TextOverlay,
    ) -> Result<PathBuf> {
        let result = self
            .rewrite(&input, purpose, "", move |reader| {
                if overlay_text(reader, &overlay)? == 0 {
                    warn!(target_page = ?overlay.target, "overlay page outside document, content unchanged");
                }
                Ok(())
            })
            .await;
        self.settle(&[input], result)
    }

    /// Open `input`, apply `edit`, and save the result as a new artifact.
    async fn rewrite<F>(
        &self,
        input: &Path,
        purpose: &'static str,
        label: &str,
        edit: F,
    ) -> Result<PathBuf>
    where
        F: FnOnce(&mut PdfReader) -> Result<()> + Send + 'static,
    {
        let output = self.staging.artifact_path(purpose, label, "pdf");
        let source = input.to_path_buf();
        run_blocking(move || {
            let mut reader = PdfReader::open(&source)?;
            edit(&mut reader)?;

            let mut guard = CleanupGuard::new(purpose);
            guard.track(&output);
            let bytes = reader.to_bytes()?;
            std::fs::write(&output, &bytes).map_err(|err| {
                FolioError::PartialWrite(format!("{}: {}", output.display(), err))
            })?;
            guard.keep(&output);
            Ok(output)
        })
        .await
    }

    fn release_managed(&self, path: &Path) {
        if self.staging.contains(path) {
            self.scheduler.release(path.to_path_buf(), None);
        } else {
            debug!(path = %path.display(), "file outside staging left in place");
        }
    }

    /// Release managed `inputs` immediately and pass `result` through.
    fn settle<T>(&self, inputs: &[PathBuf], result: Result<T>) -> Result<T> {
        for input in inputs {
            self.release_managed(input);
        }
        if let Err(err) = &result {
            warn!(kind = ?err.kind(), %err, "operation failed");
        }
        result
    }
}

#[cfg(test)]
impl PdfService {
    pub(crate) fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Deferred releases still waiting for their deadline.
    pub(crate) async fn pending_releases(&self) -> usize {
        self.scheduler.pending().await
    }
}
