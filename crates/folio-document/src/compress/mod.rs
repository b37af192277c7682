// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression pipeline.
//
//   1. Parse the input; a corrupt input fails the request.
//   2. Run the external optimizer into a scratch file.
//   3. Verify the scratch file and move it into place.
//   4. If 2 or 3 fails, re-save the parsed input structurally instead
//      (unreachable objects pruned, streams Flate-compressed).
//
// Only the final output survives. The optimizer runs on its own task which
// owns the scratch file until it hands a verified result back, so a request
// dropped mid-run still has its scratch removed once the child exits.

pub mod external;
pub mod verify;

#[cfg(all(test, unix))]
pub(crate) mod test_tools;

use std::ffi::OsString;
use std::path::Path;

use folio_core::error::{FolioError, Result};
use folio_core::types::{CompressionLevel, CompressionPreset, CompressionReport};
use folio_staging::{CleanupGuard, StagingArea, remove_file};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::pdf::PdfReader;
use crate::run_blocking;
use external::{ChainOutcome, Optimizer, optimizer_args};
use verify::verify_output;

/// Reduces PDF size, preferring the external optimizer.
pub struct CompressionPipeline {
    staging: StagingArea,
    optimizer: Optimizer,
}

impl CompressionPipeline {
    pub fn new(staging: StagingArea, candidates: Vec<String>) -> Self {
        Self {
            staging,
            optimizer: Optimizer::new(candidates),
        }
    }

    /// Compress with a level given by name; unknown names mean `medium`.
    pub async fn compress_named(&self, input: &Path, level_name: &str) -> Result<CompressionReport> {
        self.compress(input, CompressionLevel::from_name(level_name))
            .await
    }

    /// Compress `input` at `level` into a new file under `processed/`.
    #[instrument(skip(self, input), fields(input = %input.display(), compression = %level))]
    pub async fn compress(&self, input: &Path, level: CompressionLevel) -> Result<CompressionReport> {
        let original = tokio::fs::read(input).await?;
        let original_size = original.len() as u64;
        let original = run_blocking(move || {
            PdfReader::from_bytes(&original)?;
            Ok(original)
        })
        .await?;

        let output = self
            .staging
            .artifact_path("compressed", level.as_str(), "pdf");
        let scratch = self
            .staging
            .artifact_path("tmp-compressed", level.as_str(), "pdf");
        let mut guard = CleanupGuard::new("compress");
        guard.track(&output);
        guard.track(&scratch);

        let optimizer = match self.run_optimizer(level.preset(), input, &scratch).await {
            Some(binary) => match tokio::fs::rename(&scratch, &output).await {
                Ok(()) => Some(binary),
                Err(err) => {
                    warn!(%err, "could not move optimizer output into place");
                    None
                }
            },
            None => None,
        };
        if optimizer.is_none() {
            remove_file(&scratch);
            let target = output.clone();
            run_blocking(move || structural_resave(&original, &target)).await?;
        }

        let compressed_size = tokio::fs::metadata(&output).await?.len();
        guard.keep(&output);
        drop(guard);

        let report = CompressionReport {
            output_path: output,
            level,
            original_size,
            compressed_size,
            reduction_percent: CompressionReport::reduction(original_size, compressed_size),
            used_external_tool: optimizer.is_some(),
            optimizer,
        };
        info!(
            original_size,
            compressed_size,
            reduction = report.reduction_percent,
            external = report.used_external_tool,
            "PDF compressed"
        );
        Ok(report)
    }

    /// Primary path. Runs the candidate chain into `scratch` on a detached
    /// task and returns the binary whose output passed verification.
    ///
    /// The task removes `scratch` itself unless the verified file is handed
    /// back to a caller that is still waiting for it.
    async fn run_optimizer(
        &self,
        preset: CompressionPreset,
        input: &Path,
        scratch: &Path,
    ) -> Option<String> {
        let args = optimizer_args(&preset, input, scratch);
        let optimizer = self.optimizer.clone();
        let scratch = scratch.to_path_buf();
        let (handoff, verified) = oneshot::channel();

        tokio::spawn(async move {
            let mut guard = CleanupGuard::new("optimizer");
            guard.track(&scratch);
            if let Some(binary) = optimize_and_verify(&optimizer, &args, &scratch).await {
                if handoff.send(binary).is_ok() {
                    guard.keep(&scratch);
                } else {
                    debug!(path = %scratch.display(), "request gone, discarding optimizer output");
                }
            }
        });

        verified.await.ok()
    }
}

async fn optimize_and_verify(
    optimizer: &Optimizer,
    args: &[OsString],
    scratch: &Path,
) -> Option<String> {
    let binary = match optimizer.run(args).await {
        ChainOutcome::Succeeded { binary, .. } => binary,
        exhausted @ ChainOutcome::Exhausted { .. } => {
            let err = FolioError::ExternalToolUnavailable(exhausted.summary());
            warn!(%err, "falling back to structural compression");
            return None;
        }
    };

    let candidate = scratch.to_path_buf();
    match tokio::task::spawn_blocking(move || verify_output(&candidate)).await {
        Ok(Ok(_)) => Some(binary),
        Ok(Err(rejection)) => {
            warn!(binary = %binary, %rejection, "optimizer output rejected");
            None
        }
        Err(err) => {
            warn!(%err, "verification task failed");
            None
        }
    }
}

/// Lossless re-save of `original`: drop unreachable objects, Flate-compress
/// streams, and write the result to `output`.
pub fn structural_resave(original: &[u8], output: &Path) -> Result<u64> {
    let mut document = PdfReader::from_bytes(original)?.into_document();
    document.prune_objects();
    document.compress();

    let mut bytes = Vec::new();
    document
        .save_to(&mut bytes)
        .map_err(|err| FolioError::CompressionFailed(format!("re-save failed: {}", err)))?;
    std::fs::write(output, &bytes)
        .map_err(|err| FolioError::CompressionFailed(format!("{}: {}", output.display(), err)))?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    #[cfg(unix)]
    use std::time::Duration;

    use super::*;
    use crate::pdf::fixtures::{file_page_texts, numbered_pdf};

    fn setup(pages: u32) -> (tempfile::TempDir, StagingArea, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let staging = StagingArea::open(dir.path().join("staging")).expect("staging");
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, numbered_pdf(pages)).expect("write input");
        (dir, staging, input)
    }

    fn processed(staging: &StagingArea) -> Vec<PathBuf> {
        std::fs::read_dir(staging.processed_dir())
            .expect("read dir")
            .map(|entry| entry.expect("entry").path())
            .collect()
    }

    #[tokio::test]
    async fn falls_back_when_no_optimizer_exists() {
        let (dir, staging, input) = setup(3);
        let missing = dir.path().join("no-gs").display().to_string();
        let pipeline = CompressionPipeline::new(staging.clone(), vec![missing]);

        let report = pipeline.compress_named(&input, "HIGH").await.expect("compress");

        assert!(!report.used_external_tool);
        assert_eq!(report.optimizer, None);
        assert_eq!(report.level, CompressionLevel::High);
        assert_eq!(processed(&staging), vec![report.output_path.clone()]);
        assert!(verify_output(&report.output_path).is_ok());
        assert_eq!(
            file_page_texts(&report.output_path),
            vec!["Page 1", "Page 2", "Page 3"]
        );
        assert_eq!(
            report.reduction_percent,
            CompressionReport::reduction(report.original_size, report.compressed_size)
        );
        assert!(input.exists());
    }

    #[tokio::test]
    async fn corrupt_input_is_rejected_before_any_output() {
        let (dir, staging, _) = setup(1);
        let bogus = dir.path().join("bogus.pdf");
        std::fs::write(&bogus, b"hello world").expect("write");
        let pipeline = CompressionPipeline::new(staging.clone(), vec![]);

        let err = pipeline
            .compress(&bogus, CompressionLevel::Medium)
            .await
            .unwrap_err();

        assert!(matches!(err, FolioError::CorruptSource(_)), "{err}");
        assert!(processed(&staging).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn verified_optimizer_output_is_used() {
        use test_tools::succeeding_tool;

        let (dir, staging, input) = setup(2);
        let tool = succeeding_tool(dir.path());
        let pipeline = CompressionPipeline::new(staging.clone(), vec![tool.clone()]);

        let report = pipeline
            .compress(&input, CompressionLevel::Low)
            .await
            .expect("compress");

        assert!(report.used_external_tool);
        assert_eq!(report.optimizer.as_deref(), Some(tool.as_str()));
        // The stand-in optimizer copies its input, so nothing is saved.
        assert_eq!(report.compressed_size, report.original_size);
        assert_eq!(report.reduction_percent, 0.0);
        assert_eq!(processed(&staging), vec![report.output_path.clone()]);
        assert!(verify_output(&report.output_path).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_optimizer_output_is_discarded() {
        use test_tools::garbage_tool;

        let (dir, staging, input) = setup(2);
        let tool = garbage_tool(dir.path());
        let pipeline = CompressionPipeline::new(staging.clone(), vec![tool]);

        let report = pipeline
            .compress(&input, CompressionLevel::Medium)
            .await
            .expect("compress");

        assert!(!report.used_external_tool);
        assert_eq!(processed(&staging), vec![report.output_path.clone()]);
        assert!(verify_output(&report.output_path).is_ok());
    }

    #[tokio::test]
    async fn unwritable_fallback_reports_compression_failure() {
        let (dir, staging, input) = setup(2);
        let missing = dir.path().join("no-gs").display().to_string();
        let pipeline = CompressionPipeline::new(staging.clone(), vec![missing]);
        std::fs::remove_dir(staging.processed_dir()).expect("remove processed");

        let err = pipeline
            .compress(&input, CompressionLevel::Medium)
            .await
            .unwrap_err();

        assert!(matches!(err, FolioError::CompressionFailed(_)), "{err}");
        assert_eq!(err.kind(), folio_core::ErrorKind::CompressionFailed);
        assert!(!staging.processed_dir().exists());
        assert_eq!(
            std::fs::read_dir(staging.uploads_dir()).expect("uploads").count(),
            0
        );
    }

    #[test]
    fn resave_into_a_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = structural_resave(&numbered_pdf(1), dir.path()).unwrap_err();
        assert!(matches!(err, FolioError::CompressionFailed(_)), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_request_leaves_no_scratch_behind() {
        use test_tools::slow_tool;

        let (dir, staging, input) = setup(2);
        let tool = slow_tool(dir.path());
        let pipeline = CompressionPipeline::new(staging.clone(), vec![tool]);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(200),
            pipeline.compress(&input, CompressionLevel::Medium),
        )
        .await;
        assert!(abandoned.is_err(), "optimizer finished too early");

        // Give the optimizer time to exit and its task to clean up.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(processed(&staging).is_empty(), "{:?}", processed(&staging));
    }
}
