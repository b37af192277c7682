// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staging area — the managed root under which uploads and generated artifacts
// are written.
//
// Layout:
//   <root>/uploads/    staged inputs
//   <root>/processed/  generated outputs and intermediates
//
// Every generated name has the form `<purpose>-<label>-<millis>-<nonce>.<ext>`
// so concurrent requests never derive the same path.

use std::path::{Path, PathBuf};

use chrono::Utc;
use folio_core::error::Result;
use folio_core::types::{StageId, StagedFile};
use tracing::{debug, instrument};

use crate::guard::remove_file;

/// Longest label kept in a generated file name.
const MAX_LABEL_LEN: usize = 64;

/// Handle to the managed staging directories.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    uploads: PathBuf,
    processed: PathBuf,
}

impl StagingArea {
    /// Open (and create if needed) the staging area rooted at `root`.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let uploads = root.join("uploads");
        let processed = root.join("processed");
        std::fs::create_dir_all(&uploads)?;
        std::fs::create_dir_all(&processed)?;
        debug!("staging directories ready");
        Ok(Self {
            root,
            uploads,
            processed,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed
    }

    /// Directories scanned by the retention sweep.
    pub fn managed_dirs(&self) -> Vec<PathBuf> {
        vec![self.uploads.clone(), self.processed.clone()]
    }

    /// Write uploaded bytes into `uploads/`.
    ///
    /// `original_name` only contributes a sanitised stem and extension to the
    /// staged name. A failed write leaves nothing behind.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn stage(&self, bytes: &[u8], original_name: &str) -> Result<StagedFile> {
        let original = Path::new(original_name);
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let ext = original
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| sanitize(&e.to_ascii_lowercase()))
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "pdf".to_string());

        let id = StageId::new();
        let path = self
            .uploads
            .join(unique_name("upload", stem, &ext, &id));

        if let Err(err) = std::fs::write(&path, bytes) {
            remove_file(&path);
            return Err(err.into());
        }

        debug!(path = %path.display(), "upload staged");
        Ok(StagedFile {
            id,
            path,
            size_bytes: bytes.len() as u64,
            created_at: Utc::now(),
        })
    }

    /// A fresh path under `processed/` for a generated artifact. Nothing is
    /// created on disk.
    pub fn artifact_path(&self, purpose: &str, label: &str, ext: &str) -> PathBuf {
        self.processed
            .join(unique_name(purpose, label, ext, &StageId::new()))
    }

    /// Whether `path` lies inside the managed root.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }
}

fn unique_name(purpose: &str, label: &str, ext: &str, id: &StageId) -> String {
    let millis = Utc::now().timestamp_millis();
    let purpose = sanitize(purpose);
    let label = sanitize(label);
    if label.is_empty() {
        format!("{purpose}-{millis}-{}.{ext}", id.short())
    } else {
        format!("{purpose}-{label}-{millis}-{}.{ext}", id.short())
    }
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .take(MAX_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
