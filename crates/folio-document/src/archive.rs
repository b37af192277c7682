// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact bundling — pack several generated files into one zip archive for
// download.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Result};
use folio_core::types::SplitEntry;
use folio_staging::{CleanupGuard, StagingArea};
use tracing::{info, instrument};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Write every entry into a Deflate zip under `processed/` and return the
/// archive path. Entries are stored under their display names, in order.
#[instrument(skip_all, fields(entries = entries.len()))]
pub fn bundle(staging: &StagingArea, entries: &[SplitEntry]) -> Result<PathBuf> {
    if entries.is_empty() {
        return Err(FolioError::NoInputs);
    }

    let path = staging.artifact_path("split", "bundle", "zip");
    let mut guard = CleanupGuard::new("bundle");
    guard.track(&path);
    write_archive(&path, entries)?;
    guard.disarm();

    info!(path = %path.display(), "artifacts bundled");
    Ok(path)
}

fn write_archive(path: &Path, entries: &[SplitEntry]) -> Result<()> {
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.display_name.as_str(), options)
            .map_err(|err| FolioError::Archive(format!("{}: {}", entry.display_name, err)))?;
        let mut source = File::open(&entry.path)?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()
        .map_err(|err| FolioError::Archive(format!("failed to finalise archive: {}", err)))?;
    Ok(())
}
