// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request-scoped cleanup — every file a request creates is tracked here and
// removed when the guard drops unless it was handed off first.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Result of a single delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The file was already gone, e.g. a concurrent sweep got there first.
    AlreadyGone,
    Failed,
}

/// Delete `path`, treating a missing file as already cleaned.
///
/// Failures are logged and reported, never raised, so cleanup on an error
/// path cannot mask the error that triggered it.
pub fn remove_file(path: &Path) -> Removal {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "file removed");
            Removal::Removed
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Removal::AlreadyGone,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to remove file");
            Removal::Failed
        }
    }
}

/// Tracks files created by one operation.
///
/// Dropping the guard removes every tracked file. On the success path the
/// caller calls [`CleanupGuard::keep`] for the outputs it returns (or
/// [`CleanupGuard::disarm`] for all of them) before the guard goes out of
/// scope.
#[derive(Debug)]
pub struct CleanupGuard {
    operation: &'static str,
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            paths: Vec::new(),
        }
    }

    /// Register a path. Call this before writing so a half-written file is
    /// covered too.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Stop tracking `path`; it survives the guard.
    pub fn keep(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Hand every tracked path to the caller. Nothing is removed.
    pub fn disarm(mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.paths)
    }

    /// Remove every tracked path now and return how many were deleted.
    pub fn cleanup_now(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            if remove_file(&path) == Removal::Removed {
                removed += 1;
            }
        }
        removed
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if self.paths.is_empty() {
            return;
        }
        let tracked = self.paths.len();
        let removed = self.cleanup_now();
        debug!(
            operation = self.operation,
            tracked, removed, "cleanup guard released files"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_removes_tracked_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        std::fs::write(&a, b"a").expect("write a");
        std::fs::write(&b, b"b").expect("write b");

        {
            let mut guard = CleanupGuard::new("test");
            guard.track(&a);
            guard.track(&b);
        }

        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn kept_and_disarmed_paths_survive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kept = dir.path().join("kept.pdf");
        let scratch = dir.path().join("scratch.pdf");
        std::fs::write(&kept, b"k").expect("write");
        std::fs::write(&scratch, b"s").expect("write");

        let mut guard = CleanupGuard::new("test");
        guard.track(&kept);
        guard.track(&scratch);
        guard.keep(&kept);
        drop(guard);
        assert!(kept.exists());
        assert!(!scratch.exists());

        let mut guard = CleanupGuard::new("test");
        guard.track(&kept);
        assert_eq!(guard.disarm(), vec![kept.clone()]);
        assert!(kept.exists());
    }

    #[test]
    fn missing_files_count_as_already_gone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let never_written = dir.path().join("never.pdf");
        assert_eq!(remove_file(&never_written), Removal::AlreadyGone);

        let mut guard = CleanupGuard::new("test");
        guard.track(&never_written);
        assert_eq!(guard.cleanup_now(), 0);
        assert!(guard.tracked().is_empty());
    }
}
