// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Validation errors --
    #[error("invalid page range: {0}")]
    InvalidRange(String),

    #[error("no valid pages selected")]
    EmptySelection,

    #[error("cannot split a document with {pages} page(s)")]
    SingleOrEmptyDocument { pages: u32 },

    #[error("invalid number of parts: {parts} (must be between 2 and {total_pages})")]
    InvalidPartCount { parts: u32, total_pages: u32 },

    #[error("invalid chunk size: {chunk_size} (must be between 1 and {max})", max = .total_pages.saturating_sub(1))]
    InvalidChunkSize { chunk_size: u32, total_pages: u32 },

    #[error("rotation must be a multiple of 90, got {0}")]
    InvalidRotation(i32),

    #[error("no input documents supplied")]
    NoInputs,

    // -- Document errors --
    #[error("not a valid PDF document: {0}")]
    CorruptSource(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("failed while writing output: {0}")]
    PartialWrite(String),

    // -- Compression --
    #[error("external optimizer unavailable: {0}")]
    ExternalToolUnavailable(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    // -- Storage / persistence --
    #[error("archive error: {0}")]
    Archive(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error taxonomy surfaced to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad parameters: ranges, part or chunk counts, empty selections.
    Validation,
    /// An input failed to parse as a PDF.
    CorruptSource,
    /// Every optimizer candidate failed to launch or run.
    ExternalToolUnavailable,
    /// Neither the optimizer nor the structural fallback produced output.
    CompressionFailed,
    /// An I/O failure in the middle of a split or merge.
    PartialWriteFailure,
    /// Generic staging or cleanup failure.
    Io,
}

impl FolioError {
    /// Classify this error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FolioError::InvalidRange(_)
            | FolioError::EmptySelection
            | FolioError::SingleOrEmptyDocument { .. }
            | FolioError::InvalidPartCount { .. }
            | FolioError::InvalidChunkSize { .. }
            | FolioError::InvalidRotation(_)
            | FolioError::NoInputs => ErrorKind::Validation,

            FolioError::CorruptSource(_) => ErrorKind::CorruptSource,
            FolioError::ExternalToolUnavailable(_) => ErrorKind::ExternalToolUnavailable,
            FolioError::CompressionFailed(_) => ErrorKind::CompressionFailed,
            FolioError::PartialWrite(_) | FolioError::PdfError(_) => {
                ErrorKind::PartialWriteFailure
            }

            FolioError::Archive(_) | FolioError::Io(_) | FolioError::Serialization(_) => {
                ErrorKind::Io
            }
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
