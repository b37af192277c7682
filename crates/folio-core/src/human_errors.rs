// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User-facing error reports.
//
// Every failure is rendered as a structured report carrying the error kind
// and a readable message. In production mode the internal detail (tool
// paths, parser messages) is dropped and only the generic message remains.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, FolioError};

/// A structured error as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    /// Plain summary safe to show in any mode.
    pub message: String,
    /// Internal detail; always `None` in production mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Render `err` for a caller. `production` suppresses the detail field.
pub fn report_error(err: &FolioError, production: bool) -> ErrorReport {
    let kind = err.kind();
    let message = match err {
        // Validation messages only echo caller input, so they are shown as-is.
        FolioError::EmptySelection
        | FolioError::SingleOrEmptyDocument { .. }
        | FolioError::InvalidPartCount { .. }
        | FolioError::InvalidChunkSize { .. }
        | FolioError::InvalidRotation(_)
        | FolioError::InvalidRange(_)
        | FolioError::NoInputs => err.to_string(),
        _ => generic_message(kind).to_string(),
    };

    ErrorReport {
        kind,
        message,
        detail: (!production).then(|| err.to_string()),
    }
}

/// The generic text for each error kind.
pub fn generic_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "The request parameters are not valid.",
        ErrorKind::CorruptSource => "The uploaded file is not a valid PDF.",
        ErrorKind::ExternalToolUnavailable => "The PDF optimizer is not available.",
        ErrorKind::CompressionFailed => "Failed to compress PDF.",
        ErrorKind::PartialWriteFailure => "Failed to process PDF.",
        ErrorKind::Io => "Something went wrong.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_hides_detail() {
        let err = FolioError::CompressionFailed("/usr/bin/gs exited with 1".into());
        let report = report_error(&err, true);
        assert_eq!(report.kind, ErrorKind::CompressionFailed);
        assert_eq!(report.message, "Failed to compress PDF.");
        assert!(report.detail.is_none());
    }

    #[test]
    fn development_keeps_detail() {
        let err = FolioError::CorruptSource("invalid file header".into());
        let report = report_error(&err, false);
        assert_eq!(report.kind, ErrorKind::CorruptSource);
        assert_eq!(
            report.detail.as_deref(),
            Some("not a valid PDF document: invalid file header")
        );
    }

    #[test]
    fn validation_message_survives_production() {
        let report = report_error(&FolioError::SingleOrEmptyDocument { pages: 1 }, true);
        assert_eq!(report.kind, ErrorKind::Validation);
        assert_eq!(report.message, "cannot split a document with 1 page(s)");
    }

    #[test]
    fn serialized_report_omits_missing_detail() {
        let report = report_error(&FolioError::EmptySelection, true);
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"validation","message":"no valid pages selected"}"#
        );
    }
}
