// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output verification — the gate an optimizer result must pass before it
// replaces the structural fallback.

use std::path::Path;

use lopdf::Document;
use thiserror::Error;

/// How far into the file the `%PDF` marker may appear.
pub const SIGNATURE_WINDOW: usize = 1024;

/// Why a candidate output was rejected.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("output unreadable: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("output is empty")]
    Empty,

    #[error("no %PDF signature near the start of the file")]
    MissingSignature,

    #[error("output does not parse: {0}")]
    Unparseable(String),
}

/// Check that `path` holds a non-empty, signed, parseable PDF. Returns its
/// size in bytes.
pub fn verify_output(path: &Path) -> Result<u64, Rejection> {
    let bytes = std::fs::read(path)?;
    verify_bytes(&bytes)?;
    Ok(bytes.len() as u64)
}

pub fn verify_bytes(bytes: &[u8]) -> Result<(), Rejection> {
    if bytes.is_empty() {
        return Err(Rejection::Empty);
    }
    let head = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    if !head.windows(4).any(|window| window == b"%PDF") {
        return Err(Rejection::MissingSignature);
    }
    Document::load_mem(bytes).map_err(|err| Rejection::Unparseable(err.to_string()))?;
    Ok(())
}
