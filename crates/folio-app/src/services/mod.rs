// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command-line front end to the folio backend
// crates.
//
// Each service wraps one or more backend crate APIs behind async methods that
// take staged paths and return data the caller can deliver directly.

pub mod data_dir;
pub mod pdf_service;

#[cfg(test)]
pub(crate) mod fixtures;
