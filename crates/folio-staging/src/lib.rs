// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-staging — Lifecycle of every file Folio writes to disk.
//
// Uploads and generated artifacts live under a managed root with two
// directories (`uploads/`, `processed/`). A request tracks what it creates in
// a `CleanupGuard`, hands delivered artifacts to the `CleanupScheduler` for
// deletion after a grace delay, and the `Sweeper` removes anything older than
// the retention threshold on a fixed interval.

pub mod guard;
pub mod scheduler;
pub mod staging;
pub mod sweep;

pub use guard::{CleanupGuard, Removal, remove_file};
pub use scheduler::CleanupScheduler;
pub use staging::StagingArea;
pub use sweep::{SweepReport, Sweeper, SweeperHandle, sweep_once};
