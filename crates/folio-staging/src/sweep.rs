// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retention sweep — the backstop that removes anything left in the staging
// directories longer than the retention threshold.
//
// The sweep runs on its own interval, independent of request traffic, and is
// started and stopped explicitly by the owning service.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::guard::{Removal, remove_file};

/// Counters from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Regular files examined.
    pub scanned: usize,
    pub removed: usize,
    /// Files that disappeared between the scan and the delete.
    pub already_gone: usize,
    /// Files younger than the threshold.
    pub retained: usize,
    pub failed: usize,
}

/// Remove every regular file in `dirs` whose modification time is more than
/// `retention` before `now`.
///
/// Missing directories are skipped. A file modified after `now` is treated as
/// brand new.
#[instrument(skip(dirs), fields(dir_count = dirs.len()))]
pub fn sweep_once(dirs: &[PathBuf], retention: Duration, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();

    for dir in dirs {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "cannot scan directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    report.already_gone += 1;
                    continue;
                }
                Err(err) => {
                    warn!(path = %entry.path().display(), %err, "cannot stat file");
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            report.scanned += 1;

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);
            if age <= retention {
                report.retained += 1;
                continue;
            }

            match remove_file(&entry.path()) {
                Removal::Removed => report.removed += 1,
                Removal::AlreadyGone => report.already_gone += 1,
                Removal::Failed => report.failed += 1,
            }
        }
    }

    debug!(?report, "sweep pass finished");
    report
}

/// Periodic sweep configuration.
#[derive(Debug, Clone)]
pub struct Sweeper {
    dirs: Vec<PathBuf>,
    retention: Duration,
    interval: Duration,
}

impl Sweeper {
    pub fn new(dirs: Vec<PathBuf>, retention: Duration, interval: Duration) -> Self {
        Self {
            dirs,
            retention,
            interval,
        }
    }

    /// Spawn the interval task. The first pass runs one interval after
    /// start. Must be called inside a tokio runtime.
    pub fn start(self) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (report_tx, report_rx) = watch::channel(SweepReport::default());
        let Sweeper {
            dirs,
            retention,
            interval,
        } = self;

        info!(
            retention_secs = retention.as_secs(),
            interval_secs = interval.as_secs(),
            "sweeper started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut passes = 0u64;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let dirs = dirs.clone();
                        let pass = tokio::task::spawn_blocking(move || {
                            sweep_once(&dirs, retention, SystemTime::now())
                        });
                        match pass.await {
                            Ok(report) => {
                                passes += 1;
                                if report.removed > 0 || report.failed > 0 {
                                    info!(removed = report.removed, failed = report.failed, "stale files swept");
                                }
                                report_tx.send_replace(report);
                            }
                            Err(err) => warn!(%err, "sweep pass panicked"),
                        }
                    }
                }
            }
            passes
        });

        SweeperHandle {
            stop: Some(stop_tx),
            reports: report_rx,
            task,
        }
    }
}

/// Running sweeper. Dropping the handle also stops the task.
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    reports: watch::Receiver<SweepReport>,
    task: JoinHandle<u64>,
}

impl SweeperHandle {
    /// Report of the most recent completed pass.
    pub fn last_report(&self) -> SweepReport {
        *self.reports.borrow()
    }

    /// Receiver notified after every pass.
    pub fn reports(&self) -> watch::Receiver<SweepReport> {
        self.reports.clone()
    }

    /// Stop the task and return how many passes it completed.
    pub async fn stop(mut self) -> u64 {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match (&mut self.task).await {
            Ok(passes) => {
                info!(passes, "sweeper stopped");
                passes
            }
            Err(err) => {
                warn!(%err, "sweeper task ended abnormally");
                0
            }
        }
    }
}
