// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deferred cleanup — a delay queue that deletes delivered artifacts once their
// grace period has elapsed.
//
// A single background task owns a min-heap of (deadline, path) entries and
// sleeps until the earliest deadline. All timing goes through `tokio::time`,
// so tests drive it with a paused clock.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::guard::{Removal, remove_file};

enum Command {
    Schedule { path: PathBuf, due: Instant },
    Pending(oneshot::Sender<usize>),
    Shutdown(oneshot::Sender<usize>),
}

/// Handle to the deferred-deletion task. Cheap to share behind an `Arc`.
pub struct CleanupScheduler {
    tx: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CleanupScheduler {
    /// Spawn the background task. Must be called inside a tokio runtime.
    pub fn start() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx));
        info!("cleanup scheduler started");
        Self {
            tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Delete `path` once `delay` has elapsed.
    ///
    /// If the scheduler has already shut down the file is deleted right away
    /// rather than leaked.
    pub fn schedule(&self, path: PathBuf, delay: Duration) {
        let due = Instant::now() + delay;
        if let Err(mpsc::error::SendError(cmd)) = self.tx.send(Command::Schedule { path, due })
            && let Command::Schedule { path, .. } = cmd
        {
            warn!(path = %path.display(), "scheduler stopped, removing immediately");
            remove_file(&path);
        }
    }

    /// Release `path`: delete now when `after` is `None`, otherwise after the
    /// given delay.
    pub fn release(&self, path: PathBuf, after: Option<Duration>) {
        match after {
            Some(delay) if !delay.is_zero() => self.schedule(path, delay),
            _ => {
                remove_file(&path);
            }
        }
    }

    /// Number of deletions still waiting for their deadline.
    pub async fn pending(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Pending(reply)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Stop the task, deleting every pending file immediately. Returns how
    /// many entries were flushed. Later calls return 0.
    pub async fn shutdown(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(reply)).is_err() {
            return 0;
        }
        let flushed = rx.await.unwrap_or(0);

        let task = self.task.lock().ok().and_then(|mut slot| slot.take());
        if let Some(task) = task
            && let Err(err) = task.await
        {
            warn!(%err, "cleanup scheduler task ended abnormally");
        }
        info!(flushed, "cleanup scheduler stopped");
        flushed
    }
}

type Entry = Reverse<(Instant, u64, PathBuf)>;

async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut queue: BinaryHeap<Entry> = BinaryHeap::new();
    let mut seq: u64 = 0;

    loop {
        let next_due = queue.peek().map(|Reverse((due, _, _))| *due);

        tokio::select! {
            biased;

            _ = wait_for(next_due) => {
                let now = Instant::now();
                while let Some(Reverse((due, _, _))) = queue.peek() {
                    if *due > now {
                        break;
                    }
                    if let Some(Reverse((_, _, path))) = queue.pop() {
                        reclaim(&path);
                    }
                }
            }

            cmd = rx.recv() => match cmd {
                Some(Command::Schedule { path, due }) => {
                    debug!(path = %path.display(), "deletion scheduled");
                    seq += 1;
                    queue.push(Reverse((due, seq, path)));
                }
                Some(Command::Pending(reply)) => {
                    let _ = reply.send(queue.len());
                }
                Some(Command::Shutdown(reply)) => {
                    let flushed = flush(&mut queue);
                    let _ = reply.send(flushed);
                    break;
                }
                None => {
                    flush(&mut queue);
                    break;
                }
            },
        }
    }
}

async fn wait_for(due: Option<Instant>) {
    match due {
        Some(due) => sleep_until(due).await,
        None => std::future::pending().await,
    }
}

fn flush(queue: &mut BinaryHeap<Entry>) -> usize {
    let flushed = queue.len();
    for Reverse((_, _, path)) in queue.drain() {
        reclaim(&path);
    }
    flushed
}

fn reclaim(path: &std::path::Path) {
    if remove_file(path) == Removal::AlreadyGone {
        debug!(path = %path.display(), "scheduled file already gone");
    }
}
