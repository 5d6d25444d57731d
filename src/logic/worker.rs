// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Background compression pool so callers never block their event loop.
//!
//! Jobs go in through one channel and outcomes come back through another,
//! tagged with the [`Ticket`] handed out at submission. There is no
//! cancellation: a caller that picked a newer file for the same slot simply
//! ignores outcomes carrying an older ticket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, RecvError, Sender, TryRecvError};
use tracing::debug;

use crate::logic::compress::{CompressError, Compressed, CompressionOptions, compress_image};
use crate::models::upload::{FileRole, UploadFile};

/// Monotonic identifier of a submitted job.
pub type Ticket = u64;

/// Work item: compress `file` for `role` with `options`.
#[derive(Clone, Debug)]
pub struct CompressJob {
    pub role: FileRole,
    pub file: UploadFile,
    pub options: CompressionOptions,
}

/// Result of a job, tagged with its ticket.
#[derive(Debug)]
pub struct CompressOutcome {
    pub ticket: Ticket,
    pub role: FileRole,
    pub result: Result<Compressed, CompressError>,
}

/// Pool of worker threads fed through crossbeam channels.
pub struct CompressionWorker {
    job_tx: Sender<(Ticket, CompressJob)>,
    outcome_rx: Receiver<CompressOutcome>,
    next_ticket: AtomicU64,
}

impl CompressionWorker {
    /// Start `threads` workers (at least one).
    pub fn spawn(threads: usize) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(Ticket, CompressJob)>();
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<CompressOutcome>();

        for _ in 0..threads.max(1) {
            let job_rx = job_rx.clone();
            let outcome_tx = outcome_tx.clone();
            thread::spawn(move || {
                for (ticket, job) in job_rx.iter() {
                    debug!(ticket, role = job.role.field_name(), "compression job started");
                    let result = compress_image(&job.file, &job.options);
                    let _ = outcome_tx.send(CompressOutcome {
                        ticket,
                        role: job.role,
                        result,
                    });
                }
            });
        }

        Self {
            job_tx,
            outcome_rx,
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Sized to the machine's parallelism, minimum two threads.
    pub fn with_default_threads() -> Self {
        let threads = thread::available_parallelism()
            .map(|n| n.get().max(2))
            .unwrap_or(2);
        Self::spawn(threads)
    }

    /// Queue a job and return its ticket.
    pub fn submit(&self, job: CompressJob) -> Ticket {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        // Workers only stop when `job_tx` is dropped, so the receiver is alive here.
        let _ = self.job_tx.send((ticket, job));
        ticket
    }

    /// Next finished outcome without blocking.
    pub fn try_recv(&self) -> Result<CompressOutcome, TryRecvError> {
        self.outcome_rx.try_recv()
    }

    /// Block until the next outcome arrives.
    pub fn recv(&self) -> Result<CompressOutcome, RecvError> {
        self.outcome_rx.recv()
    }
}
