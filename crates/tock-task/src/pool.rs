//! Fixed-size worker pool for parallel task children.
//!
//! Each worker receives boxed jobs over a shared unbounded crossbeam
//! channel and runs them until the channel is closed. Jobs report their
//! own results (the scheduler hands every job a reply sender), so the pool
//! itself is fire-and-forget. A saturated pool only queues; it never
//! rejects work while running.

use std::cell::Cell;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::task::panic_message;

/// A unit of work shipped to a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is a pool worker.
pub fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

// ── PoolError ──────────────────────────────────────────────────────

/// Errors constructing a [`WorkerPool`].
#[derive(Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was asked for zero workers.
    NoWorkers,
    /// A worker thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorkers => write!(f, "worker pool needs at least one worker"),
            Self::ThreadSpawnFailed { reason } => write!(f, "worker spawn failed: {reason}"),
        }
    }
}

impl Error for PoolError {}

// ── WorkerPool ─────────────────────────────────────────────────────

/// A fixed number of named worker threads sharing one job queue.
pub struct WorkerPool {
    job_tx: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers named `tock-worker-{i}`.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::NoWorkers);
        }
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let job_rx = job_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("tock-worker-{i}"))
                .spawn(move || worker_loop(job_rx))
                .map_err(|e| PoolError::ThreadSpawnFailed {
                    reason: format!("tock-worker-{i}: {e}"),
                })?;
            workers.push(handle);
        }
        tracing::debug!(workers = size, "worker pool started");
        Ok(Self {
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            size,
        })
    }

    /// Number of workers the pool was built with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue a job. Hands the job back if the pool has been shut down so
    /// the caller can run it itself.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        let guard = lock(&self.job_tx);
        match guard.as_ref() {
            Some(tx) => tx.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        }
    }

    /// Close the job queue and join every worker. Jobs already queued are
    /// still run. Returns the number of workers joined; later calls
    /// return 0.
    pub fn shutdown(&self) -> usize {
        lock(&self.job_tx).take();
        let handles: Vec<_> = lock(&self.workers).drain(..).collect();
        let me = thread::current().id();
        let joined = handles
            .into_iter()
            .filter(|h| h.thread().id() != me)
            .map(JoinHandle::join)
            .filter(Result::is_ok)
            .count();
        if joined > 0 {
            tracing::debug!(joined, "worker pool stopped");
        }
        joined
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool").field("size", &self.size).finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn worker_loop(job_rx: Receiver<Job>) {
    ON_WORKER.with(|w| w.set(true));
    while let Ok(job) = job_rx.recv() {
        // Jobs catch their own leaf panics; this keeps the worker alive if
        // anything outside a leaf unwinds.
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(
                panic = %panic_message(payload.as_ref()),
                "job panicked outside a leaf"
            );
        }
    }
    // Channel closed: worker exits cleanly.
}
