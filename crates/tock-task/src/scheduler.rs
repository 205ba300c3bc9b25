//! Synchronous task execution with a parallel barrier.

use tock_core::error::{TaskError, TaskFailure};

use crate::pool::{self, PoolError, WorkerPool};
use crate::task::Task;

/// Executes [`Task`] trees.
///
/// Owns the process-wide [`WorkerPool`]; its size is fixed here and bounds
/// how many parallel children can run at once. `execute` never returns
/// while any part of the task is still running.
#[derive(Debug)]
pub struct TaskScheduler {
    pool: WorkerPool,
}

impl TaskScheduler {
    /// Create a scheduler with `worker_count` pool threads.
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        Ok(Self {
            pool: WorkerPool::new(worker_count)?,
        })
    }

    /// Number of pool threads.
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Run `task` to completion.
    ///
    /// - Leaf: runs on the calling thread.
    /// - Sequential: children in order on the calling thread; the first
    ///   failure aborts the rest of the group.
    /// - Parallel: every child is sent to the pool and the caller blocks
    ///   until all have reported. Failures do not cancel siblings; they are
    ///   aggregated into one [`TaskError`] after the barrier.
    pub fn execute(&self, task: Task) -> Result<(), TaskError> {
        match task {
            Task::Leaf(leaf) => leaf.run(),
            Task::Sequential(children) => {
                for child in children.into_vec() {
                    self.execute(child)?;
                }
                Ok(())
            }
            Task::Parallel(children) => self.execute_parallel(children.into_vec()),
        }
    }

    fn execute_parallel(&self, children: Vec<Task>) -> Result<(), TaskError> {
        if children.is_empty() {
            return Ok(());
        }
        // A worker waiting on its own pool could starve it; run nested
        // groups inline instead.
        if pool::on_worker_thread() {
            return Task::Parallel(children.into_boxed_slice()).run_inline();
        }

        let expected = children.len();
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(expected);
        for child in children {
            let reply = reply_tx.clone();
            let job: pool::Job = Box::new(move || {
                // Best-effort reply: the receiver outlives every job.
                let _ = reply.send(child.run_inline());
            });
            if let Err(job) = self.pool.submit(job) {
                job();
            }
        }
        drop(reply_tx);

        let mut errors = Vec::new();
        for _ in 0..expected {
            match reply_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(_) => {
                    errors.push(TaskError::single(TaskFailure::Panicked {
                        task: "parallel".to_owned(),
                        message: "worker exited before reporting".to_owned(),
                    }));
                    break;
                }
            }
        }
        match TaskError::aggregate(errors) {
            Some(err) => {
                tracing::debug!(children = expected, failures = err.len(), "parallel group failed");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Stop the pool, joining its workers. Later parallel groups run on
    /// the calling thread. Returns the number of workers joined.
    pub fn shutdown(&self) -> usize {
        self.pool.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    #[test]
    fn empty_parallel_returns_immediately() {
        let scheduler = TaskScheduler::new(2).unwrap();
        assert!(scheduler.execute(Task::parallel([])).is_ok());
    }

    #[test]
    fn parallel_children_really_overlap() {
        // Four children meet at a std barrier; this only completes if all
        // four are running at the same time.
        let scheduler = TaskScheduler::new(4).unwrap();
        let barrier = Arc::new(Barrier::new(4));
        let children = (0..4).map(|i| {
            let barrier = Arc::clone(&barrier);
            Task::leaf(format!("meet-{i}"), move || {
                barrier.wait();
                Ok(())
            })
        });
        assert!(scheduler.execute(Task::parallel(children)).is_ok());
    }

    #[test]
    fn failure_does_not_cancel_siblings() {
        let scheduler = TaskScheduler::new(3).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let mut children = vec![Task::leaf("bad", || Err("nope".into()))];
        for _ in 0..10 {
            let done = Arc::clone(&done);
            children.push(Task::leaf("good", move || {
                std::thread::sleep(std::time::Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        let err = scheduler.execute(Task::parallel(children)).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.failures()[0].task(), "bad");
        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn nested_parallel_inside_parallel_does_not_deadlock() {
        let scheduler = TaskScheduler::new(1).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let leaf = |count: &Arc<AtomicUsize>| {
            let count = Arc::clone(count);
            Task::leaf("inc", move || {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        let task = Task::parallel([
            Task::parallel([leaf(&count), leaf(&count)]),
            Task::parallel([leaf(&count), leaf(&count)]),
        ]);
        assert!(scheduler.execute(task).is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn parallel_after_shutdown_runs_on_caller() {
        let scheduler = TaskScheduler::new(2).unwrap();
        assert_eq!(scheduler.shutdown(), 2);
        let count = Arc::new(AtomicUsize::new(0));
        let children = (0..5).map(|_| {
            let count = Arc::clone(&count);
            Task::leaf("inc", move || {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        assert!(scheduler.execute(Task::parallel(children)).is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }
}
