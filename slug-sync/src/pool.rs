//! Bounded worker pool with a completion barrier and cooperative cancellation.
//!
//! Items are submitted through an unbounded queue and drained by `jobs` OS
//! threads. [`WorkerPool::finish`] closes the queue and blocks until every
//! worker has exited. Once the [`CancelToken`] is set, workers complete the
//! item they are running and drop the rest of the queue unprocessed.
//! A job that panics is counted and its worker moves on to the next item.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared "stop dispatching" flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The raw flag, for registration with a signal handler.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Result of draining a pool.
#[derive(Debug)]
pub struct PoolReport<R> {
    /// One entry per processed item, in completion order.
    pub results: Vec<R>,
    /// Items that were queued but never started because of cancellation.
    pub dropped: usize,
    /// Items whose job panicked. They produce no result.
    pub panicked: usize,
    pub cancelled: bool,
}

/// A fixed set of worker threads applying one job function to queued items.
pub struct WorkerPool<T, R> {
    input: Sender<T>,
    results: Receiver<R>,
    workers: Vec<JoinHandle<WorkerTally>>,
    cancel: CancelToken,
    submitted: usize,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Start `jobs` workers (at least one) running `job` on each item.
    pub fn spawn<F>(name: &str, jobs: usize, cancel: CancelToken, job: F) -> Result<Self, SyncError>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let (input, queue) = channel::unbounded::<T>();
        let (result_tx, results) = channel::unbounded::<R>();
        let job = Arc::new(job);

        let jobs = jobs.max(1);
        let mut workers = Vec::with_capacity(jobs);
        for id in 0..jobs {
            let queue = queue.clone();
            let result_tx = result_tx.clone();
            let job = Arc::clone(&job);
            let cancel = cancel.clone();
            let handle = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || worker_loop(queue, result_tx, job.as_ref(), &cancel))
                .map_err(SyncError::Worker)?;
            workers.push(handle);
        }
        tracing::debug!(pool = name, workers = jobs, "worker pool started");

        Ok(Self {
            input,
            results,
            workers,
            cancel,
            submitted: 0,
        })
    }

    /// Queue one item. Never blocks.
    pub fn submit(&mut self, item: T) {
        // Receivers live as long as the workers, which live until `finish`.
        if self.input.send(item).is_ok() {
            self.submitted += 1;
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Close the queue and wait for every worker. This is the barrier.
    pub fn finish(self) -> PoolReport<R> {
        let Self {
            input,
            results,
            workers,
            cancel,
            ..
        } = self;
        drop(input);

        let mut dropped = 0;
        let mut panicked = 0;
        for worker in workers {
            match worker.join() {
                Ok(tally) => {
                    dropped += tally.dropped;
                    panicked += tally.panicked;
                }
                Err(_) => {
                    tracing::error!("worker thread panicked");
                    panicked += 1;
                }
            }
        }

        PoolReport {
            results: results.try_iter().collect(),
            dropped,
            panicked,
            cancelled: cancel.is_cancelled(),
        }
    }
}

/// Per-worker counts returned through the join handle.
#[derive(Debug, Default)]
struct WorkerTally {
    dropped: usize,
    panicked: usize,
}

fn worker_loop<T, R>(
    queue: Receiver<T>,
    results: Sender<R>,
    job: &(dyn Fn(T) -> R + Send + Sync),
    cancel: &CancelToken,
) -> WorkerTally {
    let mut tally = WorkerTally::default();
    for item in queue.iter() {
        if cancel.is_cancelled() {
            tally.dropped += 1;
            continue;
        }
        let result = match panic::catch_unwind(AssertUnwindSafe(|| job(item))) {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("job panicked");
                tally.panicked += 1;
                continue;
            }
        };
        if results.send(result).is_err() {
            break;
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn every_item_processed_exactly_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_job = Arc::clone(&seen);
        let mut pool = WorkerPool::spawn("test", 4, CancelToken::new(), move |n: usize| {
            seen_in_job.lock().unwrap().push(n);
            n * 2
        })
        .expect("spawn");
        for n in 0..100 {
            pool.submit(n);
        }
        assert_eq!(pool.submitted(), 100);
        let report = pool.finish();

        assert_eq!(report.results.len(), 100);
        assert_eq!(report.dropped, 0);
        assert!(!report.cancelled);
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn zero_jobs_still_runs_one_worker() {
        let mut pool = WorkerPool::spawn("test", 0, CancelToken::new(), |n: u8| n).expect("spawn");
        pool.submit(7);
        assert_eq!(pool.finish().results, vec![7]);
    }

    #[test]
    fn finish_with_no_items_returns_immediately() {
        let pool: WorkerPool<u8, u8> =
            WorkerPool::spawn("test", 3, CancelToken::new(), |n| n).expect("spawn");
        let report = pool.finish();
        assert!(report.results.is_empty());
    }

    #[test]
    fn cancel_drops_unstarted_items_but_finishes_running_one() {
        let cancel = CancelToken::new();
        let started = Arc::new(AtomicUsize::new(0));
        let started_in_job = Arc::clone(&started);
        let cancel_in_job = cancel.clone();
        let mut pool = WorkerPool::spawn("test", 1, cancel.clone(), move |n: usize| {
            started_in_job.fetch_add(1, Ordering::SeqCst);
            // The first item raises the interrupt while it is "in flight".
            if n == 0 {
                cancel_in_job.cancel();
                thread::sleep(Duration::from_millis(20));
            }
            n
        })
        .expect("spawn");
        for n in 0..10 {
            pool.submit(n);
        }
        let report = pool.finish();

        assert!(report.cancelled);
        assert_eq!(report.results, vec![0], "in-flight item completes");
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(report.dropped, 9);
    }

    #[test]
    fn panicking_job_is_counted() {
        let mut pool = WorkerPool::spawn("test", 1, CancelToken::new(), |n: u8| {
            if n == 1 {
                panic!("boom");
            }
            n
        })
        .expect("spawn");
        pool.submit(1);
        let report = pool.finish();
        assert_eq!(report.panicked, 1);
        assert!(report.results.is_empty());
    }

    #[test]
    fn worker_keeps_draining_after_a_panic() {
        let mut pool = WorkerPool::spawn("test", 1, CancelToken::new(), |n: u8| {
            if n == 2 {
                panic!("boom");
            }
            n
        })
        .expect("spawn");
        for n in 1..=4 {
            pool.submit(n);
        }
        let report = pool.finish();
        assert_eq!(report.panicked, 1);
        assert_eq!(report.results, vec![1, 3, 4]);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn token_clones_share_state() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
        assert!(a.flag().load(Ordering::SeqCst));
    }
}
