//! # Worker Pool
//!
//! A bounded fan-out over scoped threads. Workers claim items through an
//! atomic cursor, so uneven per-item latency (slow loads) balances itself.
//!
//! Results keep input order. An item whose closure panics yields `None`
//! and is logged; the rest of the batch completes.

use crate::primitives::MAX_WORKERS;
use crate::RefgraphError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::error;

/// Fixed-size pool for embarrassingly parallel batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// A pool with `workers` threads, capped at [`MAX_WORKERS`].
    ///
    /// Zero workers is rejected.
    pub fn new(workers: usize) -> Result<Self, RefgraphError> {
        if workers == 0 {
            return Err(RefgraphError::InvalidArgument(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        Ok(Self {
            workers: workers.min(MAX_WORKERS),
        })
    }

    /// Pool sized to the machine, clamped to `1..=MAX_WORKERS`.
    #[must_use]
    pub fn with_available_parallelism() -> Self {
        Self {
            workers: default_workers(),
        }
    }

    /// Single-threaded pool; batches run on the calling thread.
    #[must_use]
    pub fn serial() -> Self {
        Self { workers: 1 }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item, in parallel, keeping input order.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<Option<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let run = |item: &T| match catch_unwind(AssertUnwindSafe(|| f(item))) {
            Ok(result) => Some(result),
            Err(_) => {
                error!("worker task panicked, item skipped");
                None
            }
        };

        let workers = self.workers.min(items.len());
        if workers <= 1 {
            return items.iter().map(run).collect();
        }

        let next = AtomicUsize::new(0);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let next = &next;
                    let run = &run;
                    s.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let idx = next.fetch_add(1, Ordering::Relaxed);
                            let Some(item) = items.get(idx) else {
                                break;
                            };
                            done.push((idx, run(item)));
                        }
                        done
                    })
                })
                .collect();

            let mut slots: Vec<Option<R>> = Vec::with_capacity(items.len());
            slots.resize_with(items.len(), || None);
            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (idx, result) in done {
                            slots[idx] = result;
                        }
                    }
                    Err(_) => error!("worker thread died"),
                }
            }
            slots
        })
    }

    /// Run `f` on every item for its side effects.
    pub fn for_each<T, F>(&self, items: &[T], f: F)
    where
        T: Sync,
        F: Fn(&T) + Sync,
    {
        self.map(items, f);
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Available parallelism clamped to `1..=MAX_WORKERS`.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
        .clamp(1, MAX_WORKERS)
}
