//! Data-parallel evaluation of one predicate over a stored collection.
//!
//! The collection is cut into contiguous chunks, one per worker. Each chunk
//! is folded sequentially and the partials are combined with an
//! associative, commutative operator (or, and, sum), so the result does not
//! depend on the number of workers or their scheduling.
//!
//! Workers run on the global rayon pool unless a dedicated pool size is
//! configured. Without the `parallel` feature every request runs on the
//! calling thread.

#[cfg(feature = "parallel")]
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::error::{PackingError, Result};

/// Combination of per-item results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reduction {
    /// Logical or: does any item pass?
    Any,
    /// Logical and: do all items pass?
    All,
    /// Sum: how many items pass?
    Count,
}

/// Fixed-size worker pool evaluating predicates over slices.
#[derive(Clone, Debug)]
pub struct BatchEvaluator {
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
    workers: usize,
}

impl BatchEvaluator {
    /// Create an evaluator with a dedicated pool of `threads` workers, or
    /// on the global pool when `threads` is `None`.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        if threads == Some(0) {
            return Err(PackingError::invalid_config("threads must be positive"));
        }
        #[cfg(feature = "parallel")]
        {
            let pool = match threads {
                Some(n) => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(n)
                        .thread_name(|i| format!("packfit-worker-{}", i))
                        .build()
                        .map_err(|e| PackingError::ThreadPool(e.to_string()))?;
                    debug!(threads = n, "dedicated worker pool started");
                    Some(Arc::new(pool))
                }
                None => None,
            };
            let workers = pool
                .as_ref()
                .map_or_else(rayon::current_num_threads, |p| p.current_num_threads());
            Ok(Self { pool, workers })
        }
        #[cfg(not(feature = "parallel"))]
        {
            let workers = threads.unwrap_or(1);
            debug!(workers, "parallel feature disabled, evaluating sequentially");
            Ok(Self { workers })
        }
    }

    /// Number of workers a parallel evaluation fans out to.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Evaluate `pred` over `items` and combine with `reduction`.
    ///
    /// Returns the count of passing items for [`Reduction::Count`], and
    /// `1`/`0` for the boolean reductions.
    pub(crate) fn evaluate<T, F>(
        &self,
        items: &[T],
        reduction: Reduction,
        parallel: bool,
        pred: F,
    ) -> usize
    where
        T: Sync,
        F: Fn(&T) -> bool + Sync,
    {
        match reduction {
            Reduction::Any => usize::from(self.any(items, parallel, pred)),
            Reduction::All => usize::from(self.all(items, parallel, pred)),
            Reduction::Count => self.count(items, parallel, pred),
        }
    }

    /// True iff some item passes.
    #[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
    pub fn any<T, F>(&self, items: &[T], parallel: bool, pred: F) -> bool
    where
        T: Sync,
        F: Fn(&T) -> bool + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            if parallel {
                let chunk = self.chunk_len(items.len());
                return self.install(|| items.par_chunks(chunk).any(|c| c.iter().any(&pred)));
            }
        }
        items.iter().any(pred)
    }

    /// True iff every item passes.
    #[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
    pub fn all<T, F>(&self, items: &[T], parallel: bool, pred: F) -> bool
    where
        T: Sync,
        F: Fn(&T) -> bool + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            if parallel {
                let chunk = self.chunk_len(items.len());
                return self.install(|| items.par_chunks(chunk).all(|c| c.iter().all(&pred)));
            }
        }
        items.iter().all(pred)
    }

    /// Number of items that pass.
    #[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
    pub fn count<T, F>(&self, items: &[T], parallel: bool, pred: F) -> usize
    where
        T: Sync,
        F: Fn(&T) -> bool + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            if parallel {
                let chunk = self.chunk_len(items.len());
                return self.install(|| {
                    items
                        .par_chunks(chunk)
                        .map(|c| c.iter().filter(|&item| pred(item)).count())
                        .sum()
                });
            }
        }
        items.iter().filter(|&item| pred(item)).count()
    }

    /// Contiguous slice length giving each worker one chunk.
    #[cfg(feature = "parallel")]
    fn chunk_len(&self, len: usize) -> usize {
        len.div_ceil(self.workers.max(1)).max(1)
    }

    #[cfg(feature = "parallel")]
    fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
