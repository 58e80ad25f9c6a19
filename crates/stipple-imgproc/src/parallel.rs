use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

use rayon::prelude::*;
use thiserror::Error;

use crate::{context::ExecutionContext, error::FilterError};

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// Controls how the rows of a filter are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool to process rows in parallel.
    #[default]
    ParallelRows,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    /// Use this primarily for benchmarking or specific isolation needs.
    Fixed(usize),
}

/// State shared by the workers of one call.
struct RowControl<'a> {
    ctx: &'a ExecutionContext<'a>,
    tag: &'static str,
    rows: u64,
    stop: AtomicBool,
    failure: Mutex<Option<FilterError>>,
    completed: Mutex<u64>,
}

impl RowControl<'_> {
    fn fail(&self, err: FilterError) {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        // keep the first failure, later rows only stop
        if failure.is_none() {
            *failure = Some(err);
        }
        self.stop.store(true, Ordering::Release);
    }

    fn row_done(&self) {
        let Some(monitor) = self.ctx.monitor() else {
            return;
        };
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *completed += 1;
        if !monitor.progress(self.tag, *completed, self.rows) {
            drop(completed);
            self.fail(FilterError::Cancelled(self.tag));
        }
    }

    fn into_result(self) -> Result<(), FilterError> {
        match self
            .failure
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Process the rows of `dst` with `op`, following the context's strategy.
///
/// Every row of `row_len` samples is handed to exactly one worker as an
/// exclusive slice, together with its index. A failing row or a progress
/// monitor returning `false` raises a shared stop flag: rows not yet started
/// are skipped, rows in flight complete. The first failure is returned.
///
/// # Arguments
///
/// * `ctx` - The execution context (strategy and progress monitor).
/// * `tag` - The operation name reported to the progress monitor.
/// * `dst` - The destination samples, a whole number of rows.
/// * `row_len` - The number of samples per row.
/// * `op` - The function filling one row.
///
/// # Errors
///
/// * [`FilterError::RowFailed`] wrapping the error of the first failing row.
/// * [`FilterError::Cancelled`] if the monitor stopped the operation.
/// * [`FilterError::ParallelError`] if a fixed thread pool cannot be built.
///
/// # Example
///
/// ```
/// use stipple_imgproc::{context::ExecutionContext, parallel::par_rows};
///
/// let mut dst = vec![0u32; 6];
/// par_rows(&ExecutionContext::default(), "Fill", &mut dst, 2, |y, row| {
///     row.fill(y as u32);
///     Ok(())
/// })
/// .unwrap();
/// assert_eq!(dst, vec![0, 0, 1, 1, 2, 2]);
/// ```
pub fn par_rows<T, F>(
    ctx: &ExecutionContext<'_>,
    tag: &'static str,
    dst: &mut [T],
    row_len: usize,
    op: F,
) -> Result<(), FilterError>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<(), FilterError> + Send + Sync,
{
    if row_len == 0 || dst.is_empty() {
        return Ok(());
    }

    let control = RowControl {
        ctx,
        tag,
        rows: (dst.len() / row_len) as u64,
        stop: AtomicBool::new(false),
        failure: Mutex::new(None),
        completed: Mutex::new(0),
    };

    let run_row = |(y, row): (usize, &mut [T])| {
        if control.stop.load(Ordering::Acquire) {
            return;
        }
        match op(y, row) {
            Ok(()) => control.row_done(),
            Err(err) => control.fail(FilterError::RowFailed {
                row: y,
                source: Box::new(err),
            }),
        }
    };

    match ctx.strategy() {
        ExecutionStrategy::Serial => {
            dst.chunks_exact_mut(row_len).enumerate().for_each(run_row);
        }
        ExecutionStrategy::ParallelRows => {
            dst.par_chunks_exact_mut(row_len)
                .enumerate()
                .for_each(run_row);
        }
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n).into());
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            pool.install(|| {
                dst.par_chunks_exact_mut(row_len)
                    .enumerate()
                    .for_each(run_row);
            });
        }
    }

    control.into_result()
}
