use crate::{accelerate::Accelerator, parallel::ExecutionStrategy};

/// Receives progress reports from long running filters.
///
/// `offset` counts the completed units of work (rows for most filters,
/// channels for despeckle) out of `extent`. Returning `false` cancels the
/// operation. Reports are serialized, so an implementation may keep state
/// behind a lock without contention between reports of one call.
pub trait ProgressMonitor: Send + Sync {
    /// Report progress of the operation named `tag`.
    fn progress(&self, tag: &str, offset: u64, extent: u64) -> bool;
}

impl<F> ProgressMonitor for F
where
    F: Fn(&str, u64, u64) -> bool + Send + Sync,
{
    fn progress(&self, tag: &str, offset: u64, extent: u64) -> bool {
        self(tag, offset, extent)
    }
}

/// How a filter call runs: scheduling, progress reporting, acceleration and
/// the seed of its random generators.
///
/// # Example
///
/// ```
/// use stipple_imgproc::{context::ExecutionContext, parallel::ExecutionStrategy};
///
/// let monitor = |_tag: &str, done: u64, total: u64| done <= total;
/// let ctx = ExecutionContext::default()
///     .with_strategy(ExecutionStrategy::Fixed(2))
///     .with_monitor(&monitor)
///     .with_seed(7);
///
/// assert_eq!(ctx.seed(), 7);
/// assert!(ctx.report("Example", 1, 4));
/// ```
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    strategy: ExecutionStrategy,
    monitor: Option<&'a dyn ProgressMonitor>,
    accelerator: Option<&'a dyn Accelerator>,
    seed: u64,
}

impl<'a> ExecutionContext<'a> {
    /// A parallel context without monitor or accelerator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scheduling strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the progress monitor.
    pub fn with_monitor(mut self, monitor: &'a dyn ProgressMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Set the accelerator tried before the reference implementation.
    pub fn with_accelerator(mut self, accelerator: &'a dyn Accelerator) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    /// Set the seed of the random generators.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// A copy of the context that reports no progress.
    ///
    /// Used for the internal stages of a filter that reports its own progress.
    pub fn without_monitor(&self) -> Self {
        Self {
            monitor: None,
            ..*self
        }
    }

    /// A copy of the context that never accelerates.
    pub fn without_accelerator(&self) -> Self {
        Self {
            accelerator: None,
            ..*self
        }
    }

    /// The scheduling strategy.
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// The progress monitor, if any.
    pub fn monitor(&self) -> Option<&'a dyn ProgressMonitor> {
        self.monitor
    }

    /// The accelerator, if any.
    pub fn accelerator(&self) -> Option<&'a dyn Accelerator> {
        self.accelerator
    }

    /// The seed of the random generators.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Report progress to the monitor; `true` when there is none.
    pub fn report(&self, tag: &str, offset: u64, extent: u64) -> bool {
        self.monitor
            .map_or(true, |monitor| monitor.progress(tag, offset, extent))
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("strategy", &self.strategy)
            .field("monitor", &self.monitor.is_some())
            .field("accelerator", &self.accelerator.is_some())
            .field("seed", &self.seed)
            .finish()
    }
}
