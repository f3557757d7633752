use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::{
    config::{ResourceLimits, RunnerConfig},
    CoderunnerError, CoderunnerResult,
};

use super::{validate_request, ExecutionRequest, ExecutionResult, IsolatedRunner};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Admits runs into a bounded pool of execution slots.
///
/// At most `max_concurrent` containers run at once. Up to `max_queued` further runs wait for a
/// slot; anything beyond that is turned away with [`CoderunnerError::CapacityExhausted`] instead
/// of piling up.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    runner: IsolatedRunner,
    slots: Arc<Semaphore>,
    capacity: usize,
    max_queued: usize,
    queued: AtomicUsize,
    completed: AtomicU64,
    rejected: AtomicU64,
}

/// A snapshot of the dispatcher's load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStats {
    /// Runs holding a slot.
    pub running: usize,

    /// Runs waiting for a slot.
    pub queued: usize,

    /// Slots in total.
    pub capacity: usize,

    /// The wait queue bound.
    pub max_queued: usize,

    /// Runs finished since startup.
    pub completed: u64,

    /// Runs turned away since startup.
    pub rejected: u64,
}

/// Holds a place in the wait queue until dropped.
struct QueueTicket<'a>(&'a AtomicUsize);

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Dispatcher {
    /// Creates a dispatcher sized by the runner's configuration.
    pub fn new(runner: IsolatedRunner) -> Self {
        let capacity = (*runner.config().get_max_concurrent()).max(1);
        let max_queued = *runner.config().get_max_queued();

        Self {
            inner: Arc::new(DispatcherInner {
                runner,
                slots: Arc::new(Semaphore::new(capacity)),
                capacity,
                max_queued,
                queued: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
            }),
        }
    }

    /// The runner executing admitted runs.
    pub fn runner(&self) -> &IsolatedRunner {
        &self.inner.runner
    }

    /// The configuration in use.
    pub fn config(&self) -> &RunnerConfig {
        self.inner.runner.config()
    }

    /// Validates a request and runs it once a slot is free.
    ///
    /// ## Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use coderunner_core::{
    ///     config::RunnerConfig,
    ///     execution::{Dispatcher, ExecutionRequest, IsolatedRunner},
    ///     registry::{ImageRegistry, Language},
    ///     runtime::DockerCli,
    /// };
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = Arc::new(RunnerConfig::from_env()?);
    /// let runtime = Arc::new(DockerCli::new(config.get_docker_bin()));
    /// let registry = Arc::new(ImageRegistry::from_config(&config));
    /// let dispatcher = Dispatcher::new(IsolatedRunner::new(runtime, registry, config));
    ///
    /// let request = ExecutionRequest::builder()
    ///     .language(Language::Python)
    ///     .source("print(input())")
    ///     .stdin("hello")
    ///     .build();
    ///
    /// let result = dispatcher.submit(request).await?;
    /// assert_eq!(result.stdout, "hello");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, request: ExecutionRequest) -> CoderunnerResult<ExecutionResult> {
        let limits = validate_request(&request, self.config())?;
        self.dispatch(request, limits).await
    }

    /// Runs an already validated request once a slot is free.
    pub async fn dispatch(
        &self,
        request: ExecutionRequest,
        limits: ResourceLimits,
    ) -> CoderunnerResult<ExecutionResult> {
        let inner = &self.inner;

        let permit = match Arc::clone(&inner.slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let ticket = self.enqueue()?;
                tracing::debug!(
                    "waiting for an execution slot ({} queued)",
                    inner.queued.load(Ordering::SeqCst)
                );
                let permit = Arc::clone(&inner.slots)
                    .acquire_owned()
                    .await
                    .map_err(|e| CoderunnerError::ContainerRuntime(e.to_string()))?;
                drop(ticket);
                permit
            }
        };

        // Detached so teardown still happens when the caller goes away.
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            let result = task_inner.runner.run(&request, limits).await;
            drop(permit);
            task_inner.completed.fetch_add(1, Ordering::Relaxed);
            result
        });

        handle
            .await
            .map_err(|e| CoderunnerError::ContainerRuntime(format!("execution task failed: {}", e)))
    }

    /// The current load.
    pub fn stats(&self) -> DispatcherStats {
        let inner = &self.inner;
        DispatcherStats {
            running: inner.capacity - inner.slots.available_permits(),
            queued: inner.queued.load(Ordering::SeqCst),
            capacity: inner.capacity,
            max_queued: inner.max_queued,
            completed: inner.completed.load(Ordering::Relaxed),
            rejected: inner.rejected.load(Ordering::Relaxed),
        }
    }

    fn enqueue(&self) -> CoderunnerResult<QueueTicket<'_>> {
        let inner = &self.inner;
        let admitted = inner
            .queued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |queued| {
                (queued < inner.max_queued).then_some(queued + 1)
            });

        match admitted {
            Ok(_) => Ok(QueueTicket(&inner.queued)),
            Err(queued) => {
                inner.rejected.fetch_add(1, Ordering::Relaxed);
                let stats = self.stats();
                tracing::warn!(
                    "rejecting run: {} running, {} queued",
                    stats.running,
                    queued
                );
                Err(CoderunnerError::CapacityExhausted {
                    running: stats.running,
                    queued,
                    max_queued: inner.max_queued,
                })
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for QueueTicket<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
