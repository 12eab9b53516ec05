//! Deferred job processing.
//!
//! A small priority-ordered job queue driven by tokio worker tasks. Every
//! queued job is a one-shot future: exactly one worker takes it out of the
//! queue and polls it to completion, and nothing can put it back.
//!
//! # Example
//!
//! ```rust,ignore
//! let processor = Processor::new();
//! let workers = processor.spawn_workers(1)?;
//!
//! processor.queue_job(JobPriority::Critical, async move {
//!     initiate().await;
//! })?;
//! ```

use crate::{PlatformError, PlatformResult};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// A queued unit of work.
type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Scheduling priority of a job.
///
/// Workers always drain higher priorities first; jobs of equal priority run
/// in the order they were queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobPriority {
    /// Runs before everything else (e.g. initiating the configured connection)
    Critical,
    /// Time-sensitive work
    High,
    /// Default priority
    Medium,
    /// Background work
    Low,
}

impl JobPriority {
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Default)]
struct Queues {
    pending: [VecDeque<Job>; 4],
    closed: bool,
}

/// Priority job processor.
pub struct Processor {
    queues: Mutex<Queues>,
    notify: Notify,
    executed: AtomicUsize,
}

impl Processor {
    /// Creates an empty processor with no workers attached.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queues: Mutex::new(Queues::default()),
            notify: Notify::new(),
            executed: AtomicUsize::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        // Poisoning leaves the queues consistent.
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues a one-shot job.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::ProcessorClosed`] after [`shutdown`](Self::shutdown).
    pub fn queue_job<F>(&self, priority: JobPriority, job: F) -> PlatformResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        {
            let mut queues = self.lock();
            if queues.closed {
                return Err(PlatformError::ProcessorClosed);
            }
            queues.pending[priority.index()].push_back(Box::pin(job));
        }
        trace!(?priority, "job queued");
        self.notify.notify_one();
        Ok(())
    }

    /// Takes the next job, highest priority first.
    fn next_job(&self) -> Option<Job> {
        let mut queues = self.lock();
        queues.pending.iter_mut().find_map(|queue| queue.pop_front())
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.lock().pending.iter().map(VecDeque::len).sum()
    }

    /// Number of jobs run to completion so far.
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::Acquire)
    }

    async fn execute(&self, job: Job) {
        job.await;
        self.executed.fetch_add(1, Ordering::AcqRel);
    }

    /// Runs queued jobs on the current task until the queue is empty.
    ///
    /// Returns how many jobs were executed.
    pub async fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while let Some(job) = self.next_job() {
            self.execute(job).await;
            count += 1;
        }
        count
    }

    /// Spawns `count` worker tasks on the current tokio runtime.
    ///
    /// Workers exit once the processor is shut down and its queue drained.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `count` is zero.
    pub fn spawn_workers(self: &Arc<Self>, count: usize) -> PlatformResult<Vec<JoinHandle<()>>> {
        if count == 0 {
            return Err(PlatformError::Config(
                "at least one worker is required".into(),
            ));
        }

        Ok((0..count)
            .map(|id| {
                let processor = Arc::clone(self);
                tokio::spawn(async move { processor.worker_loop(id).await })
            })
            .collect())
    }

    async fn worker_loop(self: Arc<Self>, id: usize) {
        debug!(worker = id, "job worker started");

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before looking at the queue so a job queued
            // in between is not missed.
            notified.as_mut().enable();

            if let Some(job) = self.next_job() {
                self.execute(job).await;
                continue;
            }
            if self.is_closed() {
                break;
            }
            notified.await;
        }

        debug!(worker = id, "job worker stopped");
    }

    /// Stops accepting jobs. Already queued jobs still run.
    pub fn shutdown(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }
}
