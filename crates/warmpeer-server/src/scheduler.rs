//! Connection Scheduler
//!
//! A bounded-concurrency task lane. Tasks are admitted in submission order and
//! at most `limit` of them run at any moment; with a limit of one, each task
//! starts only after the previous one has finished. Submitting never waits on
//! task completion, and a task's failure (error or panic) is recorded and
//! logged here without ever reaching the submitter.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use warmpeer_core::MeshError;

/// Error a scheduled task may finish with. Logged, never propagated.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TaskError(String);

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<MeshError> for TaskError {
    fn from(err: MeshError) -> Self {
        Self(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scheduler is no longer accepting tasks")]
pub struct SchedulerClosed;

/// Point-in-time task counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub panicked: u64,
}

impl SchedulerStats {
    /// Tasks submitted but not yet finished (queued or running)
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed + self.failed + self.panicked)
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

type Task = BoxFuture<'static, Result<(), TaskError>>;

pub struct TaskScheduler {
    name: &'static str,
    limit: NonZeroUsize,
    submit_tx: mpsc::UnboundedSender<Task>,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    dispatcher: JoinHandle<()>,
}

impl TaskScheduler {
    /// Create a scheduler running at most `limit` tasks at once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(name: &'static str, limit: NonZeroUsize) -> Self {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(limit.get()));
        let counters = Arc::new(Counters::default());

        let dispatcher = tokio::spawn(dispatch(
            name,
            submit_rx,
            semaphore.clone(),
            counters.clone(),
        ));

        debug!(scheduler = name, limit = limit.get(), "Task scheduler started");

        Self {
            name,
            limit,
            submit_tx,
            semaphore,
            counters,
            dispatcher,
        }
    }

    /// Single-slot scheduler: strictly one task at a time, FIFO.
    pub fn serial(name: &'static str) -> Self {
        Self::new(name, NonZeroUsize::MIN)
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    /// Enqueue a task and return immediately.
    pub fn submit<F>(&self, task: F) -> Result<(), SchedulerClosed>
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.submit_tx
            .send(task.boxed())
            .map_err(|_| SchedulerClosed)?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            started: self.counters.started.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting tasks and wait until every queued and running task has
    /// finished. Returns the final counters.
    pub async fn close(self) -> SchedulerStats {
        let stats_source = self.counters.clone();
        let Self {
            name,
            limit,
            submit_tx,
            semaphore,
            dispatcher,
            ..
        } = self;

        drop(submit_tx);
        if let Err(e) = dispatcher.await {
            warn!(scheduler = name, error = %e, "Dispatcher task ended abnormally");
        }

        // Every task was spawned holding a permit; getting them all back means
        // the last one has finished.
        let permits = u32::try_from(limit.get()).unwrap_or(u32::MAX);
        let _ = semaphore.acquire_many(permits).await;

        let stats = SchedulerStats {
            submitted: stats_source.submitted.load(Ordering::Relaxed),
            started: stats_source.started.load(Ordering::Relaxed),
            completed: stats_source.completed.load(Ordering::Relaxed),
            failed: stats_source.failed.load(Ordering::Relaxed),
            panicked: stats_source.panicked.load(Ordering::Relaxed),
        };
        debug!(
            scheduler = name,
            submitted = stats.submitted,
            failed = stats.failed,
            panicked = stats.panicked,
            "Task scheduler closed"
        );
        stats
    }
}

async fn dispatch(
    name: &'static str,
    mut submit_rx: mpsc::UnboundedReceiver<Task>,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
) {
    while let Some(task) = submit_rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let counters = counters.clone();
        let sequence = counters.started.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(scheduler = name, sequence, "Starting task");

        tokio::spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    debug!(scheduler = name, sequence, error = %e, "Task failed");
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    warn!(scheduler = name, sequence, "Task panicked");
                    counters.panicked.fetch_add(1, Ordering::Relaxed);
                }
            }
            drop(permit);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Start(usize),
        End(usize),
    }

    fn recording_task(
        id: usize,
        work: Duration,
        log: Arc<Mutex<Vec<Event>>>,
    ) -> impl Future<Output = Result<(), TaskError>> + Send + 'static {
        async move {
            log.lock().unwrap().push(Event::Start(id));
            tokio::time::sleep(work).await;
            log.lock().unwrap().push(Event::End(id));
            Ok(())
        }
    }

    async fn failing_task() -> Result<(), TaskError> {
        Err(TaskError::new("dial exhausted"))
    }

    async fn exploding_task() -> Result<(), TaskError> {
        panic!("task blew up")
    }

    #[tokio::test(start_paused = true)]
    async fn test_serial_tasks_never_overlap() {
        let scheduler = TaskScheduler::serial("test");
        let log = Arc::new(Mutex::new(Vec::new()));

        // Longest task first: a parallel runner would let task 2 finish first.
        scheduler
            .submit(recording_task(0, Duration::from_secs(3), log.clone()))
            .unwrap();
        scheduler
            .submit(recording_task(1, Duration::from_secs(2), log.clone()))
            .unwrap();
        scheduler
            .submit(recording_task(2, Duration::from_secs(1), log.clone()))
            .unwrap();

        let stats = scheduler.close().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Event::Start(0),
                Event::End(0),
                Event::Start(1),
                Event::End(1),
                Event::Start(2),
                Event::End(2),
            ]
        );
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.pending(), 0);
    }

    #[tokio::test]
    async fn test_submit_does_not_wait_for_completion() {
        let scheduler = TaskScheduler::serial("test");
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (done_tx, mut done_rx) = oneshot::channel::<()>();

        scheduler
            .submit(async move {
                let _ = release_rx.await;
                let _ = done_tx.send(());
                Ok::<(), TaskError>(())
            })
            .unwrap();

        // Submission returned while the task is still blocked.
        assert!(done_rx.try_recv().is_err());
        assert_eq!(scheduler.stats().pending(), 1);

        release_tx.send(()).unwrap();
        let stats = scheduler.close().await;
        assert!(done_rx.await.is_ok());
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_failures_and_panics_do_not_stop_the_lane() {
        let scheduler = TaskScheduler::serial("test");
        let ran_last = Arc::new(Mutex::new(false));
        let flag = ran_last.clone();

        scheduler.submit(failing_task()).unwrap();
        scheduler.submit(exploding_task()).unwrap();
        scheduler
            .submit(async move {
                *flag.lock().unwrap() = true;
                Ok::<(), TaskError>(())
            })
            .unwrap();

        let stats = scheduler.close().await;

        assert!(*ran_last.lock().unwrap());
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.started, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_caps_parallelism() {
        let limit = NonZeroUsize::new(2).unwrap();
        let scheduler = TaskScheduler::new("test", limit);
        let running = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            scheduler
                .submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), TaskError>(())
                })
                .unwrap();
        }

        let stats = scheduler.close().await;
        assert_eq!(stats.completed, 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pending_counts_unfinished() {
        let stats = SchedulerStats {
            submitted: 5,
            started: 3,
            completed: 1,
            failed: 1,
            panicked: 0,
        };
        assert_eq!(stats.pending(), 3);
    }
}
