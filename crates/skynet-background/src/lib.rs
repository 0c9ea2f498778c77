//! Bounded fire-and-forget background task queue (spec §4.4 step 12, §9
//! "Background task lifetime", §5 "bounded concurrency per user").
//!
//! Adapted from the teacher's `skynet-scheduler` engine/handle split
//! (`SchedulerEngine`/`SchedulerHandle`): a handle side that callers clone
//! into request-scoped code, and an engine side that owns the receiver and
//! runs the drain loop. Simplified from a cron-like job table down to a
//! plain `mpsc`-backed queue of boxed futures, since background extraction
//! here has no schedule, only a fire point.

pub mod error;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use error::{BackgroundError, Result};

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Cloneable submission side. Held by the orchestrator and handed into every
/// request's background fan-out (spec §4.4 step 12).
#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::Sender<BoxedJob>,
}

impl BackgroundHandle {
    /// Enqueue a fire-and-forget job. Never blocks the caller — a full
    /// queue drops the job and returns `QueueFull` (spec §7 BackgroundFailure:
    /// "logged, never surfaced to the user"); callers log and move on.
    pub fn spawn(&self, job: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        match self.tx.try_send(Box::pin(job)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(BackgroundError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(BackgroundError::Closed),
        }
    }
}

/// Owns the receiving side and the drain loop. `run` is spawned once at
/// startup; the returned `BackgroundHandle` is cloned into request state.
pub struct BackgroundEngine {
    rx: mpsc::Receiver<BoxedJob>,
    max_concurrency: usize,
}

impl BackgroundEngine {
    pub fn new(queue_capacity: usize, max_concurrency: usize) -> (BackgroundHandle, Self) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        (
            BackgroundHandle { tx },
            BackgroundEngine {
                rx,
                max_concurrency: max_concurrency.max(1),
            },
        )
    }

    /// Runs until `shutdown` fires, then drains whatever is left in the
    /// queue (and whatever is already in flight) for up to `drain_timeout`
    /// before giving up — "a bounded work queue with at-shutdown drain
    /// (timeout) is required" (spec §9).
    pub async fn run(mut self, shutdown: CancellationToken, drain_timeout: Duration) {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = self.rx.recv() => {
                    match job {
                        Some(job) => self.dispatch(&mut tasks, &permits, job),
                        None => break,
                    }
                }
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        info!("background engine shutting down, draining remaining work");
        let drained = tokio::time::timeout(drain_timeout, async {
            // Drain anything still buffered in the channel.
            while let Ok(job) = self.rx.try_recv() {
                self.dispatch(&mut tasks, &permits, job);
            }
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                "background drain timed out, abandoning outstanding jobs"
            );
        } else {
            debug!("background engine drained cleanly");
        }
    }

    fn dispatch(&self, tasks: &mut JoinSet<()>, permits: &Arc<Semaphore>, job: BoxedJob) {
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire().await;
            job.await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn jobs_run_and_engine_drains_on_shutdown() {
        let (handle, engine) = BackgroundEngine::new(16, 4);
        let counter = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let run_handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(engine.run(shutdown, Duration::from_secs(1)))
        };

        for _ in 0..5 {
            let counter = counter.clone();
            handle
                .spawn(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        // Give the loop a moment to pick jobs up, then signal shutdown —
        // the drain path must still finish anything still queued/in-flight.
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        run_handle.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn full_queue_drops_job_instead_of_blocking() {
        let (handle, _engine) = BackgroundEngine::new(1, 1);
        handle.spawn(async {}).unwrap();
        // Second job: channel capacity 1, first still unconsumed (engine
        // never started) — must report QueueFull, not block.
        let err = handle.spawn(async {});
        assert!(matches!(err, Err(BackgroundError::QueueFull)));
    }
}
