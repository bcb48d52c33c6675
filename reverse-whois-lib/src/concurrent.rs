//! Worker pool executing one lookup per job.
//!
//! Workers share a single job queue; whichever worker is idle takes the next
//! job. Each job goes through the global rate limiter, takes the next API key,
//! calls the executor exactly once and sends exactly one outcome downstream.
//! The result channel closes once every worker has exited.

use crate::error::ReverseWhoisError;
use crate::keys::KeyRotator;
use crate::protocols::{LookupExecutor, LookupRequest};
use crate::ratelimit::RateLimiter;
use crate::types::{DisplayLine, Job, LookupOutcome, LookupResponse, QueryMode, QueryParams};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// State shared by every worker for the duration of a run.
struct WorkerContext {
    limiter: Arc<RateLimiter>,
    keys: Arc<KeyRotator>,
    executor: Arc<dyn LookupExecutor>,
    params: QueryParams,
    cancel: CancellationToken,
}

impl WorkerContext {
    async fn execute(&self, worker_id: usize, job: &Job) -> LookupOutcome {
        let term = job.target.as_str();

        if let Err(e) = self.limiter.acquire(&self.cancel).await {
            return failure(term, &self.params, e);
        }

        let api_key = self.keys.next();

        debug!(
            worker = worker_id,
            term,
            mode = %self.params.mode,
            scope = %self.params.scope,
            exclude = self.params.exclude.len(),
            "dispatching lookup"
        );

        let request = LookupRequest {
            target: term,
            api_key,
            params: &self.params,
        };

        match self.executor.search(request).await {
            Ok(response) => outcome_for(term, &self.params, response),
            Err(e) => failure(term, &self.params, e),
        }
    }
}

fn failure(term: &str, params: &QueryParams, error: ReverseWhoisError) -> LookupOutcome {
    warn!(term, category = error.category(), "lookup failed: {}", error);
    LookupOutcome::Failure {
        target: term.to_string(),
        line: DisplayLine::failure(term, params, &error),
        error,
    }
}

/// Map a successful executor response to display lines and clean records.
///
/// Preview yields a single count line. Purchase yields one line and one bare
/// record per match; with no matches it falls back to the count encoding so
/// the term still shows up once.
pub fn outcome_for(term: &str, params: &QueryParams, response: LookupResponse) -> LookupOutcome {
    let count_outcome = |count: u64| LookupOutcome::Success {
        target: term.to_string(),
        lines: vec![DisplayLine::value(
            term,
            params,
            "domainsCount",
            count.to_string(),
        )],
        records: vec![format!("{}\t{}", term, count)],
    };

    match params.mode {
        QueryMode::Preview => count_outcome(response.match_count),
        QueryMode::Purchase if response.match_list.is_empty() => {
            count_outcome(response.match_count)
        }
        QueryMode::Purchase => {
            let lines = response
                .match_list
                .iter()
                .map(|m| DisplayLine::value(term, params, "domain", m.as_str()))
                .collect();
            LookupOutcome::Success {
                target: term.to_string(),
                lines,
                records: response.match_list,
            }
        }
    }
}

/// Totals reported once every worker has exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub jobs_processed: usize,
}

/// Handle to a running pool.
pub struct PoolHandle {
    supervisor: JoinHandle<Result<PoolStats, ReverseWhoisError>>,
}

impl PoolHandle {
    /// Wait until every worker has exited.
    pub async fn join(self) -> Result<PoolStats, ReverseWhoisError> {
        self.supervisor
            .await
            .map_err(|e| ReverseWhoisError::internal(format!("worker pool supervisor failed: {}", e)))?
    }
}

/// Fixed-size pool of lookup workers.
pub struct WorkerPool {
    worker_count: usize,
    context: Arc<WorkerContext>,
}

impl WorkerPool {
    /// Create a pool of `worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `worker_count` is zero.
    pub fn new(
        worker_count: usize,
        limiter: Arc<RateLimiter>,
        keys: Arc<KeyRotator>,
        executor: Arc<dyn LookupExecutor>,
        params: QueryParams,
        cancel: CancellationToken,
    ) -> Result<Self, ReverseWhoisError> {
        if worker_count < 1 {
            return Err(ReverseWhoisError::config("--threads must be >= 1."));
        }

        Ok(Self {
            worker_count,
            context: Arc::new(WorkerContext {
                limiter,
                keys,
                executor,
                params,
                cancel,
            }),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Start the workers.
    ///
    /// Workers pull from `jobs` until it is closed and empty. Each worker holds
    /// a clone of `results`; the caller's sender is consumed here, so the
    /// result stream closes exactly when the last worker exits.
    pub fn spawn(
        &self,
        jobs: mpsc::Receiver<Job>,
        results: mpsc::Sender<LookupOutcome>,
    ) -> PoolHandle {
        let jobs = Arc::new(Mutex::new(jobs));
        let mut workers = JoinSet::new();

        for worker_id in 1..=self.worker_count {
            let jobs = jobs.clone();
            let results = results.clone();
            let context = self.context.clone();

            workers.spawn(async move {
                let mut processed = 0usize;
                loop {
                    // Only the lock holder waits on the queue; others queue on the lock.
                    let job = jobs.lock().await.recv().await;
                    let Some(job) = job else { break };

                    let outcome = context.execute(worker_id, &job).await;
                    processed += 1;

                    if results.send(outcome).await.is_err() {
                        warn!(worker = worker_id, "result stream closed, stopping worker");
                        break;
                    }
                }
                debug!(worker = worker_id, processed, "worker finished");
                processed
            });
        }
        drop(results);

        let worker_count = self.worker_count;
        let supervisor = tokio::spawn(async move {
            let mut stats = PoolStats {
                workers: worker_count,
                jobs_processed: 0,
            };
            while let Some(joined) = workers.join_next().await {
                let processed = joined.map_err(|e| {
                    ReverseWhoisError::internal(format!("worker task failed: {}", e))
                })?;
                stats.jobs_processed += processed;
            }
            debug!(jobs = stats.jobs_processed, "all workers done");
            Ok(stats)
        });

        PoolHandle { supervisor }
    }
}
