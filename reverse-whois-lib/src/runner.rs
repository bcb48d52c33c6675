//! Run orchestration.
//!
//! `LookupRunner` wires a producer, the worker pool and an aggregator together
//! for one bulk run:
//!
//! ```text
//! targets -> producer -> [jobs] -> workers (rate limited) -> [results] -> aggregator
//! ```
//!
//! The job queue is closed once every target is submitted, workers exit when
//! it drains, and the result stream closes after the last worker exits.

use crate::aggregator::{Aggregator, RunStatus};
use crate::concurrent::WorkerPool;
use crate::error::ReverseWhoisError;
use crate::keys::KeyRotator;
use crate::protocols::LookupExecutor;
use crate::ratelimit::RateLimiter;
use crate::types::{Job, LookupConfig, QueryParams};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Lifecycle of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// Producer is submitting jobs while workers run
    Dispatching,
    /// All jobs submitted, waiting for the result stream to close
    Draining,
    Done(RunStatus),
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs_submitted: usize,
    pub results_received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub records_written: usize,
    pub status: RunStatus,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// Drives one bulk reverse WHOIS run.
///
/// Must be created inside a Tokio runtime; the rate limiter's clock starts
/// at construction.
pub struct LookupRunner {
    threads: usize,
    params: QueryParams,
    limiter: Arc<RateLimiter>,
    keys: Arc<KeyRotator>,
    executor: Arc<dyn LookupExecutor>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<RunState>>,
}

impl LookupRunner {
    /// Build a runner from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration does not validate.
    pub fn new(
        config: &LookupConfig,
        keys: KeyRotator,
        executor: Arc<dyn LookupExecutor>,
    ) -> Result<Self, ReverseWhoisError> {
        config.validate()?;

        Ok(Self {
            threads: config.threads,
            params: config.query.clone(),
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            keys: Arc::new(keys),
            executor,
            cancel: CancellationToken::new(),
            state: Arc::new(watch::channel(RunState::Idle).0),
        })
    }

    /// Use an externally owned cancellation token, e.g. one tied to Ctrl-C.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch state transitions while a run is in progress.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Look up every target and feed the outcomes to `aggregator`.
    ///
    /// Each target becomes exactly one job and yields exactly one outcome.
    /// Per-lookup failures only affect the returned status.
    ///
    /// # Errors
    ///
    /// - `ConfigError` if the runner was already used
    /// - `Internal` if a sink write fails or a worker task dies
    pub async fn run<C: Write, F: Write>(
        &mut self,
        targets: Vec<String>,
        aggregator: &mut Aggregator<C, F>,
    ) -> Result<RunSummary, ReverseWhoisError> {
        if self.state() != RunState::Idle {
            return Err(ReverseWhoisError::config("runner has already been used"));
        }

        let pool = WorkerPool::new(
            self.threads,
            self.limiter.clone(),
            self.keys.clone(),
            self.executor.clone(),
            self.params.clone(),
            self.cancel.clone(),
        )?;

        info!(
            targets = targets.len(),
            workers = pool.worker_count(),
            rate_limit = self.limiter.permits_per_second(),
            keys = self.keys.pool_size(),
            "starting run"
        );

        let (job_tx, job_rx) = mpsc::channel::<Job>(self.threads);
        let (result_tx, mut result_rx) = mpsc::channel(self.threads);

        self.state.send_replace(RunState::Dispatching);
        let pool_handle = pool.spawn(job_rx, result_tx);

        let state = self.state.clone();
        let producer = tokio::spawn(async move {
            let mut submitted = 0usize;
            for target in targets {
                if job_tx.send(Job { target }).await.is_err() {
                    break;
                }
                submitted += 1;
            }
            drop(job_tx);
            state.send_replace(RunState::Draining);
            submitted
        });

        if let Err(e) = aggregator.drain(&mut result_rx).await {
            error!("output write failed: {}", e);
            self.cancel.cancel();
            drop(result_rx);
            let _ = producer.await;
            let _ = pool_handle.join().await;
            self.state.send_replace(RunState::Done(RunStatus::HadFailures));
            return Err(ReverseWhoisError::internal(format!(
                "failed writing output: {}",
                e
            )));
        }

        let jobs_submitted = producer
            .await
            .map_err(|e| ReverseWhoisError::internal(format!("producer task failed: {}", e)))?;
        let pool_stats = pool_handle.join().await?;

        let stats = aggregator.stats();
        debug!(
            jobs_submitted,
            jobs_processed = pool_stats.jobs_processed,
            results_received = stats.received,
            "run drained"
        );

        let status = aggregator.status();
        self.state.send_replace(RunState::Done(status));

        Ok(RunSummary {
            jobs_submitted,
            results_received: stats.received,
            succeeded: stats.succeeded,
            failed: stats.failed,
            records_written: stats.records_written,
            status,
        })
    }
}
