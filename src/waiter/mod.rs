// SPDX-License-Identifier: MIT OR Apache-2.0

//! The operation waiter.
//!
//! A [`Waiter`] drives any [`OperationPoller`] until the polled work reaches a
//! terminal state or the wait budget runs out:
//!
//! 1. Issue a status check.
//! 2. If the operation is done, stop. A server-reported failure becomes
//!    [`LroError::Operation`]; otherwise the poller produces the result.
//! 3. If the next sleep would overrun `max_wait`, stop with
//!    [`LroError::Timeout`]. The operation may still finish remotely.
//! 4. Sleep for the next backoff interval and go back to 1.
//!
//! Failed status checks are handed to the configured [`PollErrorPolicy`].
//! A done operation is never polled again.
//!
//! # Example
//!
//! ```no_run
//! use cloud_lro_rs::client::RestOperationsClient;
//! use cloud_lro_rs::poller::CloudOperationPollerNoResources;
//! use cloud_lro_rs::waiter::{WaitConfig, Waiter};
//! use std::time::Duration;
//!
//! # async fn example() -> cloud_lro_rs::Result<()> {
//! let client = RestOperationsClient::new("https://run.googleapis.com", "v1")?;
//! let poller = CloudOperationPollerNoResources::new(client);
//!
//! let waiter = Waiter::with_config(
//!     WaitConfig::builder()
//!         .max_wait(Duration::from_secs(600))
//!         .wait_ceiling(Duration::from_secs(30))
//!         .build(),
//! );
//! let response = waiter
//!     .wait_for(
//!         &poller,
//!         &"projects/p/locations/us-central1/operations/op-1".to_string(),
//!         "Deploying service",
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod progress;

pub use progress::{NoProgress, ProgressTracker, TracingProgress, WaitState};

use crate::error::{LroError, Result};
use crate::poller::OperationPoller;
use crate::runtime::{
    BackoffStrategy, ExponentialBackoff, PollErrorAction, PollErrorPolicy, PollMetrics, WaitSpan,
    LOG_TARGET,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

/// Default total wait budget.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

/// Settings for one wait call.
#[derive(Debug, Clone)]
pub struct WaitConfig<B: BackoffStrategy = ExponentialBackoff> {
    /// Total time budget. `None` waits until the operation finishes.
    pub max_wait: Option<Duration>,
    /// Sleep before the first status check, for operations known to be slow.
    pub pre_start_sleep: Duration,
    /// Upper bound on status checks, failed ones included.
    pub max_polls: Option<u32>,
    /// What to do when a status check fails.
    pub poll_errors: PollErrorPolicy,
    /// Sleep schedule between status checks.
    pub backoff: B,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_wait: Some(DEFAULT_MAX_WAIT),
            pre_start_sleep: Duration::ZERO,
            max_polls: None,
            poll_errors: PollErrorPolicy::default(),
            backoff: ExponentialBackoff::default(),
        }
    }
}

impl WaitConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> WaitConfigBuilder<ExponentialBackoff> {
        WaitConfigBuilder::new()
    }
}

impl<B: BackoffStrategy> WaitConfig<B> {
    /// `Some(waited)` when the wait must stop instead of sleeping `delay`.
    fn exhausted(&self, start: Instant, polls: u32, delay: Duration) -> Option<Duration> {
        if self.max_polls.is_some_and(|max| polls >= max) {
            return Some(start.elapsed());
        }
        match self.max_wait {
            Some(max_wait) if start.elapsed().saturating_add(delay) > max_wait => Some(max_wait),
            _ => None,
        }
    }
}

/// Builder for [`WaitConfig`].
#[derive(Debug, Clone)]
pub struct WaitConfigBuilder<B: BackoffStrategy> {
    config: WaitConfig<B>,
}

impl WaitConfigBuilder<ExponentialBackoff> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: WaitConfig::default(),
        }
    }

    /// Cap on a single sleep between status checks.
    #[must_use]
    pub fn wait_ceiling(mut self, ceiling: Duration) -> Self {
        self.config.backoff = self.config.backoff.with_max_delay(ceiling);
        self
    }

    /// First sleep between status checks.
    #[must_use]
    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.config.backoff = self.config.backoff.with_initial_delay(interval);
        self
    }

    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff = self.config.backoff.with_multiplier(multiplier);
        self
    }

    #[must_use]
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.backoff = self.config.backoff.with_jitter(jitter);
        self
    }
}

impl Default for WaitConfigBuilder<ExponentialBackoff> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BackoffStrategy> WaitConfigBuilder<B> {
    #[must_use]
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.config.max_wait = Some(max_wait);
        self
    }

    /// Wait until the operation finishes, however long it takes.
    #[must_use]
    pub fn no_max_wait(mut self) -> Self {
        self.config.max_wait = None;
        self
    }

    #[must_use]
    pub fn pre_start_sleep(mut self, sleep: Duration) -> Self {
        self.config.pre_start_sleep = sleep;
        self
    }

    #[must_use]
    pub fn max_polls(mut self, max_polls: u32) -> Self {
        self.config.max_polls = Some(max_polls);
        self
    }

    #[must_use]
    pub fn poll_errors(mut self, policy: PollErrorPolicy) -> Self {
        self.config.poll_errors = policy;
        self
    }

    /// Replace the sleep schedule.
    #[must_use]
    pub fn backoff<B2: BackoffStrategy>(self, backoff: B2) -> WaitConfigBuilder<B2> {
        WaitConfigBuilder {
            config: WaitConfig {
                max_wait: self.config.max_wait,
                pre_start_sleep: self.config.pre_start_sleep,
                max_polls: self.config.max_polls,
                poll_errors: self.config.poll_errors,
                backoff,
            },
        }
    }

    #[must_use]
    pub fn build(self) -> WaitConfig<B> {
        self.config
    }
}

/// Drives pollers to completion.
#[derive(Clone)]
pub struct Waiter<B: BackoffStrategy = ExponentialBackoff> {
    config: WaitConfig<B>,
    progress: Arc<dyn ProgressTracker>,
}

impl Waiter {
    /// A waiter with the default budget and schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WaitConfig::default())
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BackoffStrategy + fmt::Debug> fmt::Debug for Waiter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: BackoffStrategy> Waiter<B> {
    #[must_use]
    pub fn with_config(config: WaitConfig<B>) -> Self {
        Self {
            config,
            progress: Arc::new(TracingProgress),
        }
    }

    /// Replace the progress tracker.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn config(&self) -> &WaitConfig<B> {
        &self.config
    }

    /// Wait for the operation behind `handle` and return its result.
    pub async fn wait_for<P: OperationPoller>(
        &self,
        poller: &P,
        handle: &P::Handle,
        message: &str,
    ) -> Result<P::Output> {
        let operation = self.poll_until_done(poller, handle, message).await?;
        poller.get_result(operation).await
    }

    /// Wait for the operation behind `handle` and return the terminal
    /// operation itself. A server-reported failure is still an error.
    pub async fn poll_until_done<P: OperationPoller>(
        &self,
        poller: &P,
        handle: &P::Handle,
        message: &str,
    ) -> Result<P::Operation> {
        self.track(poller, handle, None, message).await
    }

    /// Like [`Self::poll_until_done`], starting from an operation the caller
    /// already holds, typically the one returned by the mutating call.
    ///
    /// No status check is issued if `operation` is already done.
    pub async fn poll_until_done_from<P: OperationPoller>(
        &self,
        poller: &P,
        handle: &P::Handle,
        operation: P::Operation,
        message: &str,
    ) -> Result<P::Operation> {
        self.track(poller, handle, Some(operation), message).await
    }

    /// Wait for several operations at once.
    ///
    /// Pending operations are polled round-robin, with one sleep per round,
    /// against a single shared budget. Results come back in `handles` order.
    /// If any operation fails or times out, every failure is reported
    /// together as [`LroError::Batch`].
    pub async fn wait_for_all<P: OperationPoller>(
        &self,
        poller: &P,
        handles: &[P::Handle],
        message: &str,
    ) -> Result<Vec<P::Output>> {
        if handles.is_empty() {
            return Ok(Vec::new());
        }

        let label = format!("{} operations", handles.len());
        let span = WaitSpan::new(&label, message);
        let metrics = PollMetrics::new();
        self.progress.start(&label, message);

        let outcome = self
            .poll_all(poller, handles, &metrics)
            .instrument(span.span().clone())
            .await;
        self.finish(&span, &metrics, &outcome);
        outcome
    }

    async fn track<P: OperationPoller>(
        &self,
        poller: &P,
        handle: &P::Handle,
        initial: Option<P::Operation>,
        message: &str,
    ) -> Result<P::Operation> {
        let span = WaitSpan::new(&handle.to_string(), message);
        let metrics = PollMetrics::new();
        self.progress.start(span.operation(), message);

        let outcome = self
            .poll_loop(poller, handle, initial, &metrics)
            .instrument(span.span().clone())
            .await;
        self.finish(&span, &metrics, &outcome);
        outcome
    }

    async fn poll_loop<P: OperationPoller>(
        &self,
        poller: &P,
        handle: &P::Handle,
        mut current: Option<P::Operation>,
        metrics: &PollMetrics,
    ) -> Result<P::Operation> {
        let start = Instant::now();
        if current.is_none() {
            self.pre_start(metrics).await;
        }

        let mut sleeps: u32 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            if current.is_none() {
                match poller.poll(handle).await {
                    Ok(operation) => {
                        metrics.record_poll();
                        consecutive_failures = 0;
                        self.progress
                            .on_poll(polls(metrics), poller.detail(&operation).as_deref());
                        current = Some(operation);
                    }
                    Err(e) => {
                        metrics.record_failed_poll();
                        consecutive_failures += 1;
                        self.tolerate(handle, e, consecutive_failures)?;
                    }
                }
            }

            if let Some(operation) = current.take() {
                if poller.is_done(&operation) {
                    debug!(
                        target: LOG_TARGET,
                        operation = %handle,
                        polls = metrics.polls(),
                        "operation finished"
                    );
                    return match poller.failure(&operation) {
                        Some(failure) => Err(LroError::Operation(failure)),
                        None => Ok(operation),
                    };
                }
            }

            let delay = self.config.backoff.delay(sleeps);
            if let Some(waited) = self.config.exhausted(start, polls(metrics), delay) {
                return Err(LroError::Timeout {
                    operation: handle.to_string(),
                    waited,
                    polls: polls(metrics),
                });
            }
            self.pause(delay, metrics).await;
            sleeps += 1;
        }
    }

    async fn poll_all<P: OperationPoller>(
        &self,
        poller: &P,
        handles: &[P::Handle],
        metrics: &PollMetrics,
    ) -> Result<Vec<P::Output>> {
        let start = Instant::now();
        self.pre_start(metrics).await;

        let mut results: Vec<Option<P::Output>> = handles.iter().map(|_| None).collect();
        let mut failures: Vec<(usize, LroError)> = Vec::new();
        let mut consecutive_failures = vec![0u32; handles.len()];
        let mut pending: Vec<usize> = (0..handles.len()).collect();
        let mut rounds: u32 = 0;

        loop {
            rounds += 1;
            let mut still_pending = Vec::with_capacity(pending.len());

            for index in pending {
                let handle = &handles[index];
                let operation = match poller.poll(handle).await {
                    Ok(operation) => operation,
                    Err(e) => {
                        metrics.record_failed_poll();
                        consecutive_failures[index] += 1;
                        match self.tolerate(handle, e, consecutive_failures[index]) {
                            Ok(()) => still_pending.push(index),
                            Err(e) => failures.push((index, e)),
                        }
                        continue;
                    }
                };

                metrics.record_poll();
                consecutive_failures[index] = 0;
                self.progress
                    .on_poll(polls(metrics), poller.detail(&operation).as_deref());

                if !poller.is_done(&operation) {
                    still_pending.push(index);
                } else if let Some(failure) = poller.failure(&operation) {
                    failures.push((index, LroError::Operation(failure)));
                } else {
                    match poller.get_result(operation).await {
                        Ok(output) => results[index] = Some(output),
                        Err(e) => failures.push((index, e)),
                    }
                }
            }

            pending = still_pending;
            if pending.is_empty() {
                break;
            }

            let delay = self.config.backoff.delay(rounds - 1);
            if let Some(waited) = self.config.exhausted(start, rounds, delay) {
                for index in pending {
                    failures.push((
                        index,
                        LroError::Timeout {
                            operation: handles[index].to_string(),
                            waited,
                            polls: rounds,
                        },
                    ));
                }
                break;
            }
            self.pause(delay, metrics).await;
        }

        if failures.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        failures.sort_by_key(|(index, _)| *index);
        Err(LroError::Batch(
            failures
                .into_iter()
                .map(|(index, e)| (handles[index].to_string(), e))
                .collect(),
        ))
    }

    /// `Ok(())` when the failed status check may be retried.
    fn tolerate(
        &self,
        handle: &impl fmt::Display,
        error: LroError,
        consecutive_failures: u32,
    ) -> Result<()> {
        match self.config.poll_errors.decide(&error, consecutive_failures) {
            PollErrorAction::Retry => {
                warn!(
                    target: LOG_TARGET,
                    operation = %handle,
                    attempt = consecutive_failures,
                    error = %error,
                    "status check failed, will retry"
                );
                Ok(())
            }
            PollErrorAction::Fail => Err(error),
        }
    }

    async fn pre_start(&self, metrics: &PollMetrics) {
        if !self.config.pre_start_sleep.is_zero() {
            self.pause(self.config.pre_start_sleep, metrics).await;
        }
    }

    async fn pause(&self, delay: Duration, metrics: &PollMetrics) {
        self.progress.on_sleep(delay);
        metrics.record_sleep(delay);
        tokio::time::sleep(delay).await;
    }

    fn finish<T>(&self, span: &WaitSpan, metrics: &PollMetrics, outcome: &Result<T>) {
        let polls = polls(metrics);
        let state = match outcome {
            Ok(_) => {
                span.record_success(polls);
                WaitState::Succeeded
            }
            Err(e) if e.is_timeout() => {
                span.record_timeout(polls);
                WaitState::TimedOut
            }
            Err(e) => {
                span.record_failure(polls, &e.to_string());
                WaitState::Failed
            }
        };
        self.progress.finish(state);
    }
}

fn polls(metrics: &PollMetrics) -> u32 {
    u32::try_from(metrics.polls()).unwrap_or(u32::MAX)
}

/// Wait for one operation with the default settings.
///
/// `max_wait` defaults to [`DEFAULT_MAX_WAIT`] and `wait_ceiling` to the
/// default backoff cap when not given.
pub async fn wait_for<P: OperationPoller>(
    poller: &P,
    handle: &P::Handle,
    message: &str,
    max_wait: Option<Duration>,
    wait_ceiling: Option<Duration>,
) -> Result<P::Output> {
    let mut builder = WaitConfig::builder();
    if let Some(max_wait) = max_wait {
        builder = builder.max_wait(max_wait);
    }
    if let Some(ceiling) = wait_ceiling {
        builder = builder.wait_ceiling(ceiling);
    }
    Waiter::with_config(builder.build())
        .wait_for(poller, handle, message)
        .await
}
