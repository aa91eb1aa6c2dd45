// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime utilities for polling and observability.
//!
//! Backoff schedules and poll-error policies drive the waiter loop; the
//! logging and tracing helpers make each wait visible to a `tracing`
//! subscriber.

mod logging;
mod retry;
pub mod tracing;

pub(crate) use logging::LOG_TARGET;
pub use logging::{AuthInterceptor, LogLevel, LoggingConfig, PollMetrics};
pub use retry::{
    BackoffStrategy, ExponentialBackoff, FixedBackoff, LinearBackoff, NoBackoff, PollErrorAction,
    PollErrorPolicy,
};
pub use self::tracing::WaitSpan;
