// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing spans for wait calls.
//!
//! Each wait gets one `lro.wait` span. Fields are filled in as the wait
//! progresses so a subscriber sees the final poll count, outcome and
//! duration when the span closes.
//!
//! | Field | Description |
//! |-------|-------------|
//! | `lro.operation` | Operation name or handle being waited on |
//! | `lro.message` | Progress message supplied by the caller |
//! | `lro.polls` | Number of status checks issued |
//! | `lro.outcome` | `succeeded`, `failed` or `timed_out` |
//! | `error.message` | Failure text, when the wait did not succeed |
//! | `duration_ms` | Wall time of the wait |

use std::time::Duration;
use tokio::time::Instant;
use tracing::{field, info_span, Span};

/// A span covering one wait call.
#[derive(Debug)]
pub struct WaitSpan {
    span: Span,
    start: Instant,
    operation: String,
}

impl WaitSpan {
    pub fn new(operation: &str, message: &str) -> Self {
        let span = info_span!(
            "lro.wait",
            lro.operation = %operation,
            lro.message = %message,
            lro.polls = field::Empty,
            lro.outcome = field::Empty,
            error.message = field::Empty,
            duration_ms = field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            operation: operation.to_string(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Time since the span was created, on the tokio clock.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn record_success(&self, polls: u32) {
        self.span.record("lro.polls", polls);
        self.span.record("lro.outcome", "succeeded");
        self.record_duration();
    }

    pub fn record_failure(&self, polls: u32, error: &str) {
        self.span.record("lro.polls", polls);
        self.span.record("lro.outcome", "failed");
        self.span.record("error.message", error);
        self.record_duration();
    }

    pub fn record_timeout(&self, polls: u32) {
        self.span.record("lro.polls", polls);
        self.span.record("lro.outcome", "timed_out");
        self.record_duration();
    }

    fn record_duration(&self) {
        self.span
            .record("duration_ms", self.start.elapsed().as_millis() as u64);
    }
}
