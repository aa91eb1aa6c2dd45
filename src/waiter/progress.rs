// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::runtime::LOG_TARGET;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Where a wait currently is. Every state except `Polling` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl WaitState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, WaitState::Polling)
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitState::Polling => write!(f, "polling"),
            WaitState::Succeeded => write!(f, "succeeded"),
            WaitState::Failed => write!(f, "failed"),
            WaitState::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Receives progress callbacks from the waiter.
///
/// All methods default to doing nothing.
pub trait ProgressTracker: Send + Sync {
    /// Called once before the first status check.
    fn start(&self, _operation: &str, _message: &str) {}

    /// Called after each successful status check. `poll` is 1-based.
    fn on_poll(&self, _poll: u32, _detail: Option<&str>) {}

    /// Called before each sleep.
    fn on_sleep(&self, _delay: Duration) {}

    /// Called once with the terminal state.
    fn finish(&self, _state: WaitState) {}
}

/// Reports progress as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressTracker for TracingProgress {
    fn start(&self, operation: &str, message: &str) {
        info!(target: LOG_TARGET, operation = %operation, "{}...", message);
    }

    fn on_poll(&self, poll: u32, detail: Option<&str>) {
        match detail {
            Some(detail) => {
                debug!(target: LOG_TARGET, poll, detail = %detail, "operation still running")
            }
            None => debug!(target: LOG_TARGET, poll, "operation still running"),
        }
    }

    fn on_sleep(&self, delay: Duration) {
        trace!(
            target: LOG_TARGET,
            delay_ms = delay.as_millis() as u64,
            "sleeping before next poll"
        );
    }

    fn finish(&self, state: WaitState) {
        match state {
            WaitState::Succeeded => info!(target: LOG_TARGET, "done"),
            WaitState::Polling => {}
            _ => warn!(target: LOG_TARGET, outcome = %state, "wait ended without success"),
        }
    }
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressTracker for NoProgress {}
