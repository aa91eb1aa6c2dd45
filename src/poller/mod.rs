// SPDX-License-Identifier: MIT OR Apache-2.0

//! Poller strategies.
//!
//! A poller knows how to check one family of operations: how to fetch the
//! latest state, how to tell whether it is finished, how to extract a
//! server-side failure and how to produce the final result. The
//! [`Waiter`](crate::waiter::Waiter) drives any poller the same way.
//!
//! | Poller | Polls | Result |
//! |--------|-------|--------|
//! | [`CloudOperationPoller`] | `google.longrunning` operation | Resource re-fetched by name |
//! | [`CloudOperationPollerNoResources`] | `google.longrunning` operation | Operation `response` payload |
//! | [`ExtendedOperationPoller`] | Status-based operation | The finished operation |
//! | [`ResourceDeletionPoller`] | A resource | `()` once the resource is gone |
//! | [`StatePoller`] | A resource with a state field | The resource in its final state |

mod cloud;
mod deletion;
mod extended;
mod state;

pub use cloud::{CloudOperationPoller, CloudOperationPollerNoResources};
pub use deletion::{ResourceDeletionPoller, ResourcePresence};
pub use extended::ExtendedOperationPoller;
pub use state::{StatePoller, GENERIC_FAILURE_MESSAGE};

use crate::error::Result;
use crate::operation::OperationFailure;
use async_trait::async_trait;
use std::fmt;

/// Strategy for checking one kind of long-running work.
///
/// `is_done` and `failure` must be pure: calling them repeatedly on the same
/// value gives the same answer and has no side effects.
#[async_trait]
pub trait OperationPoller: Send + Sync {
    /// What identifies the work being polled, e.g. an operation name.
    type Handle: fmt::Display + Send + Sync;
    /// The value returned by a status check.
    type Operation: Send;
    /// The value returned once the work finished successfully.
    type Output: Send;

    /// Whether `operation` is in a terminal state.
    fn is_done(&self, operation: &Self::Operation) -> bool;

    /// The server-reported failure of a terminal operation, if any.
    fn failure(&self, _operation: &Self::Operation) -> Option<OperationFailure> {
        None
    }

    /// A short progress hint for display while waiting.
    fn detail(&self, _operation: &Self::Operation) -> Option<String> {
        None
    }

    /// Issue one status check.
    async fn poll(&self, handle: &Self::Handle) -> Result<Self::Operation>;

    /// Turn a successful terminal operation into the caller's result.
    async fn get_result(&self, operation: Self::Operation) -> Result<Self::Output>;
}
