// SPDX-License-Identifier: MIT OR Apache-2.0

use super::OperationPoller;
use crate::client::ResourceGetter;
use crate::error::Result;
use crate::runtime::LOG_TARGET;
use async_trait::async_trait;

/// What a deletion poll observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePresence<R> {
    /// The resource still exists.
    Present(R),
    /// The server answered `NOT_FOUND`.
    Gone,
}

/// Polls a resource until the server stops returning it.
///
/// This is the one poller where a `NOT_FOUND` answer means success. Every
/// other error from the getter propagates to the waiter's error policy.
#[derive(Debug, Clone)]
pub struct ResourceDeletionPoller<G> {
    getter: G,
}

impl<G: ResourceGetter> ResourceDeletionPoller<G> {
    #[must_use]
    pub fn new(getter: G) -> Self {
        Self { getter }
    }
}

#[async_trait]
impl<G: ResourceGetter> OperationPoller for ResourceDeletionPoller<G> {
    type Handle = String;
    type Operation = ResourcePresence<G::Resource>;
    type Output = ();

    fn is_done(&self, operation: &Self::Operation) -> bool {
        matches!(operation, ResourcePresence::Gone)
    }

    async fn poll(&self, handle: &String) -> Result<Self::Operation> {
        match self.getter.get(handle).await {
            Ok(resource) => Ok(ResourcePresence::Present(resource)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(target: LOG_TARGET, resource = %handle, "resource is gone");
                Ok(ResourcePresence::Gone)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_result(&self, _operation: Self::Operation) -> Result<()> {
        Ok(())
    }
}
