// SPDX-License-Identifier: MIT OR Apache-2.0

use super::OperationPoller;
use crate::client::ExtendedOperationService;
use crate::error::Result;
use crate::operation::{ExtendedOperation, OperationFailure};
use async_trait::async_trait;

/// Polls status-based operations until they reach `DONE`.
///
/// The result is the finished operation itself; callers that need the target
/// resource follow `target_link`.
#[derive(Debug, Clone)]
pub struct ExtendedOperationPoller<S> {
    service: S,
}

impl<S: ExtendedOperationService> ExtendedOperationPoller<S> {
    #[must_use]
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: ExtendedOperationService> OperationPoller for ExtendedOperationPoller<S> {
    type Handle = String;
    type Operation = ExtendedOperation;
    type Output = ExtendedOperation;

    fn is_done(&self, operation: &ExtendedOperation) -> bool {
        operation.is_done()
    }

    fn failure(&self, operation: &ExtendedOperation) -> Option<OperationFailure> {
        operation.failure()
    }

    fn detail(&self, operation: &ExtendedOperation) -> Option<String> {
        match (&operation.status_message, operation.progress) {
            (Some(message), Some(progress)) => Some(format!("{message} ({progress}%)")),
            (Some(message), None) => Some(message.clone()),
            (None, Some(progress)) => Some(format!("{} ({progress}%)", operation.status)),
            (None, None) => None,
        }
    }

    async fn poll(&self, handle: &String) -> Result<ExtendedOperation> {
        self.service.get_extended_operation(handle).await
    }

    async fn get_result(&self, operation: ExtendedOperation) -> Result<ExtendedOperation> {
        Ok(operation)
    }
}
