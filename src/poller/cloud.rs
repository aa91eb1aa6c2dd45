// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pollers for `google.longrunning` operations.

use super::OperationPoller;
use crate::client::{OperationsService, ResourceGetter};
use crate::error::{LroError, Result};
use crate::operation::{Operation, OperationFailure};
use crate::runtime::LOG_TARGET;
use async_trait::async_trait;
use serde_json::Value;

/// Polls an operations service and, on success, fetches the finished resource.
///
/// The resource name is taken from the operation's `response.name`. Some
/// services return a response without a name (or an opaque protobuf `Any`
/// over gRPC); for those, set a fallback with [`Self::with_resource_name`].
#[derive(Debug, Clone)]
pub struct CloudOperationPoller<O, R> {
    operations: O,
    resources: R,
    resource_name: Option<String>,
}

impl<O, R> CloudOperationPoller<O, R>
where
    O: OperationsService,
    R: ResourceGetter,
{
    #[must_use]
    pub fn new(operations: O, resources: R) -> Self {
        Self {
            operations,
            resources,
            resource_name: None,
        }
    }

    /// Resource to fetch when the response does not name one.
    #[must_use]
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }
}

#[async_trait]
impl<O, R> OperationPoller for CloudOperationPoller<O, R>
where
    O: OperationsService,
    R: ResourceGetter,
{
    type Handle = String;
    type Operation = Operation;
    type Output = R::Resource;

    fn is_done(&self, operation: &Operation) -> bool {
        operation.is_done()
    }

    fn failure(&self, operation: &Operation) -> Option<OperationFailure> {
        operation.failure().cloned()
    }

    fn detail(&self, operation: &Operation) -> Option<String> {
        operation.status_detail().map(str::to_string)
    }

    async fn poll(&self, handle: &String) -> Result<Operation> {
        self.operations.get_operation(handle).await
    }

    async fn get_result(&self, operation: Operation) -> Result<R::Resource> {
        let name = operation
            .response_name()
            .map(str::to_string)
            .or_else(|| self.resource_name.clone())
            .ok_or_else(|| {
                LroError::Decode(format!(
                    "Operation [{}] finished but its response does not name a resource",
                    operation.name
                ))
            })?;

        tracing::debug!(
            target: LOG_TARGET,
            operation = %operation.name,
            resource = %name,
            "fetching finished resource"
        );
        self.resources.get(&name).await
    }
}

/// Polls an operations service and returns the operation's response payload.
///
/// For services whose operations either embed the full result or have no
/// result worth fetching (deletes). A finished operation without a response
/// yields [`Value::Null`].
#[derive(Debug, Clone)]
pub struct CloudOperationPollerNoResources<O> {
    operations: O,
}

impl<O: OperationsService> CloudOperationPollerNoResources<O> {
    #[must_use]
    pub fn new(operations: O) -> Self {
        Self { operations }
    }
}

#[async_trait]
impl<O: OperationsService> OperationPoller for CloudOperationPollerNoResources<O> {
    type Handle = String;
    type Operation = Operation;
    type Output = Value;

    fn is_done(&self, operation: &Operation) -> bool {
        operation.is_done()
    }

    fn failure(&self, operation: &Operation) -> Option<OperationFailure> {
        operation.failure().cloned()
    }

    fn detail(&self, operation: &Operation) -> Option<String> {
        operation.status_detail().map(str::to_string)
    }

    async fn poll(&self, handle: &String) -> Result<Operation> {
        self.operations.get_operation(handle).await
    }

    async fn get_result(&self, operation: Operation) -> Result<Value> {
        Ok(operation.response.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{ScriptedOperations, ScriptedResources};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_result_fetches_named_resource() {
        let ops = ScriptedOperations::new();
        let resources = Arc::new(ScriptedResources::new());
        resources.insert(
            "projects/p/triggers/t",
            json!({"name": "projects/p/triggers/t", "state": "ACTIVE"}),
        );

        let poller = CloudOperationPoller::new(ops, resources.clone());
        let op = Operation::succeeded("operations/op-1", json!({"name": "projects/p/triggers/t"}));

        let resource = poller.get_result(op).await.unwrap();
        assert_eq!(resource["state"], "ACTIVE");
        assert_eq!(resources.fetches("projects/p/triggers/t"), 1);
    }

    #[tokio::test]
    async fn test_get_result_uses_fallback_name() {
        let resources = Arc::new(ScriptedResources::new());
        resources.insert("projects/p/instances/db", json!({"tier": "small"}));

        let poller = CloudOperationPoller::new(ScriptedOperations::new(), resources)
            .with_resource_name("projects/p/instances/db");
        let op = Operation::succeeded(
            "operations/op-1",
            json!({"@type": "type.googleapis.com/google.protobuf.Empty"}),
        );

        assert_eq!(poller.get_result(op).await.unwrap()["tier"], "small");
    }

    #[tokio::test]
    async fn test_get_result_without_any_name_is_decode_error() {
        let poller = CloudOperationPoller::new(
            ScriptedOperations::new(),
            Arc::new(ScriptedResources::new()),
        );
        let op = Operation::succeeded("operations/op-1", json!({}));

        assert!(matches!(
            poller.get_result(op).await,
            Err(LroError::Decode(_))
        ));
    }

    #[test]
    fn test_is_done_and_failure_are_pure() {
        let poller = CloudOperationPollerNoResources::new(ScriptedOperations::new());
        let op = Operation::failed("operations/op-2", OperationFailure::new(13, "internal"));

        assert!(poller.is_done(&op));
        assert!(poller.is_done(&op));
        assert_eq!(poller.failure(&op), poller.failure(&op));
        assert_eq!(poller.failure(&op).unwrap().message, "internal");
    }

    #[tokio::test]
    async fn test_no_resources_returns_response_or_null() {
        let poller = CloudOperationPollerNoResources::new(ScriptedOperations::new());

        let op = Operation::succeeded("operations/a", json!({"id": "x"}));
        assert_eq!(poller.get_result(op).await.unwrap(), json!({"id": "x"}));

        let mut op = Operation::pending("operations/b");
        op.done = true;
        assert_eq!(poller.get_result(op).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_poll_delegates_to_service() {
        let ops = Arc::new(ScriptedOperations::new());
        ops.script(
            "operations/op-1",
            vec![Ok(Operation::pending("operations/op-1"))],
        );
        let poller = CloudOperationPollerNoResources::new(ops.clone());

        let op = poller.poll(&"operations/op-1".to_string()).await.unwrap();
        assert!(!poller.is_done(&op));
        assert_eq!(ops.polls("operations/op-1"), 1);
    }
}
