// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service seams consumed by the pollers.
//!
//! Both the gRPC and the REST client implement these; tests plug in the
//! scripted implementations from [`crate::testkit`].

use crate::error::Result;
use crate::operation::{ExtendedOperation, Operation};
use async_trait::async_trait;
use std::sync::Arc;

/// An operations service (`google.longrunning.Operations` or its REST mapping).
#[async_trait]
pub trait OperationsService: Send + Sync {
    /// Fetch the latest state of the named operation.
    async fn get_operation(&self, name: &str) -> Result<Operation>;

    /// Ask the server to cancel the operation. Best effort on the server side.
    async fn cancel_operation(&self, name: &str) -> Result<()>;

    /// Delete the operation record. Does not cancel the underlying work.
    async fn delete_operation(&self, name: &str) -> Result<()>;
}

/// Fetches a resource by its relative name.
#[async_trait]
pub trait ResourceGetter: Send + Sync {
    type Resource: Send;

    async fn get(&self, name: &str) -> Result<Self::Resource>;
}

/// A service that returns status-based operations.
#[async_trait]
pub trait ExtendedOperationService: Send + Sync {
    async fn get_extended_operation(&self, name: &str) -> Result<ExtendedOperation>;
}

#[async_trait]
impl<T: OperationsService + ?Sized> OperationsService for Arc<T> {
    async fn get_operation(&self, name: &str) -> Result<Operation> {
        (**self).get_operation(name).await
    }

    async fn cancel_operation(&self, name: &str) -> Result<()> {
        (**self).cancel_operation(name).await
    }

    async fn delete_operation(&self, name: &str) -> Result<()> {
        (**self).delete_operation(name).await
    }
}

#[async_trait]
impl<T: ResourceGetter + ?Sized> ResourceGetter for Arc<T> {
    type Resource = T::Resource;

    async fn get(&self, name: &str) -> Result<Self::Resource> {
        (**self).get(name).await
    }
}

#[async_trait]
impl<T: ExtendedOperationService + ?Sized> ExtendedOperationService for Arc<T> {
    async fn get_extended_operation(&self, name: &str) -> Result<ExtendedOperation> {
        (**self).get_extended_operation(name).await
    }
}
