// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod operation;
pub mod poller;
pub mod runtime;
pub mod testkit;
pub mod waiter;

pub use client::{ClientConfig, GrpcOperationsClient, OperationsService, RestOperationsClient};
pub use error::{LroError, Result};
pub use operation::{ExtendedOperation, Operation, OperationFailure, OperationName};
pub use poller::{
    CloudOperationPoller, CloudOperationPollerNoResources, ExtendedOperationPoller,
    OperationPoller, ResourceDeletionPoller, StatePoller,
};
pub use waiter::{wait_for, WaitConfig, Waiter};
