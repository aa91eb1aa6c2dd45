// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pollers driven by a state field of a JSON resource.

use super::OperationPoller;
use crate::client::ResourceGetter;
use crate::error::Result;
use crate::operation::OperationFailure;
use async_trait::async_trait;
use serde_json::Value;

/// Message used when a resource reaches an error state without saying why.
pub const GENERIC_FAILURE_MESSAGE: &str = "The operation failed.";

/// Polls a resource until a configured field reaches a terminal value.
///
/// The work is done once the state field holds one of the success or error
/// values. A finished resource fails when its error field is set, or when
/// the state is an error value and the error field is empty.
///
/// Field paths are dot separated (`status.state`). Non-string scalars are
/// compared by their JSON text, so `true` matches a boolean field.
///
/// The defaults match a `google.longrunning` operation read as JSON: done
/// when `done` is `true`, failed when `error` is set.
///
/// ```
/// use cloud_lro_rs::poller::StatePoller;
/// use cloud_lro_rs::testkit::ScriptedResources;
///
/// let poller = StatePoller::new(ScriptedResources::new())
///     .with_state_field("state")
///     .with_success_values(["ACTIVE"])
///     .with_error_values(["FAILED", "DELETING"])
///     .with_error_field("stateMessage");
/// ```
#[derive(Debug, Clone)]
pub struct StatePoller<G> {
    getter: G,
    state_field: String,
    success_values: Vec<String>,
    error_values: Vec<String>,
    error_field: String,
}

impl<G> StatePoller<G>
where
    G: ResourceGetter<Resource = Value>,
{
    #[must_use]
    pub fn new(getter: G) -> Self {
        Self {
            getter,
            state_field: "done".to_string(),
            success_values: vec!["true".to_string()],
            error_values: Vec::new(),
            error_field: "error".to_string(),
        }
    }

    #[must_use]
    pub fn with_state_field(mut self, field: impl Into<String>) -> Self {
        self.state_field = field.into();
        self
    }

    #[must_use]
    pub fn with_success_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.success_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_error_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_error_field(mut self, field: impl Into<String>) -> Self {
        self.error_field = field.into();
        self
    }

    fn state(&self, resource: &Value) -> Option<String> {
        lookup(resource, &self.state_field).and_then(scalar_text)
    }
}

#[async_trait]
impl<G> OperationPoller for StatePoller<G>
where
    G: ResourceGetter<Resource = Value>,
{
    type Handle = String;
    type Operation = Value;
    type Output = Value;

    fn is_done(&self, resource: &Value) -> bool {
        self.state(resource).is_some_and(|state| {
            self.success_values.contains(&state) || self.error_values.contains(&state)
        })
    }

    fn failure(&self, resource: &Value) -> Option<OperationFailure> {
        let state = self.state(resource)?;
        let errored = self.error_values.contains(&state);
        if !errored && !self.success_values.contains(&state) {
            return None;
        }

        match lookup(resource, &self.error_field).filter(|e| !is_empty(e)) {
            Some(error) => Some(error_to_failure(error)),
            None if errored => Some(OperationFailure::new(
                tonic::Code::Unknown as i32,
                GENERIC_FAILURE_MESSAGE,
            )),
            None => None,
        }
    }

    fn detail(&self, resource: &Value) -> Option<String> {
        self.state(resource)
    }

    async fn poll(&self, handle: &String) -> Result<Value> {
        self.getter.get(handle).await
    }

    async fn get_result(&self, resource: Value) -> Result<Value> {
        Ok(resource)
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(_) => false,
    }
}

/// A bare string becomes the message; a `google.rpc.Status`-shaped object
/// keeps its code and details.
fn error_to_failure(error: &Value) -> OperationFailure {
    let Value::Object(fields) = error else {
        let message = scalar_text(error).unwrap_or_else(|| error.to_string());
        return OperationFailure::new(tonic::Code::Unknown as i32, message);
    };

    let code = fields
        .get("code")
        .and_then(Value::as_i64)
        .and_then(|c| i32::try_from(c).ok())
        .filter(|c| *c != tonic::Code::Ok as i32)
        .unwrap_or(tonic::Code::Unknown as i32);
    let message = fields
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());

    fields
        .get("details")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .fold(OperationFailure::new(code, message), |failure, detail| {
            failure.with_detail(detail.clone())
        })
}
