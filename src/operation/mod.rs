// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed long-running operation model.
//!
//! [`Operation`] is the transport-neutral view of a
//! `google.longrunning.Operation`: the gRPC client converts wire messages into
//! it and the REST client deserializes it straight from JSON. Payloads are
//! kept as [`serde_json::Value`]; protobuf `Any` payloads that cannot be
//! decoded locally are carried as `{"@type": ..., "value": <base64>}`.

mod extended;
mod name;

pub use extended::{ExtendedError, ExtendedErrorEntry, ExtendedOperation, OperationStatus};
pub use name::{OperationName, OperationScope};

use crate::api::longrunning::{
    operation::Result as ProtoResult, Operation as ProtoOperation, Status as ProtoStatus,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A pending or finished server-side operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Server-assigned name, usually a relative resource path.
    pub name: String,
    /// `false` while the operation is still running.
    #[serde(default)]
    pub done: bool,
    /// Service-specific progress metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Set when the operation finished unsuccessfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationFailure>,
    /// Set when the operation finished successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl Operation {
    /// An operation that has not finished yet.
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A finished operation carrying a response payload.
    #[must_use]
    pub fn succeeded(name: impl Into<String>, response: Value) -> Self {
        Self {
            name: name.into(),
            done: true,
            response: Some(response),
            ..Default::default()
        }
    }

    /// A finished operation carrying an error.
    #[must_use]
    pub fn failed(name: impl Into<String>, failure: OperationFailure) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: Some(failure),
            ..Default::default()
        }
    }

    /// Attach progress metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The error payload, only meaningful once `done` is set.
    #[must_use]
    pub fn failure(&self) -> Option<&OperationFailure> {
        if self.done {
            self.error.as_ref()
        } else {
            None
        }
    }

    /// The `name` field of the response payload, if the response has one.
    ///
    /// Result-fetching pollers use this to locate the finished resource.
    #[must_use]
    pub fn response_name(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.get("name"))
            .and_then(Value::as_str)
    }

    /// The `@type` of the response payload.
    #[must_use]
    pub fn response_type(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.get("@type"))
            .and_then(Value::as_str)
    }

    /// A short, human-readable progress hint taken from the metadata.
    ///
    /// Looks at the field names Google APIs commonly use for this.
    #[must_use]
    pub fn status_detail(&self) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        ["statusDetail", "statusMessage", "verb"]
            .iter()
            .find_map(|key| metadata.get(*key).and_then(Value::as_str))
    }
}

impl From<ProtoOperation> for Operation {
    fn from(proto: ProtoOperation) -> Self {
        let (error, response) = match proto.result {
            Some(ProtoResult::Error(status)) => (Some(status.into()), None),
            Some(ProtoResult::Response(any)) => (None, Some(any_to_json(any))),
            None => (None, None),
        };

        Self {
            name: proto.name,
            done: proto.done,
            metadata: proto.metadata.map(any_to_json),
            error,
            response,
        }
    }
}

fn any_to_json(any: prost_types::Any) -> Value {
    serde_json::json!({
        "@type": any.type_url,
        "value": base64::engine::general_purpose::STANDARD.encode(any.value),
    })
}

/// Error payload of a finished operation (`google.rpc.Status`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    /// Canonical status code.
    #[serde(default)]
    pub code: i32,
    /// Developer-facing message from the server.
    #[serde(default)]
    pub message: String,
    /// Structured error details.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Value>,
}

impl OperationFailure {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.details.push(detail);
        self
    }

    /// Canonical name of [`Self::code`], e.g. `INTERNAL` for 13.
    #[must_use]
    pub fn code_name(&self) -> &'static str {
        match self.code {
            0 => "OK",
            1 => "CANCELLED",
            2 => "UNKNOWN",
            3 => "INVALID_ARGUMENT",
            4 => "DEADLINE_EXCEEDED",
            5 => "NOT_FOUND",
            6 => "ALREADY_EXISTS",
            7 => "PERMISSION_DENIED",
            8 => "RESOURCE_EXHAUSTED",
            9 => "FAILED_PRECONDITION",
            10 => "ABORTED",
            11 => "OUT_OF_RANGE",
            12 => "UNIMPLEMENTED",
            13 => "INTERNAL",
            14 => "UNAVAILABLE",
            15 => "DATA_LOSS",
            16 => "UNAUTHENTICATED",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "operation failed with status {}", self.code_name())
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl From<ProtoStatus> for OperationFailure {
    fn from(status: ProtoStatus) -> Self {
        Self {
            code: status.code,
            message: status.message,
            details: status.details.into_iter().map(any_to_json).collect(),
        }
    }
}
