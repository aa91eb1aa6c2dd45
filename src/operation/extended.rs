// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status-based operations as returned by Compute-style APIs.
//!
//! These do not use `done`/`error`; instead they carry a `status` enum and a
//! list of error entries with string codes.

use super::OperationFailure;
use crate::error::http_status_to_code;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    #[default]
    Pending,
    Running,
    Aborting,
    Done,
    #[serde(other)]
    StatusUnspecified,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "PENDING"),
            OperationStatus::Running => write!(f, "RUNNING"),
            OperationStatus::Aborting => write!(f, "ABORTING"),
            OperationStatus::Done => write!(f, "DONE"),
            OperationStatus::StatusUnspecified => write!(f, "STATUS_UNSPECIFIED"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedErrorEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedError {
    #[serde(default)]
    pub errors: Vec<ExtendedErrorEntry>,
}

/// A status-based operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedOperation {
    pub name: String,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExtendedError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_error_status_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_error_message: Option<String>,
}

impl ExtendedOperation {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }

    /// The error reported by a finished operation, folded into a single failure.
    ///
    /// Entries are joined into one message; each entry is kept as a
    /// structured detail. The HTTP error fields are used when the entry
    /// list is empty.
    #[must_use]
    pub fn failure(&self) -> Option<OperationFailure> {
        if !self.is_done() {
            return None;
        }

        let code = self
            .http_error_status_code
            .and_then(|s| u16::try_from(s).ok())
            .map(http_status_to_code)
            .filter(|c| *c != tonic::Code::Ok)
            .unwrap_or(tonic::Code::Unknown) as i32;

        let entries = self
            .error
            .as_ref()
            .map(|e| e.errors.as_slice())
            .unwrap_or_default();

        if !entries.is_empty() {
            let message = entries
                .iter()
                .map(|e| {
                    if e.code.is_empty() {
                        e.message.clone()
                    } else {
                        format!("{}: {}", e.code, e.message)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            let details = entries
                .iter()
                .filter_map(|e| serde_json::to_value(e).ok())
                .collect();
            return Some(OperationFailure {
                code,
                message,
                details,
            });
        }

        match (&self.http_error_status_code, &self.http_error_message) {
            (Some(status), message) if *status >= 400 => Some(OperationFailure::new(
                code,
                message
                    .clone()
                    .unwrap_or_else(|| format!("HTTP error {}", status)),
            )),
            _ => None,
        }
    }
}
