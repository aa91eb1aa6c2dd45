// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::operation::OperationFailure;
use std::time::Duration;
use thiserror::Error;

/// Appended to every timeout message.
pub const TIMEOUT_HINT: &str = "The operation may still be underway remotely and may still \
succeed; use the list and describe commands to check resource state.";

#[allow(clippy::result_large_err)]
#[derive(Debug, Error)]
pub enum LroError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API request failed: {0}")]
    Api(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("HTTP request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("HTTP client error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("{0}")]
    Operation(OperationFailure),

    #[error(
        "Operation [{operation}] has not finished in {} seconds after {polls} polls. {}",
        .waited.as_secs(),
        TIMEOUT_HINT
    )]
    Timeout {
        operation: String,
        waited: Duration,
        polls: u32,
    },

    #[error("{}", batch_message(.0))]
    Batch(Vec<(String, LroError)>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

fn batch_message(failures: &[(String, LroError)]) -> String {
    let lines: Vec<String> = failures
        .iter()
        .map(|(name, err)| format!("[{}]: {}", name, err))
        .collect();
    format!(
        "{} operation(s) did not succeed:\n  {}",
        failures.len(),
        lines.join("\n  ")
    )
}

impl LroError {
    /// Map the error onto the canonical gRPC code space.
    ///
    /// HTTP statuses follow the mapping Google APIs use between the two.
    #[must_use]
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            LroError::Api(status) => status.code(),
            LroError::Transport(_) => tonic::Code::Unavailable,
            LroError::Http { status, .. } => http_status_to_code(*status),
            LroError::Request(e) => {
                if let Some(status) = e.status() {
                    http_status_to_code(status.as_u16())
                } else if e.is_timeout() {
                    tonic::Code::DeadlineExceeded
                } else if e.is_connect() {
                    tonic::Code::Unavailable
                } else {
                    tonic::Code::Unknown
                }
            }
            LroError::Operation(failure) => tonic::Code::from_i32(failure.code),
            LroError::Timeout { .. } => tonic::Code::DeadlineExceeded,
            LroError::Config(_) | LroError::Validation(_) => tonic::Code::InvalidArgument,
            LroError::Decode(_) | LroError::Batch(_) | LroError::Unknown(_) => {
                tonic::Code::Internal
            }
        }
    }

    /// True when the server said the polled object does not exist.
    ///
    /// Only transport-level errors count; an operation that finished with
    /// `NOT_FOUND` is a terminal failure, not a missing resource.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            LroError::Api(_) | LroError::Http { .. } | LroError::Request(_) => {
                self.grpc_code() == tonic::Code::NotFound
            }
            _ => false,
        }
    }

    /// True for transport-level failures that are worth polling through.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            LroError::Api(_)
            | LroError::Transport(_)
            | LroError::Http { .. }
            | LroError::Request(_) => matches!(
                self.grpc_code(),
                tonic::Code::NotFound
                    | tonic::Code::Unavailable
                    | tonic::Code::DeadlineExceeded
                    | tonic::Code::ResourceExhausted
                    | tonic::Code::Aborted
                    | tonic::Code::Internal
                    | tonic::Code::Unknown
            ),
            _ => false,
        }
    }

    /// The server-side failure, if this error is one.
    #[must_use]
    pub fn as_operation_failure(&self) -> Option<&OperationFailure> {
        match self {
            LroError::Operation(failure) => Some(failure),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, LroError::Timeout { .. })
    }
}

impl From<OperationFailure> for LroError {
    fn from(failure: OperationFailure) -> Self {
        LroError::Operation(failure)
    }
}

pub(crate) fn http_status_to_code(status: u16) -> tonic::Code {
    match status {
        200..=299 => tonic::Code::Ok,
        400 => tonic::Code::InvalidArgument,
        401 => tonic::Code::Unauthenticated,
        403 => tonic::Code::PermissionDenied,
        404 => tonic::Code::NotFound,
        409 => tonic::Code::Aborted,
        412 => tonic::Code::FailedPrecondition,
        416 => tonic::Code::OutOfRange,
        429 => tonic::Code::ResourceExhausted,
        499 => tonic::Code::Cancelled,
        500 => tonic::Code::Internal,
        501 => tonic::Code::Unimplemented,
        503 => tonic::Code::Unavailable,
        504 => tonic::Code::DeadlineExceeded,
        _ => tonic::Code::Unknown,
    }
}

pub type Result<T> = std::result::Result<T, LroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(http_status_to_code(404), tonic::Code::NotFound);
        assert_eq!(http_status_to_code(503), tonic::Code::Unavailable);
        assert_eq!(http_status_to_code(429), tonic::Code::ResourceExhausted);
        assert_eq!(http_status_to_code(418), tonic::Code::Unknown);
    }

    #[test]
    fn test_not_found_classification() {
        let err = LroError::Api(tonic::Status::not_found("gone"));
        assert!(err.is_not_found());
        assert!(err.is_transient());

        let err = LroError::Http {
            status: 404,
            message: "missing".to_string(),
        };
        assert!(err.is_not_found());

        // A finished operation carrying NOT_FOUND is terminal, not missing.
        let err = LroError::Operation(OperationFailure::new(5, "no such bucket"));
        assert!(!err.is_not_found());
        assert!(!err.is_transient());
        assert_eq!(err.grpc_code(), tonic::Code::NotFound);
    }

    #[test]
    fn test_permission_denied_is_not_transient() {
        let err = LroError::Api(tonic::Status::permission_denied("nope"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_timeout_message() {
        let err = LroError::Timeout {
            operation: "operations/op-9".to_string(),
            waited: Duration::from_secs(60),
            polls: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("operations/op-9"));
        assert!(msg.contains("60 seconds"));
        assert!(msg.contains("may still succeed"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_operation_error_displays_server_message() {
        let err = LroError::from(OperationFailure::new(13, "internal"));
        assert_eq!(err.to_string(), "internal");
    }

    #[test]
    fn test_batch_message() {
        let err = LroError::Batch(vec![
            (
                "op-a".to_string(),
                LroError::Operation(OperationFailure::new(9, "quota")),
            ),
            (
                "op-b".to_string(),
                LroError::Validation("bad".to_string()),
            ),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 operation(s)"));
        assert!(msg.contains("[op-a]: quota"));
        assert!(msg.contains("[op-b]: Validation error: bad"));
    }
}
