// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging helpers for operation polling.
//!
//! Provides a level-switchable event emitter, per-wait poll counters, and a
//! gRPC interceptor that attaches credentials to every status request and
//! logs the outgoing metadata with secrets redacted.
//!
//! # Example
//!
//! ```
//! use cloud_lro_rs::runtime::{AuthInterceptor, LogLevel, LoggingConfig};
//!
//! let interceptor = AuthInterceptor::new(Some("ya29.token".to_string()), None)
//!     .with_config(LoggingConfig::new().with_request_level(LogLevel::Debug));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tonic::metadata::{AsciiMetadataValue, KeyAndValueRef};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::{debug, error, info, trace, warn};

pub(crate) const LOG_TARGET: &str = "cloud_lro";

/// Log level for poll and request events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - most verbose.
    Trace,
    /// Debug level.
    #[default]
    Debug,
    /// Info level.
    Info,
    /// Warn level.
    Warn,
    /// Error level - only errors.
    Error,
    /// Disabled - no logging.
    Off,
}

impl LogLevel {
    /// Emit `message` at this level.
    pub fn emit(self, message: &str) {
        match self {
            LogLevel::Trace => trace!(target: LOG_TARGET, "{}", message),
            LogLevel::Debug => debug!(target: LOG_TARGET, "{}", message),
            LogLevel::Info => info!(target: LOG_TARGET, "{}", message),
            LogLevel::Warn => warn!(target: LOG_TARGET, "{}", message),
            LogLevel::Error => error!(target: LOG_TARGET, "{}", message),
            LogLevel::Off => {}
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

/// Configuration for request logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for outgoing status requests.
    pub request_level: LogLevel,
    /// Whether to log request metadata.
    pub log_metadata: bool,
    /// Whether to redact sensitive headers.
    pub redact_sensitive: bool,
    /// Header names to redact.
    pub sensitive_headers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            request_level: LogLevel::Trace,
            log_metadata: true,
            redact_sensitive: true,
            sensitive_headers: vec![
                "authorization".to_string(),
                "x-goog-api-key".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_request_level(mut self, level: LogLevel) -> Self {
        self.request_level = level;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.log_metadata = enabled;
        self
    }

    #[must_use]
    pub fn with_redaction(mut self, enabled: bool) -> Self {
        self.redact_sensitive = enabled;
        self
    }

    #[must_use]
    pub fn with_sensitive_header(mut self, header: impl Into<String>) -> Self {
        self.sensitive_headers.push(header.into());
        self
    }

    fn is_sensitive(&self, key: &str) -> bool {
        self.redact_sensitive
            && self
                .sensitive_headers
                .iter()
                .any(|h| h.eq_ignore_ascii_case(key))
    }
}

/// Counters for one wait call.
#[derive(Debug, Default)]
pub struct PollMetrics {
    polls: AtomicU64,
    failed_polls: AtomicU64,
    sleeps: AtomicU64,
    slept_ms: AtomicU64,
}

impl PollMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status check that returned an operation.
    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a status check that failed.
    pub fn record_failed_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.failed_polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one sleep between polls.
    pub fn record_sleep(&self, delay: Duration) {
        self.sleeps.fetch_add(1, Ordering::Relaxed);
        self.slept_ms
            .fetch_add(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Total status checks, successful or not.
    #[must_use]
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed_polls(&self) -> u64 {
        self.failed_polls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sleeps(&self) -> u64 {
        self.sleeps.load(Ordering::Relaxed)
    }

    /// Total time spent sleeping between polls.
    #[must_use]
    pub fn slept(&self) -> Duration {
        Duration::from_millis(self.slept_ms.load(Ordering::Relaxed))
    }
}

/// A gRPC interceptor that attaches credentials and logs status requests.
///
/// Sets `authorization: Bearer <token>` and, when a quota project is given,
/// `x-goog-user-project`.
#[derive(Clone)]
pub struct AuthInterceptor {
    authorization: Option<AsciiMetadataValue>,
    quota_project: Option<AsciiMetadataValue>,
    config: LoggingConfig,
}

impl AuthInterceptor {
    /// Create an interceptor. Values that are not valid ASCII metadata are dropped.
    #[must_use]
    pub fn new(access_token: Option<String>, quota_project: Option<String>) -> Self {
        Self {
            authorization: access_token
                .and_then(|t| AsciiMetadataValue::try_from(format!("Bearer {t}")).ok()),
            quota_project: quota_project.and_then(|p| AsciiMetadataValue::try_from(p).ok()),
            config: LoggingConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.authorization.is_some()
    }

    fn describe_metadata<T>(&self, request: &Request<T>) -> String {
        if !self.config.log_metadata {
            return String::new();
        }

        let parts: Vec<String> = request
            .metadata()
            .iter()
            .map(|entry| match entry {
                KeyAndValueRef::Ascii(key, value) => {
                    if self.config.is_sensitive(key.as_str()) {
                        format!("{}=[REDACTED]", key.as_str())
                    } else {
                        format!("{}={:?}", key.as_str(), value)
                    }
                }
                KeyAndValueRef::Binary(key, _) => format!("{}=<binary>", key.as_str()),
            })
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!(" metadata=[{}]", parts.join(", "))
        }
    }
}

impl fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("authorization", &self.authorization.as_ref().map(|_| "[REDACTED]"))
            .field("quota_project", &self.quota_project)
            .finish()
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> std::result::Result<Request<()>, Status> {
        if let Some(value) = &self.authorization {
            request.metadata_mut().insert("authorization", value.clone());
        }
        if let Some(value) = &self.quota_project {
            request
                .metadata_mut()
                .insert("x-goog-user-project", value.clone());
        }

        if self.config.request_level != LogLevel::Off {
            let msg = format!("gRPC request{}", self.describe_metadata(&request));
            self.config.request_level.emit(&msg);
        }

        Ok(request)
    }
}
