// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations service clients.
//!
//! [`GrpcOperationsClient`] speaks `google.longrunning.Operations` over
//! gRPC; [`RestOperationsClient`] speaks the HTTP/JSON mapping of the same
//! API. Both implement [`OperationsService`] so any poller works with
//! either transport.

mod rest;
mod service;

pub use rest::RestOperationsClient;
pub use service::{ExtendedOperationService, OperationsService, ResourceGetter};

use crate::api::longrunning::operations_client::OperationsClient;
use crate::api::longrunning::{
    CancelOperationRequest, DeleteOperationRequest, GetOperationRequest,
};
use crate::error::{LroError, Result};
use crate::operation::Operation;
use crate::runtime::{AuthInterceptor, LoggingConfig, LOG_TARGET};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

#[derive(Clone)]
pub struct ClientConfig {
    /// `https://host[:port]`, or `http://` for a plaintext connection.
    pub endpoint: String,
    /// OAuth2 access token sent as a bearer credential.
    pub access_token: Option<String>,
    /// Project billed for the requests (`x-goog-user-project`).
    pub quota_project: Option<String>,
    /// PEM bundle to trust instead of the webpki roots.
    pub ca_path: Option<String>,
    pub connect_timeout: Option<Duration>,
    /// Deadline for each status request.
    pub request_timeout: Option<Duration>,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://127.0.0.1:443".to_string(),
            access_token: None,
            quota_project: None,
            ca_path: None,
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: Some(Duration::from_secs(60)),
            logging: LoggingConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("quota_project", &self.quota_project)
            .field("ca_path", &self.ca_path)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_quota_project(mut self, project: impl Into<String>) -> Self {
        self.quota_project = Some(project.into());
        self
    }

    #[must_use]
    pub fn with_ca_path(mut self, path: impl Into<String>) -> Self {
        self.ca_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

type InnerClient = OperationsClient<InterceptedService<Channel, AuthInterceptor>>;

/// gRPC client for `google.longrunning.Operations`.
#[derive(Clone, Debug)]
pub struct GrpcOperationsClient {
    config: ClientConfig,
    inner: InnerClient,
}

impl GrpcOperationsClient {
    /// Connect to the configured endpoint.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let channel = Self::endpoint(&config)?.connect().await?;
        Ok(Self::from_channel(config, channel))
    }

    /// Build a client whose channel connects on first use.
    pub fn new_lazy(config: ClientConfig) -> Result<Self> {
        let channel = Self::endpoint(&config)?.connect_lazy();
        Ok(Self::from_channel(config, channel))
    }

    /// Wrap an existing channel. Credentials still come from `config`.
    #[must_use]
    pub fn from_channel(config: ClientConfig, channel: Channel) -> Self {
        let interceptor =
            AuthInterceptor::new(config.access_token.clone(), config.quota_project.clone())
                .with_config(config.logging.clone());
        let inner = OperationsClient::with_interceptor(channel, interceptor);
        Self { config, inner }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(config: &ClientConfig) -> Result<Endpoint> {
        let mut endpoint = Endpoint::from_shared(config.endpoint.clone()).map_err(|e| {
            LroError::Config(format!("Invalid endpoint [{}]: {e}", config.endpoint))
        })?;

        if let Some(timeout) = config.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        if config.endpoint.starts_with("http://") {
            return Ok(endpoint);
        }

        let tls = match &config.ca_path {
            Some(ca_path) => {
                let pem = std::fs::read(ca_path)
                    .map_err(|e| LroError::Config(format!("Failed to read CA cert: {e}")))?;
                ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem))
            }
            None => ClientTlsConfig::new().with_webpki_roots(),
        };
        Ok(endpoint.tls_config(tls)?)
    }
}

#[async_trait]
impl OperationsService for GrpcOperationsClient {
    async fn get_operation(&self, name: &str) -> Result<Operation> {
        tracing::trace!(target: LOG_TARGET, operation = %name, "GetOperation");
        let mut client = self.inner.clone();
        let response = client
            .get_operation(GetOperationRequest {
                name: name.to_string(),
            })
            .await?;
        Ok(response.into_inner().into())
    }

    async fn cancel_operation(&self, name: &str) -> Result<()> {
        tracing::debug!(target: LOG_TARGET, operation = %name, "CancelOperation");
        let mut client = self.inner.clone();
        client
            .cancel_operation(CancelOperationRequest {
                name: name.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn delete_operation(&self, name: &str) -> Result<()> {
        tracing::debug!(target: LOG_TARGET, operation = %name, "DeleteOperation");
        let mut client = self.inner.clone();
        client
            .delete_operation(DeleteOperationRequest {
                name: name.to_string(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
