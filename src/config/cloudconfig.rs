// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client configuration file parser
//!
//! The file holds named contexts, each describing one API endpoint together
//! with credentials and wait settings:
//!
//! ```yaml
//! context: run-prod
//! contexts:
//!   run-prod:
//!     project: my-project
//!     endpoint: https://run.googleapis.com
//!     transport: rest
//!     api_version: v2
//!     wait:
//!       max_wait_secs: 600
//!       wait_ceiling_secs: 30
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::client::{ClientConfig, GrpcOperationsClient, OperationsService, RestOperationsClient};
use crate::error::{LroError, Result};
use crate::runtime::PollErrorPolicy;
use crate::waiter::WaitConfig;

/// Environment variable for the config file path.
pub const ENV_CONFIG: &str = "CLOUD_LRO_CONFIG";
/// Environment variable overriding the active context.
pub const ENV_CONTEXT: &str = "CLOUD_LRO_CONTEXT";
/// Environment variable overriding the endpoint.
pub const ENV_ENDPOINT: &str = "CLOUD_LRO_ENDPOINT";
/// Environment variable overriding the project.
pub const ENV_PROJECT: &str = "CLOUD_LRO_PROJECT";
/// Environment variable supplying the access token.
pub const ENV_ACCESS_TOKEN: &str = "CLOUD_LRO_ACCESS_TOKEN";

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CloudConfig {
    /// The currently active context name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Map of context names to their configurations
    #[serde(default)]
    pub contexts: HashMap<String, CloudContext>,
}

/// Wire protocol used to reach the operations service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Grpc,
    Rest,
}

/// One API endpoint with credentials and wait settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CloudContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Service root, e.g. `https://run.googleapis.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub transport: Transport,

    /// REST path prefix such as `v1`; unused over gRPC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_project: Option<String>,

    /// PEM bundle to trust instead of the public roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_path: Option<String>,

    #[serde(default)]
    pub wait: WaitSettings,
}

/// Wait tuning as it appears in the file. Unset fields keep the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WaitSettings {
    /// Total budget in seconds; `0` waits without limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_secs: Option<u64>,

    /// Cap on one sleep between polls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_ceiling_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_start_sleep_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_polls: Option<u32>,

    /// Consecutive `NOT_FOUND` answers tolerated; `0` fails on the first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_retries: Option<u32>,
}

impl CloudConfig {
    /// Load configuration from the default location
    /// (`~/.config/cloud-lro/config.yaml`)
    #[allow(clippy::result_large_err)]
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed YAML
    #[allow(clippy::result_large_err)]
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            LroError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load from [`Self::config_path`].
    ///
    /// A missing file at the default location yields an empty configuration
    /// so that environment variables alone are enough. A missing file named
    /// by `CLOUD_LRO_CONFIG` is an error.
    #[allow(clippy::result_large_err)]
    pub fn load_with_env() -> Result<Self> {
        if std::env::var(ENV_CONFIG).is_ok() {
            return Self::load_from_path(Self::config_path()?);
        }

        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from YAML string
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| LroError::Config(format!("Failed to parse config YAML: {}", e)))
    }

    /// Serialize back to YAML.
    #[allow(clippy::result_large_err)]
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LroError::Config(format!("Failed to serialize config YAML: {}", e)))
    }

    /// Get the default config file path
    #[allow(clippy::result_large_err)]
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LroError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".config").join("cloud-lro").join("config.yaml"))
    }

    /// Get the config file path, respecting `CLOUD_LRO_CONFIG`
    #[allow(clippy::result_large_err)]
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var(ENV_CONFIG) {
            Ok(PathBuf::from(env_path))
        } else {
            Self::default_path()
        }
    }

    /// Get the currently active context
    pub fn active_context(&self) -> Option<&CloudContext> {
        self.context
            .as_ref()
            .and_then(|name| self.contexts.get(name))
    }

    pub fn get_context(&self, name: &str) -> Option<&CloudContext> {
        self.contexts.get(name)
    }

    pub fn context_names(&self) -> Vec<&String> {
        self.contexts.keys().collect()
    }

    /// The active context with environment overrides applied.
    #[allow(clippy::result_large_err)]
    pub fn resolve(&self) -> Result<CloudContext> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Like [`Self::resolve`], reading overrides through `env`.
    ///
    /// Without an active context the overrides are applied to an empty one,
    /// so `CLOUD_LRO_ENDPOINT` alone is a usable setup.
    #[allow(clippy::result_large_err)]
    pub fn resolve_with<F>(&self, env: F) -> Result<CloudContext>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = env(ENV_CONTEXT).or_else(|| self.context.clone());
        let mut context = match name {
            Some(name) => self.contexts.get(&name).cloned().ok_or_else(|| {
                LroError::Config(format!("Context [{name}] not found in configuration"))
            })?,
            None => CloudContext::default(),
        };

        if let Some(endpoint) = env(ENV_ENDPOINT) {
            context.endpoint = Some(endpoint);
        }
        if let Some(project) = env(ENV_PROJECT) {
            context.project = Some(project);
        }
        if let Some(token) = env(ENV_ACCESS_TOKEN) {
            context.access_token = Some(token);
        }
        Ok(context)
    }
}

impl CloudContext {
    #[allow(clippy::result_large_err)]
    fn require_endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| LroError::Config("Context has no endpoint".to_string()))
    }

    /// Settings for a [`GrpcOperationsClient`](crate::client::GrpcOperationsClient).
    #[allow(clippy::result_large_err)]
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::new(self.require_endpoint()?);
        config.access_token = self.access_token.clone();
        config.quota_project = self.quota_project.clone();
        config.ca_path = self.ca_path.clone();
        Ok(config)
    }

    /// A REST client for this context.
    #[allow(clippy::result_large_err)]
    pub fn rest_client(&self) -> Result<RestOperationsClient> {
        let mut client = RestOperationsClient::new(
            self.require_endpoint()?,
            self.api_version.as_deref().unwrap_or("v1"),
        )?;
        if let Some(token) = &self.access_token {
            client = client.with_access_token(token);
        }
        if let Some(project) = &self.quota_project {
            client = client.with_quota_project(project);
        }
        Ok(client)
    }

    /// Connect an operations service over the configured transport.
    pub async fn operations_service(&self) -> Result<Arc<dyn OperationsService>> {
        let service: Arc<dyn OperationsService> = match self.transport {
            Transport::Grpc => Arc::new(GrpcOperationsClient::new(self.client_config()?).await?),
            Transport::Rest => Arc::new(self.rest_client()?),
        };
        Ok(service)
    }
}

impl WaitSettings {
    /// Build a [`WaitConfig`], keeping defaults for unset fields.
    #[must_use]
    pub fn to_wait_config(&self) -> WaitConfig {
        let mut builder = WaitConfig::builder();

        match self.max_wait_secs {
            Some(0) => builder = builder.no_max_wait(),
            Some(secs) => builder = builder.max_wait(Duration::from_secs(secs)),
            None => {}
        }
        if let Some(secs) = self.wait_ceiling_secs {
            builder = builder.wait_ceiling(Duration::from_secs(secs));
        }
        if let Some(ms) = self.initial_interval_ms {
            builder = builder.initial_interval(Duration::from_millis(ms));
        }
        if let Some(multiplier) = self.multiplier {
            builder = builder.multiplier(multiplier);
        }
        if let Some(ms) = self.jitter_ms {
            builder = builder.jitter(Duration::from_millis(ms));
        }
        if let Some(secs) = self.pre_start_sleep_secs {
            builder = builder.pre_start_sleep(Duration::from_secs(secs));
        }
        if let Some(max_polls) = self.max_polls {
            builder = builder.max_polls(max_polls);
        }
        match self.not_found_retries {
            Some(0) => builder = builder.poll_errors(PollErrorPolicy::FailFast),
            Some(max_attempts) => {
                builder = builder.poll_errors(PollErrorPolicy::RetryNotFound { max_attempts })
            }
            None => {}
        }

        builder.build()
    }
}
