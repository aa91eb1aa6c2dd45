// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management
//!
//! Endpoints, credentials and wait settings are read from a YAML file of
//! named contexts and can be overridden from the environment. Nothing is
//! read implicitly: callers resolve a [`CloudContext`] once and pass the
//! pieces they need to clients and waiters.
//!
//! # Environment Variables
//!
//! - `CLOUD_LRO_CONFIG` - Path to the config file (default: `~/.config/cloud-lro/config.yaml`)
//! - `CLOUD_LRO_CONTEXT` - Override the active context
//! - `CLOUD_LRO_ENDPOINT` - Override the endpoint
//! - `CLOUD_LRO_PROJECT` - Override the project
//! - `CLOUD_LRO_ACCESS_TOKEN` - Access token sent as a bearer credential
//!
//! # Example
//!
//! ```no_run
//! use cloud_lro_rs::config::CloudConfig;
//! use cloud_lro_rs::waiter::Waiter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let context = CloudConfig::load_with_env()?.resolve()?;
//! let client = context.rest_client()?;
//! let waiter = Waiter::with_config(context.wait.to_wait_config());
//! # Ok(())
//! # }
//! ```

mod cloudconfig;

pub use cloudconfig::{
    CloudConfig, CloudContext, Transport, WaitSettings, ENV_ACCESS_TOKEN, ENV_CONFIG, ENV_CONTEXT,
    ENV_ENDPOINT, ENV_PROJECT,
};
