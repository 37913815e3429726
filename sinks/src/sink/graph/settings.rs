//! Graph sink settings
//!
//! Each setting resolves as: config field, then environment variable, then
//! built-in default.

use crate::config::GraphConfig;
use crate::error::SinkError;
use crate::gremlin::GremlinOptions;
use std::env;
use std::time::Duration;

/// Endpoint fallback variable
pub const ENDPOINT_ENV: &str = "KW_GRAPH_ENDPOINT";
/// Region fallback variable
pub const REGION_ENV: &str = "KW_GRAPH_REGION";

pub const DEFAULT_TRAVERSAL_SOURCE: &str = "g";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const MISSING_ENDPOINT: &str = "Missing Neptune endpoint";
pub const MISSING_REGION: &str = "Missing AWS region";

/// Fully resolved graph sink settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSettings {
    pub endpoint: String,
    pub region: String,
    pub traversal_source: String,
    pub timeout: Duration,
    pub tls_skip: bool,
}

impl GraphSettings {
    /// Resolve against the process environment
    pub fn resolve(config: &GraphConfig) -> Self {
        Self::resolve_with(config, |key| env::var(key).ok())
    }

    /// Resolve with a custom environment lookup
    pub fn resolve_with<F>(config: &GraphConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |value: &str, key: &str| {
            if value.is_empty() {
                lookup(key).unwrap_or_default()
            } else {
                value.to_string()
            }
        };

        let traversal_source = if config.traversal_source.is_empty() {
            DEFAULT_TRAVERSAL_SOURCE.to_string()
        } else {
            config.traversal_source.clone()
        };

        let timeout_secs = match config.timeout {
            0 => DEFAULT_TIMEOUT_SECS,
            secs => secs,
        };

        Self {
            endpoint: from_env(&config.endpoint, ENDPOINT_ENV),
            region: from_env(&config.region, REGION_ENV),
            traversal_source,
            timeout: Duration::from_secs(timeout_secs),
            tls_skip: config.tls_skip,
        }
    }

    /// Check required settings; endpoint is checked before region
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.endpoint.is_empty() {
            return Err(setup_error(MISSING_ENDPOINT));
        }
        if self.region.is_empty() {
            return Err(setup_error(MISSING_REGION));
        }
        Ok(())
    }

    /// Options for the wire client
    pub fn gremlin_options(&self) -> GremlinOptions {
        GremlinOptions {
            endpoint: self.endpoint.clone(),
            traversal_source: self.traversal_source.clone(),
            timeout: self.timeout,
            tls_skip: self.tls_skip,
        }
    }
}

fn setup_error(problem: &str) -> SinkError {
    SinkError::Config(format!(
        "{problem}\n\n\
         The graph sink needs a Neptune endpoint and an AWS region.\n\
         Set them in the environment:\n\n\
         \texport {ENDPOINT_ENV}=wss://your-cluster.region.neptune.amazonaws.com:8182/gremlin\n\
         \texport {REGION_ENV}=us-east-1\n\n\
         or under handler.graph in the kubewatch config file."
    ))
}
