//! Run configuration.
//!
//! Validated at load time with clear error messages. A run is fully described
//! by worker count, behavior, duration, naming policy and client sharing.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};
use crate::worker::WorkerBehavior;

/// How resource and configuration names are assigned to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NamingPolicy {
    /// Every worker owns its resource and a configuration of the same name.
    #[default]
    Distinct,
    /// Distinct resources, one configuration shared by all workers.
    SharedConfig,
}

/// How client handles are supplied to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClientSharing {
    /// Each worker gets its own handle.
    #[default]
    PerWorker,
    /// One handle is shared by all workers.
    Shared,
}

/// Configuration for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-iteration behavior of every worker.
    #[serde(default)]
    pub behavior: WorkerBehavior,

    /// How long workers keep starting new iterations.
    #[serde(default = "default_duration")]
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Resource/configuration naming policy.
    #[serde(default)]
    pub naming: NamingPolicy,

    /// Client handle supply strategy.
    #[serde(default)]
    pub clients: ClientSharing,

    /// Prefix for resource names; worker `i` targets `<prefix><i>`.
    #[serde(default = "default_resource_prefix")]
    pub resource_prefix: String,

    /// Configuration name used under [`NamingPolicy::SharedConfig`].
    #[serde(default = "default_config_name")]
    pub config_name: String,

    /// Query expression issued by observing workers.
    #[serde(default = "default_query")]
    pub query: String,
}

fn default_workers() -> usize {
    10
}

fn default_duration() -> Duration {
    Duration::from_secs(30)
}

fn default_resource_prefix() -> String {
    "collection".to_string()
}

fn default_config_name() -> String {
    "testconfig".to_string()
}

fn default_query() -> String {
    "*".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            behavior: WorkerBehavior::default(),
            duration: default_duration(),
            naming: NamingPolicy::default(),
            clients: ClientSharing::default(),
            resource_prefix: default_resource_prefix(),
            config_name: default_config_name(),
            query: default_query(),
        }
    }
}

impl RunConfig {
    /// Ten observing workers, each with its own resource, configuration and
    /// client, for thirty seconds.
    #[must_use]
    pub fn distinct_observing() -> Self {
        Self::default()
    }

    /// Two basic workers with distinct resources racing over one shared
    /// configuration through one shared client, for thirty seconds.
    #[must_use]
    pub fn shared_config() -> Self {
        Self {
            workers: 2,
            behavior: WorkerBehavior::Basic,
            naming: NamingPolicy::SharedConfig,
            clients: ClientSharing::Shared,
            ..Default::default()
        }
    }

    /// Small, short run for tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            workers: 4,
            duration: Duration::from_millis(500),
            ..Default::default()
        }
    }

    /// Sets the worker count.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the run duration.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the worker behavior.
    #[must_use]
    pub const fn with_behavior(mut self, behavior: WorkerBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Sets the naming policy.
    #[must_use]
    pub const fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    /// Sets the client sharing strategy.
    #[must_use]
    pub const fn with_clients(mut self, clients: ClientSharing) -> Self {
        self.clients = clients;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ChurnError::config("workers must be greater than 0"));
        }
        if self.duration.is_zero() {
            return Err(ChurnError::config("duration must be greater than 0"));
        }
        validate_name("resource_prefix", &self.resource_prefix)?;
        if self.naming == NamingPolicy::SharedConfig {
            validate_name("config_name", &self.config_name)?;
        }
        if self.query.trim().is_empty() {
            return Err(ChurnError::config("query cannot be empty"));
        }
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ChurnError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed or is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ChurnError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ChurnError::config(format!("{field} cannot be empty")));
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ChurnError::config(format!(
            "{field} must contain only alphanumeric characters, hyphens, and underscores"
        )));
    }
    Ok(())
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
