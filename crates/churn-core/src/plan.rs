//! Resolved worker assignments for a run.

use serde::{Deserialize, Serialize};

use crate::config::{NamingPolicy, RunConfig};

/// Names bound to one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Worker label, used in logs and recorded errors.
    pub label: String,
    /// Resource this worker creates and deletes.
    pub resource: String,
    /// Configuration the resource is created from.
    pub config_name: String,
}

/// The set of workers a run will start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    workers: Vec<WorkerSpec>,
}

impl RunPlan {
    /// Resolves worker names from a configuration.
    ///
    /// Worker `i` always targets `<prefix><i>`. Under
    /// [`NamingPolicy::Distinct`] its configuration carries the same name;
    /// under [`NamingPolicy::SharedConfig`] every worker uses
    /// `config.config_name`.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        let workers = (0..config.workers)
            .map(|i| {
                let resource = format!("{}{i}", config.resource_prefix);
                let config_name = match config.naming {
                    NamingPolicy::Distinct => resource.clone(),
                    NamingPolicy::SharedConfig => config.config_name.clone(),
                };
                WorkerSpec {
                    label: format!("{}-{i}", config.behavior.label_prefix()),
                    resource,
                    config_name,
                }
            })
            .collect();
        Self { workers }
    }

    /// Builds a plan from explicit worker specs.
    #[must_use]
    pub const fn from_specs(workers: Vec<WorkerSpec>) -> Self {
        Self { workers }
    }

    /// Returns the worker specs in start order.
    #[must_use]
    pub fn workers(&self) -> &[WorkerSpec] {
        &self.workers
    }

    /// Number of workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns true if the plan starts no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Distinct configuration names referenced by the plan, in first-use order.
    #[must_use]
    pub fn config_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for spec in &self.workers {
            if !names.contains(&spec.config_name.as_str()) {
                names.push(&spec.config_name);
            }
        }
        names
    }

    /// Returns true if no two workers target the same resource.
    #[must_use]
    pub fn resources_are_exclusive(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.workers.iter().all(|spec| seen.insert(&spec.resource))
    }
}
