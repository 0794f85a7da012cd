//! In-memory resource service.
//!
//! Behaves like a small collection-management cluster: configurations are
//! uploaded by name, resources are created from an uploaded configuration and
//! deleted by name, and queries against a missing resource report not-found.
//! Every call sleeps for a fixed latency so that workers interleave, and a
//! [`FaultPlan`] can override individual calls.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use churn_core::{
    AdminClient, AdminResponse, ClientError, ClientFactory, ClientHandle, ClientResult,
    Operation, QueryResponse, ResourceShape,
};
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use crate::fault::{Fault, FaultInjector, FaultPlan};

/// Latency applied to every call unless configured otherwise.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(10);

/// Outcome of a logged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Completed with status zero.
    Ok,
    /// Completed with a non-zero status.
    Status(i32),
    /// Raised an error.
    Error(String),
}

/// One entry of the cluster's call log.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// When the call was issued.
    pub at: Instant,
    /// Resource the call targeted.
    pub resource: String,
    /// Operation performed.
    pub op: Operation,
    /// How the call ended.
    pub outcome: CallOutcome,
}

#[derive(Debug)]
struct Resource {
    config_name: String,
    shape: ResourceShape,
}

struct ClusterState {
    latency: Duration,
    faults: FaultInjector,
    configs: RwLock<HashMap<String, PathBuf>>,
    resources: Mutex<HashMap<String, Resource>>,
    config_lookups: Mutex<HashMap<String, u64>>,
    log: Mutex<Vec<CallRecord>>,
    connections: AtomicU64,
    closes: AtomicU64,
}

/// Shared in-memory cluster.
///
/// Cloning yields another reference to the same cluster.
#[derive(Clone)]
pub struct InMemoryCluster {
    state: Arc<ClusterState>,
}

impl InMemoryCluster {
    /// Creates a cluster with the given per-call latency and fault plan.
    #[must_use]
    pub fn new(latency: Duration, faults: FaultPlan) -> Self {
        Self {
            state: Arc::new(ClusterState {
                latency,
                faults: FaultInjector::new(faults),
                configs: RwLock::new(HashMap::new()),
                resources: Mutex::new(HashMap::new()),
                config_lookups: Mutex::new(HashMap::new()),
                log: Mutex::new(Vec::new()),
                connections: AtomicU64::new(0),
                closes: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a cluster with default latency and the given faults.
    #[must_use]
    pub fn with_faults(faults: FaultPlan) -> Self {
        Self::new(DEFAULT_LATENCY, faults)
    }

    /// Opens a new client connection.
    #[must_use]
    pub fn client(&self) -> ClientHandle {
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        Arc::new(ClusterClient {
            cluster: self.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// A factory that opens a new connection per call.
    #[must_use]
    pub fn factory(&self) -> ClusterFactory {
        ClusterFactory {
            cluster: self.clone(),
        }
    }

    /// Per-call latency.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.state.latency
    }

    /// Number of connections opened.
    #[must_use]
    pub fn connections(&self) -> u64 {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Number of connections closed.
    #[must_use]
    pub fn closes(&self) -> u64 {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Returns true if a configuration with this name has been uploaded.
    #[must_use]
    pub fn has_configuration(&self, name: &str) -> bool {
        self.state.configs.read().contains_key(name)
    }

    /// Names of every uploaded configuration.
    #[must_use]
    pub fn configurations(&self) -> HashSet<String> {
        self.state.configs.read().keys().cloned().collect()
    }

    /// Number of times a create resolved the named configuration.
    #[must_use]
    pub fn config_lookups(&self, name: &str) -> u64 {
        self.state
            .config_lookups
            .lock()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Returns true if the resource currently exists.
    #[must_use]
    pub fn resource_exists(&self, name: &str) -> bool {
        self.state.resources.lock().contains_key(name)
    }

    /// Names of every existing resource, sorted.
    #[must_use]
    pub fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.resources.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of the call log in completion order.
    #[must_use]
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.log.lock().clone()
    }

    /// Number of calls issued for a resource and operation.
    #[must_use]
    pub fn call_count(&self, resource: &str, op: Operation) -> u64 {
        self.state.faults.calls(resource, op)
    }

    /// Number of faults injected so far.
    #[must_use]
    pub fn injected_faults(&self) -> u64 {
        self.state.faults.injected()
    }

    fn log(&self, at: Instant, resource: &str, op: Operation, outcome: CallOutcome) {
        self.state.log.lock().push(CallRecord {
            at,
            resource: resource.to_string(),
            op,
            outcome,
        });
    }

    /// Sleeps the base latency, then any injected delay.
    ///
    /// Returns the fault that overrides the call, if one applies.
    async fn enter(&self, resource: &str, op: Operation) -> Option<Fault> {
        let fault = self.state.faults.on_call(resource, op);
        tokio::time::sleep(self.state.latency).await;
        match fault {
            Some(Fault::Delay(extra)) => {
                tokio::time::sleep(extra).await;
                None
            }
            other => other,
        }
    }

    fn create(&self, name: &str, config_name: &str, shape: ResourceShape) -> ClientResult<()> {
        if !self.has_configuration(config_name) {
            return Err(ClientError::server(
                400,
                format!("Can not find the specified config set: {config_name}"),
            ));
        }
        *self
            .state
            .config_lookups
            .lock()
            .entry(config_name.to_string())
            .or_insert(0) += 1;

        let mut resources = self.state.resources.lock();
        if resources.contains_key(name) {
            return Err(ClientError::server(
                400,
                format!("collection already exists: {name}"),
            ));
        }
        resources.insert(
            name.to_string(),
            Resource {
                config_name: config_name.to_string(),
                shape,
            },
        );
        Ok(())
    }

    fn delete(&self, name: &str) -> ClientResult<()> {
        match self.state.resources.lock().remove(name) {
            Some(resource) => {
                tracing::trace!(
                    resource = name,
                    config = %resource.config_name,
                    shards = resource.shape.shards,
                    "resource removed"
                );
                Ok(())
            }
            None => Err(ClientError::server(
                400,
                format!("Could not find collection : {name}"),
            )),
        }
    }

    fn query(&self, name: &str) -> ClientResult<QueryResponse> {
        if self.state.resources.lock().contains_key(name) {
            Ok(QueryResponse::default())
        } else {
            Err(ClientError::not_found(
                name,
                format!("Collection not found: {name}"),
            ))
        }
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY, FaultPlan::none())
    }
}

impl std::fmt::Debug for InMemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCluster")
            .field("latency", &self.state.latency)
            .field("configurations", &self.state.configs.read().len())
            .field("resources", &self.state.resources.lock().len())
            .field("connections", &self.connections())
            .finish_non_exhaustive()
    }
}

/// Opens a fresh [`InMemoryCluster`] connection per call.
#[derive(Debug, Clone)]
pub struct ClusterFactory {
    cluster: InMemoryCluster,
}

impl ClientFactory for ClusterFactory {
    fn connect(&self) -> ClientResult<ClientHandle> {
        Ok(self.cluster.client())
    }
}

/// A connection to an [`InMemoryCluster`].
struct ClusterClient {
    cluster: InMemoryCluster,
    closed: AtomicBool,
}

impl ClusterClient {
    fn check_open(&self) -> ClientResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ClientError::transport("connection closed"))
        } else {
            Ok(())
        }
    }
}

fn outcome<T>(result: &ClientResult<T>) -> CallOutcome {
    match result {
        Ok(_) => CallOutcome::Ok,
        Err(e) => CallOutcome::Error(e.to_string()),
    }
}

#[async_trait]
impl AdminClient for ClusterClient {
    async fn upload_configuration(
        &self,
        config_dir: &Path,
        config_name: &str,
    ) -> ClientResult<()> {
        self.check_open()?;
        tokio::time::sleep(self.cluster.latency()).await;
        self.cluster
            .state
            .configs
            .write()
            .insert(config_name.to_string(), config_dir.to_path_buf());
        tracing::debug!(config = config_name, "configuration stored");
        Ok(())
    }

    async fn create_resource(
        &self,
        name: &str,
        config_name: &str,
        shape: ResourceShape,
    ) -> ClientResult<AdminResponse> {
        self.check_open()?;
        let at = Instant::now();
        let result = match self.cluster.enter(name, Operation::Create).await {
            Some(Fault::Status(status)) => Ok(AdminResponse::with_status(status)),
            Some(Fault::Error(e)) => Err(e),
            _ => self
                .cluster
                .create(name, config_name, shape)
                .map(|()| AdminResponse::OK),
        };
        let logged = match &result {
            Ok(response) if !response.is_success() => CallOutcome::Status(response.status),
            other => outcome(other),
        };
        self.cluster.log(at, name, Operation::Create, logged);
        result
    }

    async fn delete_resource(&self, name: &str) -> ClientResult<AdminResponse> {
        self.check_open()?;
        let at = Instant::now();
        let result = match self.cluster.enter(name, Operation::Delete).await {
            Some(Fault::Status(status)) => Ok(AdminResponse::with_status(status)),
            Some(Fault::Error(e)) => Err(e),
            _ => self.cluster.delete(name).map(|()| AdminResponse::OK),
        };
        let logged = match &result {
            Ok(response) if !response.is_success() => CallOutcome::Status(response.status),
            other => outcome(other),
        };
        self.cluster.log(at, name, Operation::Delete, logged);
        result
    }

    async fn query(&self, name: &str, _query: &str) -> ClientResult<QueryResponse> {
        self.check_open()?;
        let at = Instant::now();
        let result = match self.cluster.enter(name, Operation::Query).await {
            Some(Fault::Status(status)) => Err(ClientError::server(
                500,
                format!("query completed with status {status}"),
            )),
            Some(Fault::Error(e)) => Err(e),
            _ => self.cluster.query(name),
        };
        self.cluster.log(at, name, Operation::Query, outcome(&result));
        result
    }

    async fn close(&self) -> ClientResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cluster.state.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
