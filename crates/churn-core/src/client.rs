//! The admin client seam.
//!
//! The harness never talks to a service directly. Everything it issues goes
//! through [`AdminClient`], which a real deployment backs with a network client
//! and tests back with an in-memory cluster.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Result type for a single client call.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Shard/replica layout requested on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceShape {
    /// Number of shards.
    pub shards: u32,
    /// Replicas per shard.
    pub replication_factor: u32,
}

impl ResourceShape {
    /// Single shard, replication factor one.
    pub const MINIMAL: Self = Self {
        shards: 1,
        replication_factor: 1,
    };
}

impl Default for ResourceShape {
    fn default() -> Self {
        Self::MINIMAL
    }
}

/// Response to a create or delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminResponse {
    /// Status code; zero means success.
    pub status: i32,
}

impl AdminResponse {
    /// A successful response.
    pub const OK: Self = Self { status: 0 };

    /// Creates a response with the given status.
    #[must_use]
    pub const fn with_status(status: i32) -> Self {
        Self { status }
    }

    /// Returns true if the status is zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Response to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Number of matching documents.
    pub num_found: u64,
}

/// Capability surface the harness needs from a resource-management service.
///
/// Implementations must be safe to share between workers: when a run is
/// configured with a shared client, every worker calls the same instance
/// concurrently.
#[async_trait]
pub trait AdminClient: Send + Sync {
    /// Uploads a configuration directory under the given name.
    ///
    /// # Errors
    /// Returns an error if the upload fails.
    async fn upload_configuration(&self, config_dir: &Path, config_name: &str)
    -> ClientResult<()>;

    /// Creates a resource from a configuration.
    ///
    /// # Errors
    /// Returns an error if the request could not be completed. A completed
    /// request with a non-zero status is reported through the response.
    async fn create_resource(
        &self,
        name: &str,
        config_name: &str,
        shape: ResourceShape,
    ) -> ClientResult<AdminResponse>;

    /// Deletes a resource.
    ///
    /// # Errors
    /// Returns an error if the request could not be completed.
    async fn delete_resource(&self, name: &str) -> ClientResult<AdminResponse>;

    /// Runs a read-only query against a resource.
    ///
    /// # Errors
    /// Returns an error if the query fails, including when the resource does
    /// not exist.
    async fn query(&self, name: &str, query: &str) -> ClientResult<QueryResponse>;

    /// Releases the client's connections.
    ///
    /// # Errors
    /// Returns an error if the client could not be closed cleanly.
    async fn close(&self) -> ClientResult<()> {
        Ok(())
    }
}

/// Shared handle to an admin client.
pub type ClientHandle = Arc<dyn AdminClient>;

/// Produces client handles for a run.
///
/// The orchestrator calls [`connect`](Self::connect) once for a shared-client
/// run, or once per worker otherwise.
pub trait ClientFactory: Send + Sync {
    /// Opens a new client handle.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    fn connect(&self) -> ClientResult<ClientHandle>;
}

impl<F> ClientFactory for F
where
    F: Fn() -> ClientResult<ClientHandle> + Send + Sync,
{
    fn connect(&self) -> ClientResult<ClientHandle> {
        self()
    }
}
