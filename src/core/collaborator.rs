//! Traits for the cluster-facing collaborators the engine consumes.
//!
//! Discovery, caching and deletion are not implemented by the engine itself. Each
//! backend (the in-memory cluster, the Kubernetes client) supplies these.

use async_trait::async_trait;

use crate::core::{ChurnResult, LabelSelector, ObjectRef, ResourceTypeId};

/// Maps a short resource name (`pods`, `ingresses.extensions`) to a resource type.
pub trait Discovery: Send + Sync {
    /// Resolve `name`, failing with [`ChurnError::Resolution`](crate::core::ChurnError)
    /// when it is unknown or matches more than one type.
    fn resolve(&self, name: &str) -> ChurnResult<ResourceTypeId>;
}

/// Local mirror of the live objects of one resource type, filtered by a selector.
pub trait ResourceCache: Send + Sync {
    /// Whether the initial listing has completed.
    fn has_synced(&self) -> bool;

    /// Snapshot of the objects currently known to the cache.
    fn list(&self) -> ChurnResult<Vec<ObjectRef>>;

    /// Release the underlying subscription. Safe to call more than once.
    fn stop(&mut self);
}

/// Issues mutations against the cluster.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Delete one object of the given type.
    async fn delete(&self, resource: &ResourceTypeId, namespace: &str, name: &str)
        -> ChurnResult<()>;
}

/// Opens the per-task handles a churn task owns exclusively.
pub trait Connector: Send + Sync {
    /// Subscribe to objects of `resource` matching `selector`.
    fn open_cache(
        &self,
        resource: &ResourceTypeId,
        selector: &LabelSelector,
    ) -> ChurnResult<Box<dyn ResourceCache>>;

    /// Open a client handle used to issue deletes.
    fn open_store(&self) -> ChurnResult<Box<dyn RemoteStore>>;
}
