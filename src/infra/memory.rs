//! In-memory cluster backend for development, dry runs and testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{
    ChurnError, ChurnResult, Connector, Discovery, LabelSelector, ObjectRef, RemoteStore,
    ResourceCache, ResourceTypeId,
};

/// A delete that reached the in-memory cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRecord {
    /// Resource type of the deleted object.
    pub resource: ResourceTypeId,
    /// Namespace of the deleted object.
    pub namespace: String,
    /// Name of the deleted object.
    pub name: String,
}

#[derive(Debug, Clone)]
struct RegisteredType {
    id: ResourceTypeId,
    kind: String,
    short_names: Vec<String>,
}

impl RegisteredType {
    fn answers_to(&self, name: &str) -> bool {
        self.id.resource == name
            || self.kind.to_lowercase() == name
            || self.short_names.iter().any(|s| s == name)
    }
}

#[derive(Debug, Default)]
struct ClusterState {
    types: Vec<RegisteredType>,
    objects: HashMap<ResourceTypeId, Vec<ObjectRef>>,
    unsynced: HashSet<ResourceTypeId>,
    failing_lists: HashSet<ResourceTypeId>,
    delete_budget: Option<usize>,
    deletes: Vec<DeleteRecord>,
    open_caches: usize,
}

/// Shared object table that acts as discovery, cache source and delete target.
///
/// Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl InMemoryCluster {
    /// Empty cluster with no resource types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster serving the built-in types plus Contour's `HTTPProxy`.
    pub fn with_default_types() -> Self {
        Self::new()
            .with_type(ResourceTypeId::new("", "v1", "pods"), "Pod", &["po"])
            .with_type(ResourceTypeId::new("", "v1", "services"), "Service", &["svc"])
            .with_type(ResourceTypeId::new("", "v1", "configmaps"), "ConfigMap", &["cm"])
            .with_type(ResourceTypeId::new("", "v1", "secrets"), "Secret", &[])
            .with_type(ResourceTypeId::new("apps", "v1", "deployments"), "Deployment", &["deploy"])
            .with_type(
                ResourceTypeId::new("extensions", "v1beta1", "ingresses"),
                "Ingress",
                &["ing"],
            )
            .with_type(
                ResourceTypeId::new("networking.k8s.io", "v1", "ingresses"),
                "Ingress",
                &["ing"],
            )
            .with_type(
                ResourceTypeId::new("projectcontour.io", "v1", "httpproxies"),
                "HTTPProxy",
                &["proxy", "proxies"],
            )
    }

    /// Register a resource type for discovery.
    #[must_use]
    pub fn with_type(self, id: ResourceTypeId, kind: &str, short_names: &[&str]) -> Self {
        self.state.lock().types.push(RegisteredType {
            id,
            kind: kind.to_string(),
            short_names: short_names.iter().map(|s| (*s).to_string()).collect(),
        });
        self
    }

    /// Add an object.
    pub fn insert(&self, resource: &ResourceTypeId, object: ObjectRef) {
        self.state
            .lock()
            .objects
            .entry(resource.clone())
            .or_default()
            .push(object);
    }

    /// Insert `per_type` objects matching `selector` into namespace `namespace` for every
    /// registered type. Names are `<kind>-<n>`, lowercased.
    pub fn populate(&self, namespace: &str, per_type: usize, selector: &LabelSelector) {
        let mut state = self.state.lock();
        let types = state.types.clone();
        for registered in types {
            let kind = registered.kind.to_lowercase();
            let objects = state.objects.entry(registered.id).or_default();
            for n in 0..per_type {
                let object = selector.requirements().fold(
                    ObjectRef::new(namespace, format!("{kind}-{n}"), &registered.kind),
                    |object, (key, value)| object.with_label(key, value),
                );
                objects.push(object);
            }
        }
    }

    /// Objects currently stored for a resource type.
    pub fn objects(&self, resource: &ResourceTypeId) -> Vec<ObjectRef> {
        self.state
            .lock()
            .objects
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Make caches of `resource` report that they have not synced.
    pub fn mark_unsynced(&self, resource: &ResourceTypeId) {
        self.state.lock().unsynced.insert(resource.clone());
    }

    /// Make caches of `resource` report that they have synced.
    pub fn mark_synced(&self, resource: &ResourceTypeId) {
        self.state.lock().unsynced.remove(resource);
    }

    /// Make listing `resource` fail.
    pub fn fail_lists(&self, resource: &ResourceTypeId) {
        self.state.lock().failing_lists.insert(resource.clone());
    }

    /// Let `successes` more deletes succeed, then fail every later delete.
    pub fn fail_deletes_after(&self, successes: usize) {
        self.state.lock().delete_budget = Some(successes);
    }

    /// Every successful delete, in order.
    pub fn deletes(&self) -> Vec<DeleteRecord> {
        self.state.lock().deletes.clone()
    }

    /// Number of caches opened and not yet stopped.
    pub fn open_caches(&self) -> usize {
        self.state.lock().open_caches
    }

    fn kind_of(&self, resource: &ResourceTypeId) -> Option<String> {
        self.state
            .lock()
            .types
            .iter()
            .find(|t| &t.id == resource)
            .map(|t| t.kind.clone())
    }
}

impl Discovery for InMemoryCluster {
    fn resolve(&self, name: &str) -> ChurnResult<ResourceTypeId> {
        let lowered = name.to_lowercase();
        let (resource, group) = match lowered.split_once('.') {
            Some((resource, group)) => (resource, Some(group)),
            None => (lowered.as_str(), None),
        };

        let state = self.state.lock();
        let mut matches: Vec<&ResourceTypeId> = state
            .types
            .iter()
            .filter(|t| t.answers_to(resource))
            .filter(|t| group.is_none_or(|g| t.id.group == g))
            .map(|t| &t.id)
            .collect();
        matches.dedup();

        match matches.as_slice() {
            [] => Err(ChurnError::Resolution(format!("unknown resource: {name}"))),
            [only] => Ok((*only).clone()),
            many => {
                let names: Vec<String> = many.iter().map(ToString::to_string).collect();
                Err(ChurnError::Resolution(format!(
                    "ambiguous resource {name}: matches {}",
                    names.join(", ")
                )))
            }
        }
    }
}

impl Connector for InMemoryCluster {
    fn open_cache(
        &self,
        resource: &ResourceTypeId,
        selector: &LabelSelector,
    ) -> ChurnResult<Box<dyn ResourceCache>> {
        if self.kind_of(resource).is_none() {
            return Err(ChurnError::Resolution(format!(
                "resource type not served: {resource}"
            )));
        }
        self.state.lock().open_caches += 1;
        Ok(Box::new(MemoryCache {
            cluster: self.clone(),
            resource: resource.clone(),
            selector: selector.clone(),
            stopped: false,
        }))
    }

    fn open_store(&self) -> ChurnResult<Box<dyn RemoteStore>> {
        Ok(Box::new(MemoryStore {
            cluster: self.clone(),
        }))
    }
}

struct MemoryCache {
    cluster: InMemoryCluster,
    resource: ResourceTypeId,
    selector: LabelSelector,
    stopped: bool,
}

impl ResourceCache for MemoryCache {
    fn has_synced(&self) -> bool {
        !self.stopped && !self.cluster.state.lock().unsynced.contains(&self.resource)
    }

    fn list(&self) -> ChurnResult<Vec<ObjectRef>> {
        if self.stopped {
            return Err(ChurnError::Runtime(format!(
                "cache for {} has been stopped",
                self.resource
            )));
        }
        let state = self.cluster.state.lock();
        if state.failing_lists.contains(&self.resource) {
            return Err(ChurnError::Runtime(format!("failed to list {}", self.resource)));
        }
        Ok(state
            .objects
            .get(&self.resource)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| self.selector.matches(&o.labels))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.cluster.state.lock().open_caches -= 1;
        }
    }
}

struct MemoryStore {
    cluster: InMemoryCluster,
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn delete(
        &self,
        resource: &ResourceTypeId,
        namespace: &str,
        name: &str,
    ) -> ChurnResult<()> {
        let mut state = self.cluster.state.lock();
        if let Some(remaining) = state.delete_budget.as_mut() {
            if *remaining == 0 {
                return Err(ChurnError::Runtime(format!(
                    "failed to delete {resource} {namespace}/{name}: injected failure"
                )));
            }
            *remaining -= 1;
        }

        let objects = state.objects.entry(resource.clone()).or_default();
        let position = objects
            .iter()
            .position(|o| o.namespace == namespace && o.name == name)
            .ok_or_else(|| {
                ChurnError::Runtime(format!("{resource} {namespace}/{name} not found"))
            })?;
        objects.remove(position);
        state.deletes.push(DeleteRecord {
            resource: resource.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }
}
