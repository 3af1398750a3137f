//! Kubernetes backend: API discovery, reflector caches and dynamic deletes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{Api, DeleteParams, DynamicObject};
use kube::discovery::ApiResource;
use kube::runtime::reflector::{self, store::Writer, Store};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::{
    ChurnError, ChurnResult, Connector, Discovery, LabelSelector, ObjectRef, RemoteStore,
    ResourceCache, ResourceTypeId,
};

fn resource_type_id(resource: &ApiResource) -> ResourceTypeId {
    ResourceTypeId::new(&resource.group, &resource.version, &resource.plural)
}

/// Short names keyed by `(group, plural)`.
type ShortNames = HashMap<(String, String), Vec<String>>;

/// Whether `name` (lowercased, group stripped) refers to `resource` by plural, kind or short name.
fn answers_to(resource: &ApiResource, short_names: &ShortNames, name: &str) -> bool {
    resource.plural == name
        || resource.kind.to_lowercase() == name
        || short_names
            .get(&(resource.group.clone(), resource.plural.clone()))
            .is_some_and(|names| names.iter().any(|n| n == name))
}

/// Short names of the preferred version of every group.
///
/// `kube::Discovery` drops them, so they come from the raw resource lists. A group
/// whose list cannot be fetched contributes none.
async fn fetch_short_names(client: &Client) -> ChurnResult<ShortNames> {
    let mut lists = vec![client
        .list_core_api_resources("v1")
        .await
        .map_err(|e| ChurnError::Runtime(format!("failed to list core resources: {e}")))?];
    let groups = client
        .list_api_groups()
        .await
        .map_err(|e| ChurnError::Runtime(format!("failed to list api groups: {e}")))?;
    for group in groups.groups {
        let Some(preferred) = group.preferred_version else {
            continue;
        };
        match client.list_api_group_resources(&preferred.group_version).await {
            Ok(list) => lists.push(list),
            Err(err) => warn!(group = %preferred.group_version, %err, "skipping short names"),
        }
    }

    let mut short_names = ShortNames::new();
    for list in lists {
        let group = list
            .group_version
            .split_once('/')
            .map_or("", |(group, _)| group)
            .to_string();
        for resource in list.resources {
            if let Some(names) = resource.short_names.filter(|names| !names.is_empty()) {
                short_names.insert((group.clone(), resource.name), names);
            }
        }
    }
    Ok(short_names)
}

/// Connection to a live cluster plus a snapshot of the resource types it serves.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    /// Preferred version of every resource, used for name resolution.
    preferred: Vec<ApiResource>,
    /// Every served group/version/resource.
    served: Arc<HashMap<ResourceTypeId, ApiResource>>,
    short_names: Arc<ShortNames>,
}

impl KubeCluster {
    /// Connect with the default kubeconfig or in-cluster configuration and run discovery.
    pub async fn connect() -> ChurnResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ChurnError::Runtime(format!("failed to build client config: {e}")))?;
        let discovery = kube::Discovery::new(client.clone())
            .run()
            .await
            .map_err(|e| ChurnError::Runtime(format!("failed to discover resources: {e}")))?;

        let mut preferred = Vec::new();
        let mut served = HashMap::new();
        for group in discovery.groups() {
            for (resource, _caps) in group.recommended_resources() {
                preferred.push(resource);
            }
            for version in group.versions() {
                for (resource, _caps) in group.versioned_resources(version) {
                    served.insert(resource_type_id(&resource), resource);
                }
            }
        }
        let short_names = fetch_short_names(&client).await?;
        debug!(
            types = served.len(),
            short_names = short_names.len(),
            "discovered resource types"
        );

        Ok(Self {
            client,
            preferred,
            served: Arc::new(served),
            short_names: Arc::new(short_names),
        })
    }
}

impl Discovery for KubeCluster {
    fn resolve(&self, name: &str) -> ChurnResult<ResourceTypeId> {
        let lowered = name.to_lowercase();
        let (plural, group) = match lowered.split_once('.') {
            Some((plural, group)) => (plural, Some(group)),
            None => (lowered.as_str(), None),
        };

        let mut matches: Vec<ResourceTypeId> = self
            .preferred
            .iter()
            .filter(|r| answers_to(r, &self.short_names, plural))
            .filter(|r| group.is_none_or(|g| r.group == g))
            .map(resource_type_id)
            .collect();
        matches.sort();
        matches.dedup();

        match matches.len() {
            0 => Err(ChurnError::Resolution(format!("unknown resource: {name}"))),
            1 => Ok(matches.remove(0)),
            _ => {
                let names: Vec<String> = matches.iter().map(ToString::to_string).collect();
                Err(ChurnError::Resolution(format!(
                    "ambiguous resource {name}: matches {}",
                    names.join(", ")
                )))
            }
        }
    }
}

impl Connector for KubeCluster {
    fn open_cache(
        &self,
        resource: &ResourceTypeId,
        selector: &LabelSelector,
    ) -> ChurnResult<Box<dyn ResourceCache>> {
        let Some(api_resource) = self.served.get(resource) else {
            warn!(%resource, "resource type is not served, its cache will never sync");
            return Ok(Box::new(DormantCache));
        };
        Ok(Box::new(ReflectorCache::start(
            self.client.clone(),
            api_resource.clone(),
            selector,
        )))
    }

    fn open_store(&self) -> ChurnResult<Box<dyn RemoteStore>> {
        Ok(Box::new(KubeStore {
            client: self.client.clone(),
            served: Arc::clone(&self.served),
        }))
    }
}

/// Reflector-backed mirror of one resource type.
struct ReflectorCache {
    reader: Store<DynamicObject>,
    kind: String,
    synced: Arc<AtomicBool>,
    watch: Option<JoinHandle<()>>,
}

impl ReflectorCache {
    fn start(client: Client, resource: ApiResource, selector: &LabelSelector) -> Self {
        let api: Api<DynamicObject> = Api::all_with(client, &resource);
        let writer = Writer::<DynamicObject>::new(resource.clone());
        let reader = writer.as_reader();
        let synced = Arc::new(AtomicBool::new(false));

        let config = watcher::Config::default().labels(&selector.to_string());
        let stream = reflector::reflector(writer, watcher::watcher(api, config));
        let flag = Arc::clone(&synced);
        let plural = resource.plural.clone();
        let watch = tokio::spawn(async move {
            let mut stream = std::pin::pin!(stream);
            while let Some(event) = stream.next().await {
                match event {
                    Ok(watcher::Event::InitDone) => {
                        flag.store(true, Ordering::Release);
                        debug!(resource = %plural, "cache synced");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(resource = %plural, %err, "watch failed"),
                }
            }
        });

        Self {
            reader,
            kind: resource.kind,
            synced,
            watch: Some(watch),
        }
    }
}

impl ResourceCache for ReflectorCache {
    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    fn list(&self) -> ChurnResult<Vec<ObjectRef>> {
        Ok(self
            .reader
            .state()
            .iter()
            .map(|object| ObjectRef {
                namespace: object.namespace().unwrap_or_default(),
                name: object.name_any(),
                kind: self.kind.clone(),
                labels: object.labels().clone(),
            })
            .collect())
    }

    fn stop(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.abort();
        }
    }
}

/// Cache for a type the cluster does not serve.
struct DormantCache;

impl ResourceCache for DormantCache {
    fn has_synced(&self) -> bool {
        false
    }

    fn list(&self) -> ChurnResult<Vec<ObjectRef>> {
        Ok(Vec::new())
    }

    fn stop(&mut self) {}
}

struct KubeStore {
    client: Client,
    served: Arc<HashMap<ResourceTypeId, ApiResource>>,
}

#[async_trait]
impl RemoteStore for KubeStore {
    async fn delete(
        &self,
        resource: &ResourceTypeId,
        namespace: &str,
        name: &str,
    ) -> ChurnResult<()> {
        let api_resource = self.served.get(resource).ok_or_else(|| {
            ChurnError::Runtime(format!("resource type is not served: {resource}"))
        })?;
        let api: Api<DynamicObject> = if namespace.is_empty() {
            Api::all_with(self.client.clone(), api_resource)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, api_resource)
        };
        api.delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| {
                ChurnError::Runtime(format!("failed to delete {resource} {namespace}/{name}: {e}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> ApiResource {
        ApiResource {
            group: String::new(),
            version: "v1".into(),
            api_version: "v1".into(),
            kind: "Service".into(),
            plural: "services".into(),
        }
    }

    #[test]
    fn resolves_plural_kind_and_short_names() {
        let short_names = ShortNames::from([(
            (String::new(), "services".to_string()),
            vec!["svc".to_string()],
        )]);
        let resource = services();
        assert!(answers_to(&resource, &short_names, "services"));
        assert!(answers_to(&resource, &short_names, "service"));
        assert!(answers_to(&resource, &short_names, "svc"));
        assert!(!answers_to(&resource, &short_names, "po"));
        assert!(!answers_to(&resource, &ShortNames::new(), "svc"));
    }
}
