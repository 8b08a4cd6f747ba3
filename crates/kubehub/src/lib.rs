//! kp kubehub: the remote resource store seam and its kube-rs implementation.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use anyhow::Result;
use k8s_openapi::api::core::v1::ConfigMap;
use kp_core::defaults::{config_namespace, KpConfig, CONFIG_MAP_NAME};
use kp_core::{KpError, KpResult, ResourceKind, API_GROUP, API_VERSION};
use kube::{
    api::{Api, DeleteParams, Patch, PatchParams, PostParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client,
};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

/// Remote store for kpack resources. Objects cross this boundary as JSON so
/// one trait object serves every kind; use [`get_typed`]/[`create_typed`]
/// for the typed views.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Namespace used for namespaced kinds when none is given.
    fn default_namespace(&self) -> &str;

    async fn get(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KpResult<Json>;

    async fn create(&self, kind: ResourceKind, namespace: Option<&str>, object: &Json) -> KpResult<Json>;

    /// Submit a JSON merge patch. An empty patch is a caller bug.
    async fn patch(&self, kind: ResourceKind, namespace: Option<&str>, name: &str, patch: &[u8]) -> KpResult<Json>;

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KpResult<()>;

    /// Data of the `kp-config` map in `namespace`; empty when the map is missing.
    async fn load_config(&self, namespace: &str) -> KpResult<BTreeMap<String, String>>;
}

pub async fn get_typed<R: DeserializeOwned>(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
) -> KpResult<R> {
    let raw = store.get(kind, namespace, name).await?;
    Ok(serde_json::from_value(raw)?)
}

pub async fn create_typed<R: Serialize + DeserializeOwned>(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    namespace: Option<&str>,
    object: &R,
) -> KpResult<R> {
    let raw = store.create(kind, namespace, &serde_json::to_value(object)?).await?;
    Ok(serde_json::from_value(raw)?)
}

pub async fn patch_typed<R: DeserializeOwned>(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
    patch: &[u8],
) -> KpResult<R> {
    let raw = store.patch(kind, namespace, name, patch).await?;
    Ok(serde_json::from_value(raw)?)
}

/// Read the ambient configuration from the configuration namespace.
pub async fn load_kp_config(store: &dyn ResourceStore) -> KpResult<KpConfig> {
    let namespace = config_namespace();
    let entries = store.load_config(&namespace).await?;
    debug!(namespace = %namespace, keys = entries.len(), "kp-config loaded");
    Ok(KpConfig::new(namespace, entries))
}

/// Static API resource for a kind; kpack kinds never need discovery.
pub fn api_resource(kind: ResourceKind) -> ApiResource {
    let gvk = GroupVersionKind::gvk(API_GROUP, API_VERSION, kind.as_str());
    ApiResource::from_gvk_with_plural(&gvk, kind.plural())
}

fn remote_err(kind: ResourceKind, name: &str, e: kube::Error) -> KpError {
    counter!("remote_errors_total", 1u64);
    match e {
        kube::Error::Api(ae) if ae.code == 404 => {
            KpError::NotFound { resource: kind.qualified_plural(), name: name.to_string() }
        }
        kube::Error::Api(ae) if ae.code == 409 => KpError::Conflict(ae.message),
        kube::Error::Api(ae) => KpError::Remote(ae.message),
        other => KpError::Remote(other.to_string()),
    }
}

/// [`ResourceStore`] backed by the current kubeconfig context.
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn api(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = api_resource(kind);
        if kind.namespaced() {
            let ns = namespace.unwrap_or(self.client.default_namespace());
            Api::namespaced_with(self.client.clone(), ns, &ar)
        } else {
            Api::all_with(self.client.clone(), &ar)
        }
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    fn default_namespace(&self) -> &str {
        self.client.default_namespace()
    }

    async fn get(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KpResult<Json> {
        debug!(kind = %kind, ns = ?namespace, name, "get");
        let obj = self.api(kind, namespace).get(name).await.map_err(|e| remote_err(kind, name, e))?;
        Ok(serde_json::to_value(&obj)?)
    }

    async fn create(&self, kind: ResourceKind, namespace: Option<&str>, object: &Json) -> KpResult<Json> {
        let obj: DynamicObject = serde_json::from_value(object.clone())?;
        let name = obj.metadata.name.clone().unwrap_or_default();
        info!(kind = %kind, ns = ?namespace, name = %name, "create");
        counter!("remote_write_total", 1u64);
        let created = self
            .api(kind, namespace)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| remote_err(kind, &name, e))?;
        Ok(serde_json::to_value(&created)?)
    }

    async fn patch(&self, kind: ResourceKind, namespace: Option<&str>, name: &str, patch: &[u8]) -> KpResult<Json> {
        if patch.is_empty() {
            return Err(KpError::EmptyPatch(name.to_string()));
        }
        let body: Json = serde_json::from_slice(patch)?;
        info!(kind = %kind, ns = ?namespace, name, bytes = patch.len(), "merge patch");
        counter!("remote_write_total", 1u64);
        let patched = self
            .api(kind, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&body))
            .await
            .map_err(|e| remote_err(kind, name, e))?;
        Ok(serde_json::to_value(&patched)?)
    }

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KpResult<()> {
        info!(kind = %kind, ns = ?namespace, name, "delete");
        counter!("remote_write_total", 1u64);
        self.api(kind, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| remote_err(kind, name, e))?;
        Ok(())
    }

    async fn load_config(&self, namespace: &str) -> KpResult<BTreeMap<String, String>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let cm = api
            .get_opt(CONFIG_MAP_NAME)
            .await
            .map_err(|e| KpError::Remote(format!("reading {}/{}: {}", namespace, CONFIG_MAP_NAME, e)))?;
        match cm {
            Some(cm) => Ok(cm.data.unwrap_or_default()),
            None => {
                warn!(namespace, name = CONFIG_MAP_NAME, "config map not found; using built-in defaults");
                Ok(BTreeMap::new())
            }
        }
    }
}
