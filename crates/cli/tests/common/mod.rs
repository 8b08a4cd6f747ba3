#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use kp_apply::apply_merge_patch;
use kp_cli::Cli;
use kp_core::{KpError, KpResult, ResourceKind};
use kp_kubehub::ResourceStore;
use serde_json::Value as Json;

type Key = (ResourceKind, Option<String>, String);

/// A write the store received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Create { kind: ResourceKind, namespace: Option<String>, object: Json },
    Patch { kind: ResourceKind, namespace: Option<String>, name: String, body: Vec<u8> },
    Delete { kind: ResourceKind, namespace: Option<String>, name: String },
}

/// In-memory [`ResourceStore`] with merge-patch semantics.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<Key, Json>>,
    config: Mutex<BTreeMap<String, String>>,
    writes: Mutex<Vec<Recorded>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canonical_repository(repo: &str) -> Self {
        let store = Self::new();
        store.set_config("canonical.repository", repo);
        store
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.config.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    /// Seed an object without recording a write.
    pub fn insert(&self, kind: ResourceKind, namespace: Option<&str>, object: Json) {
        let name = object["metadata"]["name"].as_str().unwrap_or_default().to_string();
        self.objects.lock().unwrap().insert(key(kind, namespace, &name), object);
    }

    pub fn object(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> Option<Json> {
        self.objects.lock().unwrap().get(&key(kind, namespace, name)).cloned()
    }

    pub fn writes(&self) -> Vec<Recorded> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, w: Recorded) {
        self.writes.lock().unwrap().push(w);
    }
}

fn key(kind: ResourceKind, namespace: Option<&str>, name: &str) -> Key {
    let ns = if kind.namespaced() { namespace.map(|s| s.to_string()) } else { None };
    (kind, ns, name.to_string())
}

fn not_found(kind: ResourceKind, name: &str) -> KpError {
    KpError::NotFound { resource: kind.qualified_plural(), name: name.to_string() }
}

#[async_trait::async_trait]
impl ResourceStore for MemoryStore {
    fn default_namespace(&self) -> &str {
        "default"
    }

    async fn get(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KpResult<Json> {
        self.object(kind, namespace, name).ok_or_else(|| not_found(kind, name))
    }

    async fn create(&self, kind: ResourceKind, namespace: Option<&str>, object: &Json) -> KpResult<Json> {
        let name = object["metadata"]["name"].as_str().unwrap_or_default().to_string();
        self.record(Recorded::Create {
            kind,
            namespace: namespace.map(|s| s.to_string()),
            object: object.clone(),
        });
        let mut objects = self.objects.lock().unwrap();
        let k = key(kind, namespace, &name);
        if objects.contains_key(&k) {
            return Err(KpError::Conflict(format!("{} \"{}\" already exists", kind.qualified_plural(), name)));
        }
        objects.insert(k, object.clone());
        Ok(object.clone())
    }

    async fn patch(&self, kind: ResourceKind, namespace: Option<&str>, name: &str, patch: &[u8]) -> KpResult<Json> {
        if patch.is_empty() {
            return Err(KpError::EmptyPatch(name.to_string()));
        }
        self.record(Recorded::Patch {
            kind,
            namespace: namespace.map(|s| s.to_string()),
            name: name.to_string(),
            body: patch.to_vec(),
        });
        let body: Json = serde_json::from_slice(patch)?;
        let mut objects = self.objects.lock().unwrap();
        let current = objects.get_mut(&key(kind, namespace, name)).ok_or_else(|| not_found(kind, name))?;
        apply_merge_patch(current, &body);
        Ok(current.clone())
    }

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KpResult<()> {
        self.record(Recorded::Delete {
            kind,
            namespace: namespace.map(|s| s.to_string()),
            name: name.to_string(),
        });
        self.objects
            .lock()
            .unwrap()
            .remove(&key(kind, namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found(kind, name))
    }

    async fn load_config(&self, _namespace: &str) -> KpResult<BTreeMap<String, String>> {
        Ok(self.config.lock().unwrap().clone())
    }
}

/// Parse `args` as a `kp` command line and run it against `store`,
/// returning stdout.
pub async fn run_cmd(store: &MemoryStore, args: &[&str]) -> anyhow::Result<String> {
    let cli = <Cli as clap::Parser>::try_parse_from(std::iter::once("kp").chain(args.iter().copied()))?;
    let mut out = Vec::new();
    kp_cli::run(cli, store, &mut out).await?;
    Ok(String::from_utf8(out)?)
}

pub fn order_fixture() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/testdata/order.yaml")
}
