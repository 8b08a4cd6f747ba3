//! Default resolution for builder fields left unset on the command line.
//!
//! Precedence is always flag, then ambient `kp-config` entry, then a literal
//! default. The tag is the exception: without a flag or a canonical
//! repository there is no safe default and resolution fails.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ObjectReference;
use tracing::debug;

use crate::{object_ref, BuilderSpec, KpError, KpResult, OrderEntry, ResourceKind};

pub const CONFIG_MAP_NAME: &str = "kp-config";
pub const DEFAULT_CONFIG_NAMESPACE: &str = "kpack";
pub const CANONICAL_REPOSITORY_KEY: &str = "canonical.repository";
pub const CANONICAL_SERVICE_ACCOUNT_KEY: &str = "canonical.repository.serviceaccount";
pub const DEFAULT_NAME: &str = "default";

/// Namespace holding the `kp-config` map (`KP_CONFIG_NAMESPACE` overrides).
pub fn config_namespace() -> String {
    std::env::var("KP_CONFIG_NAMESPACE")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_NAMESPACE.to_string())
}

/// Ambient configuration, read once per invocation and passed around by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KpConfig {
    namespace: String,
    entries: BTreeMap<String, String>,
}

impl KpConfig {
    pub fn new(namespace: impl Into<String>, entries: BTreeMap<String, String>) -> Self {
        Self { namespace: namespace.into(), entries }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Value for `key`; empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str()).filter(|s| !s.is_empty())
    }

    pub fn canonical_repository(&self) -> Option<&str> {
        self.get(CANONICAL_REPOSITORY_KEY)
    }

    pub fn canonical_service_account(&self) -> Option<&str> {
        self.get(CANONICAL_SERVICE_ACCOUNT_KEY)
    }
}

/// Raw flag values; `None` and `Some("")` both mean "not given".
#[derive(Debug, Clone, Default)]
pub struct DefaultFlags {
    pub tag: Option<String>,
    pub stack: Option<String>,
    pub store: Option<String>,
    pub service_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDefaults {
    pub tag: String,
    pub stack: ObjectReference,
    pub store: ObjectReference,
    pub service_account: ObjectReference,
}

impl ResolvedDefaults {
    pub fn builder_spec(&self, order: Vec<OrderEntry>) -> BuilderSpec {
        BuilderSpec { tag: self.tag.clone(), stack: self.stack.clone(), store: self.store.clone(), order }
    }
}

fn given(flag: Option<&str>) -> Option<&str> {
    flag.filter(|s| !s.is_empty())
}

pub fn resolve(kind: ResourceKind, name: &str, flags: &DefaultFlags, config: &KpConfig) -> KpResult<ResolvedDefaults> {
    let tag = resolve_tag(name, flags.tag.as_deref(), config)?;
    let stack = object_ref(kind.stack_ref_kind(), given(flags.stack.as_deref()).unwrap_or(DEFAULT_NAME));
    let store = object_ref(kind.store_ref_kind(), given(flags.store.as_deref()).unwrap_or(DEFAULT_NAME));
    let service_account = resolve_service_account(flags.service_account.as_deref(), config);
    debug!(
        kind = %kind,
        name,
        tag = %tag,
        stack = ?stack.name,
        store = ?store.name,
        service_account = ?service_account.name,
        "defaults resolved"
    );
    Ok(ResolvedDefaults { tag, stack, store, service_account })
}

/// Explicit tag, else `<canonical.repository>/<name>`.
pub fn resolve_tag(name: &str, flag: Option<&str>, config: &KpConfig) -> KpResult<String> {
    if let Some(tag) = given(flag) {
        return Ok(tag.to_string());
    }
    let base = config.canonical_repository().ok_or(KpError::MissingCanonicalRepository)?;
    Ok(format!("{}/{}", base.trim_end_matches('/'), name))
}

/// Explicit account, else the canonical one, else `default`. Never fails.
pub fn resolve_service_account(flag: Option<&str>, config: &KpConfig) -> ObjectReference {
    let name = given(flag)
        .or_else(|| config.canonical_service_account())
        .unwrap_or(DEFAULT_NAME);
    ObjectReference {
        namespace: Some(config.namespace().to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}
