//! kp core: the kpack resource model plus the pure logic every command shares
//! (order normalization, default resolution, status rendering).

#![forbid(unsafe_code)]

use std::fmt;

use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod error;
pub mod order;
pub mod status;

pub use error::{KpError, KpResult};

pub const API_GROUP: &str = "kpack.io";
pub const API_VERSION: &str = "v1alpha2";
pub const CLUSTER_STACK_KIND: &str = "ClusterStack";
pub const CLUSTER_STORE_KIND: &str = "ClusterStore";

/// Resource kinds managed by kp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Builder,
    ClusterBuilder,
    ClusterStack,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Builder => "Builder",
            ResourceKind::ClusterBuilder => "ClusterBuilder",
            ResourceKind::ClusterStack => "ClusterStack",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Builder => "builders",
            ResourceKind::ClusterBuilder => "clusterbuilders",
            ResourceKind::ClusterStack => "clusterstacks",
        }
    }

    pub fn namespaced(self) -> bool {
        matches!(self, ResourceKind::Builder)
    }

    /// `plural.group`, the way the API server names a resource in errors.
    pub fn qualified_plural(self) -> String {
        format!("{}.{}", self.plural(), API_GROUP)
    }

    /// Kind used for the `stack` reference of builders targeting this kind.
    pub fn stack_ref_kind(self) -> &'static str {
        CLUSTER_STACK_KIND
    }

    /// Kind used for the `store` reference of builders targeting this kind.
    pub fn store_ref_kind(self) -> &'static str {
        CLUSTER_STORE_KIND
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn api_version() -> String {
    format!("{}/{}", API_GROUP, API_VERSION)
}

/// Ties a spec type to the kind whose `spec` it is.
pub trait ResourceSpec {
    const KIND: ResourceKind;
}

/// Envelope shared by every kpack resource. `status` belongs to the
/// reconciler; kp only ever reads it, and an empty one is never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "S: Serialize, T: Serialize + Default + PartialEq"))]
pub struct Resource<S, T> {
    pub kind: String,
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: S,
    #[serde(default, skip_serializing_if = "is_default")]
    pub status: T,
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

impl<S: ResourceSpec, T: Default> Resource<S, T> {
    pub fn new(name: &str, namespace: Option<&str>, spec: S) -> Self {
        Self {
            kind: S::KIND.as_str().to_string(),
            api_version: api_version(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: namespace.map(|s| s.to_string()),
                ..Default::default()
            },
            spec,
            status: T::default(),
        }
    }
}

impl<S, T> Resource<S, T> {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    /// `namespace/name` for namespaced objects, `name` otherwise.
    pub fn key(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name()),
            None => self.name().to_string(),
        }
    }
}

/// One buildpack inside a detection group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackRef {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl BuildpackRef {
    pub fn new(id: &str, version: Option<&str>) -> Self {
        Self { id: id.to_string(), version: version.map(|v| v.to_string()) }
    }
}

impl fmt::Display for BuildpackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.id, v),
            None => f.write_str(&self.id),
        }
    }
}

/// One detection group. Position in the order is precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    #[serde(default)]
    pub group: Vec<BuildpackRef>,
}

/// Fields shared by `Builder` and `ClusterBuilder` specs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSpec {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub stack: ObjectReference,
    #[serde(default)]
    pub store: ObjectReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespacedBuilderSpec {
    #[serde(flatten)]
    pub builder: BuilderSpec,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBuilderSpec {
    #[serde(flatten)]
    pub builder: BuilderSpec,
    #[serde(default)]
    pub service_account_ref: ObjectReference,
}

impl ResourceSpec for NamespacedBuilderSpec {
    const KIND: ResourceKind = ResourceKind::Builder;
}

impl ResourceSpec for ClusterBuilderSpec {
    const KIND: ResourceKind = ResourceKind::ClusterBuilder;
}

/// Builder specs differ only in how they point at a service account.
pub trait BuilderSpecKind: ResourceSpec {
    fn from_parts(builder: BuilderSpec, service_account: &ObjectReference) -> Self;
    fn builder(&self) -> &BuilderSpec;
    fn builder_mut(&mut self) -> &mut BuilderSpec;
}

impl BuilderSpecKind for NamespacedBuilderSpec {
    fn from_parts(builder: BuilderSpec, service_account: &ObjectReference) -> Self {
        Self { builder, service_account_name: service_account.name.clone().unwrap_or_default() }
    }
    fn builder(&self) -> &BuilderSpec {
        &self.builder
    }
    fn builder_mut(&mut self) -> &mut BuilderSpec {
        &mut self.builder
    }
}

impl BuilderSpecKind for ClusterBuilderSpec {
    fn from_parts(builder: BuilderSpec, service_account: &ObjectReference) -> Self {
        Self { builder, service_account_ref: service_account.clone() }
    }
    fn builder(&self) -> &BuilderSpec {
        &self.builder
    }
    fn builder_mut(&mut self) -> &mut BuilderSpec {
        &mut self.builder
    }
}

/// A status condition as reported by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderStackStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub run_image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub latest_image: String,
    #[serde(default)]
    pub stack: BuilderStackStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderEntry>,
}

pub type Builder = Resource<NamespacedBuilderSpec, BuilderStatus>;
pub type ClusterBuilder = Resource<ClusterBuilderSpec, BuilderStatus>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackImage {
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStackSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub build_image: StackImage,
    #[serde(default)]
    pub run_image: StackImage,
}

impl ResourceSpec for ClusterStackSpec {
    const KIND: ResourceKind = ResourceKind::ClusterStack;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStackImage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub latest_image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStackStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub build_image: ResolvedStackImage,
    #[serde(default)]
    pub run_image: ResolvedStackImage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<String>,
}

pub type ClusterStack = Resource<ClusterStackSpec, ClusterStackStatus>;

/// Reference with only `kind` and `name` set.
pub fn object_ref(kind: &str, name: &str) -> ObjectReference {
    ObjectReference { kind: Some(kind.to_string()), name: Some(name.to_string()), ..Default::default() }
}

pub mod prelude {
    pub use super::{
        BuildpackRef, Builder, BuilderSpec, BuilderSpecKind, BuilderStatus, ClusterBuilder, ClusterBuilderSpec,
        ClusterStack, ClusterStackSpec, ClusterStackStatus, Condition, KpError, KpResult, NamespacedBuilderSpec,
        OrderEntry, Resource, ResourceKind, ResourceSpec,
    };
}
