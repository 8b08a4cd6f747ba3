#![forbid(unsafe_code)]

mod common;

use common::{run_cmd, MemoryStore, Recorded};
use kp_core::ResourceKind;
use serde_json::{json, Value as Json};

fn cluster_builder(status: Json) -> Json {
    json!({
        "kind": "ClusterBuilder",
        "apiVersion": "kpack.io/v1alpha2",
        "metadata": {"name": "cb"},
        "spec": {
            "tag": "reg/proj/cb",
            "stack": {"kind": "ClusterStack", "name": "default"},
            "store": {"kind": "ClusterStore", "name": "default"},
            "serviceAccountRef": {"namespace": "kpack", "name": "default"}
        },
        "status": status
    })
}

fn store_with(status: Json) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(ResourceKind::ClusterBuilder, None, cluster_builder(status));
    store
}

#[tokio::test]
async fn ready_builder_status_block() {
    let store = store_with(json!({
        "latestImage": "reg/proj/cb@sha256:1",
        "conditions": [{"type": "Ready", "status": "True"}],
        "stack": {"id": "io.buildpacks.stacks.bionic", "runImage": "run@sha256:2"}
    }));
    let out = run_cmd(&store, &["clusterbuilder", "status", "cb"]).await.unwrap();
    assert_eq!(
        out,
        "Status:    Ready\n\
         Image:     reg/proj/cb@sha256:1\n\
         Stack:     io.buildpacks.stacks.bionic\n\
         Run Image: run@sha256:2\n"
    );
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn not_ready_builder_shows_reason() {
    let store = store_with(json!({
        "conditions": [{"type": "Ready", "status": "False", "message": "stack not ready"}]
    }));
    let out = run_cmd(&store, &["clusterbuilder", "status", "cb"]).await.unwrap();
    assert_eq!(
        out,
        "Status:    Not Ready\n\
         Image:\n\
         Stack:\n\
         Run Image:\n\
         Reason:    stack not ready\n"
    );
}

#[tokio::test]
async fn verbose_builder_status_lists_groups() {
    let store = store_with(json!({
        "stack": {"id": "io.bionic", "runImage": "run"},
        "order": [
            {"group": [{"id": "a", "version": "1"}, {"id": "b"}]},
            {"group": [{"id": "c"}]}
        ]
    }));
    let out = run_cmd(&store, &["clusterbuilder", "status", "cb", "-v"]).await.unwrap();
    assert_eq!(
        out,
        "Status:    Unknown\n\
         Image:\n\
         Stack:     io.bionic\n\
         Run Image: run\n\
         Group 1:   a@1, b\n\
         Group 2:   c\n"
    );
}

#[tokio::test]
async fn status_of_missing_builder_is_not_found() {
    let store = MemoryStore::new();
    let err = run_cmd(&store, &["builder", "status", "nope"]).await.unwrap_err();
    assert_eq!(err.to_string(), "builders.kpack.io \"nope\" not found");
}

#[tokio::test]
async fn delete_removes_the_resource() {
    let store = store_with(json!({}));
    let out = run_cmd(&store, &["clusterbuilder", "delete", "cb"]).await.unwrap();
    assert_eq!(out, "\"cb\" deleted\n");
    assert!(store.object(ResourceKind::ClusterBuilder, None, "cb").is_none());
    assert_eq!(
        store.writes(),
        vec![Recorded::Delete { kind: ResourceKind::ClusterBuilder, namespace: None, name: "cb".into() }]
    );
}

#[tokio::test]
async fn delete_dry_run_keeps_the_resource() {
    let store = store_with(json!({}));
    let out = run_cmd(&store, &["clusterbuilder", "delete", "cb", "--dry-run"]).await.unwrap();
    assert_eq!(out, "\"cb\" deleted (dry run)\n");
    assert!(store.object(ResourceKind::ClusterBuilder, None, "cb").is_some());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn delete_dry_run_still_reports_missing_resources() {
    let store = MemoryStore::new();
    let err = run_cmd(&store, &["clusterbuilder", "delete", "ghost", "--dry-run"]).await.unwrap_err();
    assert_eq!(err.to_string(), "clusterbuilders.kpack.io \"ghost\" not found");
}

#[tokio::test]
async fn namespaced_delete_uses_the_given_namespace() {
    let store = MemoryStore::new();
    let err = run_cmd(&store, &["builder", "delete", "b", "-n", "dev"]).await.unwrap_err();
    assert_eq!(err.to_string(), "builders.kpack.io \"b\" not found");
    assert_eq!(
        store.writes(),
        vec![Recorded::Delete { kind: ResourceKind::Builder, namespace: Some("dev".into()), name: "b".into() }]
    );
}
