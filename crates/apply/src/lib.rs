//! kp apply: merge-patch calculation between two snapshots of one resource,
//! plus the last-applied annotation kept alongside every write.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use kp_core::{KpError, KpResult, Resource};
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::debug;

pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary { pub adds: usize, pub updates: usize, pub removes: usize }

/// Drop fields the client never writes. Status is reconciler-owned and
/// managedFields belongs to the API server.
fn strip_server_owned(mut v: Json) -> Json {
    if let Some(meta) = v.get_mut("metadata") {
        if let Some(obj) = meta.as_object_mut() {
            obj.remove("managedFields");
        }
    }
    if let Some(obj) = v.as_object_mut() { obj.remove("status"); }
    v
}

/// Compute the JSON merge patch (RFC 7386) turning `before` into `after`.
///
/// Returns an empty buffer when nothing but status differs; callers must
/// treat that as "nothing to patch". Keys come out sorted, so the bytes are
/// stable for a given pair of snapshots.
pub fn create_patch<S, T>(before: &Resource<S, T>, after: &Resource<S, T>) -> KpResult<Vec<u8>>
where
    S: Serialize,
    T: Serialize + Default + PartialEq,
{
    if before.name() != after.name() || before.namespace() != after.namespace() {
        return Err(KpError::IdentityMismatch { before: before.key(), after: after.key() });
    }
    let base = strip_server_owned(serde_json::to_value(before)?);
    let target = strip_server_owned(serde_json::to_value(after)?);
    match merge_diff(&base, &target) {
        None => {
            counter!("patch_noop", 1u64);
            debug!(resource = %before.key(), "no changes to patch");
            Ok(Vec::new())
        }
        Some(patch) => {
            let summary = diff_summary(&target, &base);
            let bytes = serde_json::to_vec(&patch)?;
            counter!("patch_computed", 1u64);
            debug!(
                resource = %before.key(),
                adds = summary.adds,
                updates = summary.updates,
                removes = summary.removes,
                bytes = bytes.len(),
                "merge patch computed"
            );
            Ok(bytes)
        }
    }
}

/// Like [`create_patch`], but when something changed the last-applied
/// annotation on `after` is refreshed first so the patch carries it too.
pub fn create_patch_with_last_applied<S, T>(before: &Resource<S, T>, after: &mut Resource<S, T>) -> KpResult<Vec<u8>>
where
    S: Serialize,
    T: Serialize + Default + PartialEq,
{
    let patch = create_patch(before, after)?;
    if patch.is_empty() {
        return Ok(patch);
    }
    set_last_applied(after)?;
    create_patch(before, after)
}

/// Recursive merge-patch diff. Equal fields are omitted, removed keys map to
/// `null`, arrays and scalars are replaced whole.
pub fn merge_diff(before: &Json, after: &Json) -> Option<Json> {
    match (before, after) {
        (Json::Object(bo), Json::Object(ao)) => {
            let mut out = Map::new();
            for (k, av) in ao.iter() {
                match bo.get(k) {
                    Some(bv) if bv == av => {}
                    Some(bv) => {
                        if let Some(d) = merge_diff(bv, av) { out.insert(k.clone(), d); }
                    }
                    None => { out.insert(k.clone(), av.clone()); }
                }
            }
            for k in bo.keys() {
                if !ao.contains_key(k) { out.insert(k.clone(), Json::Null); }
            }
            if out.is_empty() { None } else { Some(Json::Object(out)) }
        }
        (bv, av) if bv == av => None,
        (_, av) => Some(av.clone()),
    }
}

/// Apply a merge patch in place (RFC 7386 semantics).
pub fn apply_merge_patch(target: &mut Json, patch: &Json) {
    let Json::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() { *target = Json::Object(Map::new()); }
    if let Json::Object(obj) = target {
        for (k, v) in patch.iter() {
            if v.is_null() {
                obj.remove(k);
            } else {
                apply_merge_patch(obj.entry(k.clone()).or_insert(Json::Null), v);
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LastApplied<'a, S> {
    kind: &'a str,
    api_version: &'a str,
    metadata: LastAppliedMeta<'a>,
    spec: &'a S,
}

#[derive(Serialize)]
struct LastAppliedMeta<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

/// Record the client-owned part of `resource` in the last-applied annotation.
pub fn set_last_applied<S: Serialize, T>(resource: &mut Resource<S, T>) -> KpResult<()> {
    let json = serde_json::to_string(&LastApplied {
        kind: &resource.kind,
        api_version: &resource.api_version,
        metadata: LastAppliedMeta { name: resource.name(), namespace: resource.namespace() },
        spec: &resource.spec,
    })?;
    resource
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(LAST_APPLIED_ANNOTATION.to_string(), json);
    Ok(())
}

pub fn diff_summary(target: &Json, base: &Json) -> DiffSummary {
    fn walk(a: &Json, b: &Json, adds: &mut usize, ups: &mut usize, rems: &mut usize) {
        use serde_json::Value as V;
        match (a, b) {
            (V::Object(ao), V::Object(bo)) => {
                for (k, av) in ao.iter() {
                    if let Some(bv) = bo.get(k) {
                        if av == bv { continue; }
                        walk(av, bv, adds, ups, rems);
                    } else {
                        *adds += 1;
                    }
                }
                for (k, _bv) in bo.iter() {
                    if !ao.contains_key(k) { *rems += 1; }
                }
            }
            (V::Array(aa), V::Array(bb)) => {
                let min_len = aa.len().min(bb.len());
                for i in 0..min_len { if aa[i] != bb[i] { *ups += 1; } }
                if aa.len() > bb.len() { *adds += aa.len() - bb.len(); }
                if bb.len() > aa.len() { *rems += bb.len() - aa.len(); }
            }
            // Scalars differ or type differs
            (av, bv) => { if av != bv { *ups += 1; } }
        }
    }
    let mut adds = 0usize; let mut ups = 0usize; let mut rems = 0usize;
    walk(target, base, &mut adds, &mut ups, &mut rems);
    DiffSummary { adds, updates: ups, removes: rems }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kp_core::defaults::{resolve, DefaultFlags, KpConfig};
    use kp_core::prelude::*;
    use kp_core::{object_ref, Condition};

    fn cluster_builder() -> ClusterBuilder {
        let cfg = KpConfig::new("kpack", [("canonical.repository".to_string(), "reg/proj".to_string())].into());
        let d = resolve(ResourceKind::ClusterBuilder, "b", &DefaultFlags::default(), &cfg).unwrap();
        let order = vec![OrderEntry { group: vec![BuildpackRef::new("a", Some("1"))] }];
        let mut cb = ClusterBuilder::new("b", None, ClusterBuilderSpec::from_parts(d.builder_spec(order), &d.service_account));
        cb.metadata.resource_version = Some("42".into());
        cb
    }

    #[test]
    fn unmodified_copy_yields_empty_patch() {
        let before = cluster_builder();
        let after = before.clone();
        assert!(create_patch(&before, &after).unwrap().is_empty());
    }

    #[test]
    fn status_never_enters_the_patch() {
        let before = cluster_builder();
        let mut after = before.clone();
        after.status.latest_image = "img@sha256:abc".into();
        after.status.conditions.push(Condition { condition_type: "Ready".into(), status: "True".into(), ..Default::default() });
        assert!(create_patch(&before, &after).unwrap().is_empty());

        after.spec.builder.tag = "new/tag".into();
        let patch: Json = serde_json::from_slice(&create_patch(&before, &after).unwrap()).unwrap();
        assert_eq!(patch, serde_json::json!({"spec": {"tag": "new/tag"}}));
    }

    #[test]
    fn removed_fields_become_null_and_patch_reapplies() {
        let before = cluster_builder();
        let mut after = before.clone();
        after.spec.builder.order.clear();
        after.spec.builder.stack = object_ref("ClusterStack", "other");
        let bytes = create_patch(&before, &after).unwrap();
        let patch: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(patch, serde_json::json!({"spec": {"order": null, "stack": {"name": "other"}}}));

        let mut live = serde_json::to_value(&before).unwrap();
        apply_merge_patch(&mut live, &patch);
        assert_eq!(strip_server_owned(live), strip_server_owned(serde_json::to_value(&after).unwrap()));
        // stable bytes on a re-run
        assert_eq!(bytes, create_patch(&before, &after).unwrap());
    }

    #[test]
    fn different_identities_are_rejected() {
        let before = cluster_builder();
        let mut after = before.clone();
        after.metadata.name = Some("other".into());
        assert!(matches!(create_patch(&before, &after), Err(KpError::IdentityMismatch { .. })));
    }

    #[test]
    fn last_applied_refreshes_only_on_change() {
        let before = cluster_builder();
        let mut same = before.clone();
        assert!(create_patch_with_last_applied(&before, &mut same).unwrap().is_empty());
        assert!(same.metadata.annotations.is_none());

        let mut after = before.clone();
        after.spec.builder.tag = "t2".into();
        let patch: Json = serde_json::from_slice(&create_patch_with_last_applied(&before, &mut after).unwrap()).unwrap();
        let recorded = patch["metadata"]["annotations"][LAST_APPLIED_ANNOTATION].as_str().unwrap();
        let recorded: Json = serde_json::from_str(recorded).unwrap();
        assert_eq!(recorded["spec"]["tag"], "t2");
        assert_eq!(recorded["metadata"], serde_json::json!({"name": "b"}));
        assert!(recorded.get("status").is_none());
    }

    #[test]
    fn diff_summary_counts_adds_updates_removes() {
        let base = serde_json::json!({
            "tag": "a",
            "stack": { "name": "s" },
            "order": [1, 2, 3]
        });
        let target = serde_json::json!({
            "tag": "b",
            "stack": { "name": "s", "kind": "ClusterStack" },
            "order": [1, 9],
            "store": true
        });
        let s = diff_summary(&target, &base);
        assert_eq!(s, DiffSummary { adds: 2, updates: 2, removes: 1 });
    }
}
