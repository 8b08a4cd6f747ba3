//! Command orchestration: read the remote object, compute the desired one,
//! submit a create or a minimal patch.

use std::io::Write;

use anyhow::Result;
use kp_core::ResourceKind;
use kp_kubehub::{patch_typed, ResourceStore};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::cli::{DeleteArgs, WriteFlags};
use crate::output::{report, write_message, write_resource};

pub mod builder;
pub mod clusterstack;

/// Flag value if the user actually gave one.
pub(crate) fn given(flag: &Option<String>) -> Option<&str> {
    flag.as_deref().filter(|s| !s.is_empty())
}

/// Submit a computed patch, or report that there is nothing to do. An empty
/// patch never reaches the store.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn submit_patch<R, W>(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
    patch: Vec<u8>,
    patched: R,
    write: &WriteFlags,
    out: &mut W,
) -> Result<()>
where
    R: Serialize + DeserializeOwned,
    W: Write + ?Sized,
{
    if patch.is_empty() {
        info!(kind = %kind, name, "nothing to patch");
        return match write.output {
            Some(format) => write_resource(out, format, &patched),
            None => write_message(out, "nothing to patch", false),
        };
    }
    let result: R = if write.dry_run {
        patched
    } else {
        patch_typed(store, kind, namespace, name, &patch).await?
    };
    report(out, write, &result, &format!("\"{}\" patched", name))
}

pub async fn delete<W: Write + ?Sized>(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    namespace: Option<&str>,
    args: &DeleteArgs,
    out: &mut W,
) -> Result<()> {
    if args.dry_run {
        // surface NotFound without writing
        store.get(kind, namespace, &args.name).await?;
    } else {
        store.delete(kind, namespace, &args.name).await?;
    }
    write_message(out, &format!("\"{}\" deleted", args.name), args.dry_run)
}
