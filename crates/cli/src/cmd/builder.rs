//! `builder` and `clusterbuilder` commands. Both kinds share one code path,
//! parameterized by the builder spec type.

use std::io::Write;

use anyhow::Result;
use kp_apply::{create_patch_with_last_applied, set_last_applied};
use kp_core::defaults::{self, DefaultFlags};
use kp_core::order;
use kp_core::prelude::*;
use kp_core::status::{builder_items, write_status_block};
use kp_kubehub::{create_typed, get_typed, load_kp_config, ResourceStore};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use super::given;
use crate::cli::{BuilderCommand, BuilderCreateArgs, BuilderPatchArgs, StatusArgs};
use crate::output::report;

type BuilderOf<S> = Resource<S, BuilderStatus>;

pub async fn dispatch<S, W>(
    store: &dyn ResourceStore,
    namespace: Option<&str>,
    command: BuilderCommand,
    out: &mut W,
) -> Result<()>
where
    S: BuilderSpecKind + Serialize + DeserializeOwned + Clone,
    W: Write + ?Sized,
{
    match command {
        BuilderCommand::Create(args) => create::<S, W>(store, namespace, &args, out).await,
        BuilderCommand::Patch(args) => patch::<S, W>(store, namespace, &args, out).await,
        BuilderCommand::Delete(args) => super::delete(store, S::KIND, namespace, &args, out).await,
        BuilderCommand::Status(args) => status::<S, W>(store, namespace, &args, out).await,
    }
}

pub async fn create<S, W>(
    store: &dyn ResourceStore,
    namespace: Option<&str>,
    args: &BuilderCreateArgs,
    out: &mut W,
) -> Result<()>
where
    S: BuilderSpecKind + Serialize + DeserializeOwned + Clone,
    W: Write + ?Sized,
{
    let kind = S::KIND;
    // local input first: a bad order must fail before any remote call
    let order = order::normalize(args.flags.order.as_deref(), &args.flags.buildpacks)?.unwrap_or_default();
    let config = load_kp_config(store).await?;
    let flags = DefaultFlags {
        tag: args.flags.tag.clone(),
        stack: args.flags.stack.clone(),
        store: args.flags.store.clone(),
        service_account: args.service_account.clone(),
    };
    let resolved = defaults::resolve(kind, &args.name, &flags, &config)?;

    let spec = S::from_parts(resolved.builder_spec(order), &resolved.service_account);
    let mut builder: BuilderOf<S> = Resource::new(&args.name, namespace, spec);
    set_last_applied(&mut builder)?;

    let result = if args.write.dry_run {
        builder
    } else {
        create_typed(store, kind, namespace, &builder).await?
    };
    info!(kind = %kind, name = %args.name, dry_run = args.write.dry_run, "builder created");
    report(out, &args.write, &result, &format!("{} \"{}\" created", kind, args.name))
}

pub async fn patch<S, W>(
    store: &dyn ResourceStore,
    namespace: Option<&str>,
    args: &BuilderPatchArgs,
    out: &mut W,
) -> Result<()>
where
    S: BuilderSpecKind + Serialize + DeserializeOwned + Clone,
    W: Write + ?Sized,
{
    let kind = S::KIND;
    let order = order::normalize(args.flags.order.as_deref(), &args.flags.buildpacks)?;
    let existing: BuilderOf<S> = get_typed(store, kind, namespace, &args.name).await?;

    let mut patched = existing.clone();
    let spec = patched.spec.builder_mut();
    if let Some(tag) = given(&args.flags.tag) {
        spec.tag = tag.to_string();
    }
    if let Some(stack) = given(&args.flags.stack) {
        spec.stack.name = Some(stack.to_string());
    }
    if let Some(name) = given(&args.flags.store) {
        spec.store.name = Some(name.to_string());
    }
    if let Some(order) = order {
        spec.order = order;
    }

    let patch = create_patch_with_last_applied(&existing, &mut patched)?;
    super::submit_patch(store, kind, namespace, existing.name(), patch, patched, &args.write, out).await
}

pub async fn status<S, W>(
    store: &dyn ResourceStore,
    namespace: Option<&str>,
    args: &StatusArgs,
    out: &mut W,
) -> Result<()>
where
    S: BuilderSpecKind + DeserializeOwned,
    W: Write + ?Sized,
{
    let builder: BuilderOf<S> = get_typed(store, S::KIND, namespace, &args.name).await?;
    write_status_block(out, &builder_items(&builder.status, args.verbose))?;
    Ok(())
}
