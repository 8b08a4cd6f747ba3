//! `clusterstack` commands.

use std::io::Write;

use anyhow::Result;
use kp_apply::{create_patch_with_last_applied, set_last_applied};
use kp_core::prelude::*;
use kp_core::status::{cluster_stack_items, write_status_block};
use kp_core::StackImage;
use kp_kubehub::{create_typed, get_typed, ResourceStore};
use tracing::info;

use super::given;
use crate::cli::{StackCommand, StackCreateArgs, StackPatchArgs, StatusArgs};
use crate::output::report;

const KIND: ResourceKind = ResourceKind::ClusterStack;

pub async fn dispatch<W: Write + ?Sized>(store: &dyn ResourceStore, command: StackCommand, out: &mut W) -> Result<()> {
    match command {
        StackCommand::Create(args) => create(store, &args, out).await,
        StackCommand::Patch(args) => patch(store, &args, out).await,
        StackCommand::Delete(args) => super::delete(store, KIND, None, &args, out).await,
        StackCommand::Status(args) => status(store, &args, out).await,
    }
}

pub async fn create<W: Write + ?Sized>(store: &dyn ResourceStore, args: &StackCreateArgs, out: &mut W) -> Result<()> {
    let spec = ClusterStackSpec {
        id: args.id.clone(),
        build_image: StackImage { image: args.build_image.clone() },
        run_image: StackImage { image: args.run_image.clone() },
    };
    let mut stack = ClusterStack::new(&args.name, None, spec);
    set_last_applied(&mut stack)?;

    let result = if args.write.dry_run {
        stack
    } else {
        create_typed(store, KIND, None, &stack).await?
    };
    info!(name = %args.name, dry_run = args.write.dry_run, "cluster stack created");
    report(out, &args.write, &result, &format!("{} \"{}\" created", KIND, args.name))
}

pub async fn patch<W: Write + ?Sized>(store: &dyn ResourceStore, args: &StackPatchArgs, out: &mut W) -> Result<()> {
    let existing: ClusterStack = get_typed(store, KIND, None, &args.name).await?;

    let mut patched = existing.clone();
    if let Some(id) = given(&args.id) {
        patched.spec.id = id.to_string();
    }
    if let Some(image) = given(&args.build_image) {
        patched.spec.build_image.image = image.to_string();
    }
    if let Some(image) = given(&args.run_image) {
        patched.spec.run_image.image = image.to_string();
    }

    let patch = create_patch_with_last_applied(&existing, &mut patched)?;
    super::submit_patch(store, KIND, None, existing.name(), patch, patched, &args.write, out).await
}

pub async fn status<W: Write + ?Sized>(store: &dyn ResourceStore, args: &StatusArgs, out: &mut W) -> Result<()> {
    let stack: ClusterStack = get_typed(store, KIND, None, &args.name).await?;
    write_status_block(out, &cluster_stack_items(&stack.status, args.verbose))?;
    Ok(())
}
