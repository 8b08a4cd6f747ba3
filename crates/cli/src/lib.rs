//! kp: command-line management of kpack builders, cluster builders and
//! cluster stacks. The binary is a thin wrapper over [`run`] so the whole
//! command surface can be driven against any [`ResourceStore`].

#![forbid(unsafe_code)]

use std::io::Write;

use anyhow::Result;
use kp_core::{ClusterBuilderSpec, NamespacedBuilderSpec};
use kp_kubehub::ResourceStore;
use tracing::warn;

pub mod cli;
pub mod cmd;
pub mod output;

pub use cli::Cli;
use cli::Commands;

pub async fn run<W: Write + ?Sized>(cli: Cli, store: &dyn ResourceStore, out: &mut W) -> Result<()> {
    let Cli { namespace, command } = cli;
    match command {
        Commands::Builder(args) => {
            let ns = namespace.unwrap_or_else(|| store.default_namespace().to_string());
            cmd::builder::dispatch::<NamespacedBuilderSpec, W>(store, Some(&ns), args.command, out).await
        }
        Commands::ClusterBuilder(args) => {
            ignore_namespace(namespace.as_deref());
            cmd::builder::dispatch::<ClusterBuilderSpec, W>(store, None, args.command, out).await
        }
        Commands::ClusterStack(args) => {
            ignore_namespace(namespace.as_deref());
            cmd::clusterstack::dispatch(store, args.command, out).await
        }
    }
}

fn ignore_namespace(namespace: Option<&str>) {
    if let Some(ns) = namespace {
        warn!(namespace = ns, "--namespace ignored for cluster-scoped kinds");
    }
}
