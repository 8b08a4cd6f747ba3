use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "kp", version, about = "Manage kpack builders, cluster builders and cluster stacks")]
pub struct Cli {
    /// Kubernetes namespace for namespaced kinds (default: current context)
    #[arg(short = 'n', long = "namespace", global = true)]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Builder commands (namespaced)
    Builder(BuilderArgs),
    /// Cluster builder commands
    #[command(name = "clusterbuilder")]
    ClusterBuilder(BuilderArgs),
    /// Cluster stack commands
    #[command(name = "clusterstack")]
    ClusterStack(StackArgs),
}

#[derive(Args, Debug)]
pub struct BuilderArgs {
    #[command(subcommand)]
    pub command: BuilderCommand,
}

#[derive(Subcommand, Debug)]
pub enum BuilderCommand {
    /// Create a builder
    Create(BuilderCreateArgs),
    /// Patch an existing builder configuration
    Patch(BuilderPatchArgs),
    /// Delete a builder
    Delete(DeleteArgs),
    /// Display builder status
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuilderFlags {
    /// Registry location where the builder will be created
    #[arg(short = 't', long)]
    pub tag: Option<String>,
    /// Stack resource to use
    #[arg(short = 's', long)]
    pub stack: Option<String>,
    /// Buildpack store to use
    #[arg(long)]
    pub store: Option<String>,
    /// Path to buildpack order yaml
    #[arg(long)]
    pub order: Option<PathBuf>,
    /// Buildpack id and optional version (id@version); each flag is one group, commas separate buildpacks in it
    #[arg(short = 'b', long = "buildpack", action = ArgAction::Append)]
    pub buildpacks: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WriteFlags {
    /// Only print what would be written, without writing it
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    pub dry_run: bool,
    /// Print the resulting resource instead of a message
    #[arg(long = "output", value_enum)]
    pub output: Option<OutputFormat>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat { Yaml, Json }

#[derive(Args, Debug)]
pub struct BuilderCreateArgs {
    /// Builder name
    pub name: String,
    #[command(flatten)]
    pub flags: BuilderFlags,
    /// Service account the builder uses (default: canonical service account)
    #[arg(long = "service-account")]
    pub service_account: Option<String>,
    #[command(flatten)]
    pub write: WriteFlags,
}

#[derive(Args, Debug)]
pub struct BuilderPatchArgs {
    /// Builder name
    pub name: String,
    #[command(flatten)]
    pub flags: BuilderFlags,
    #[command(flatten)]
    pub write: WriteFlags,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Resource name
    pub name: String,
    /// Check the resource exists without deleting it
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Resource name
    pub name: String,
    /// Include extra detail (mixins, buildpack groups)
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct StackArgs {
    #[command(subcommand)]
    pub command: StackCommand,
}

#[derive(Subcommand, Debug)]
pub enum StackCommand {
    /// Create a cluster stack
    Create(StackCreateArgs),
    /// Patch an existing cluster stack
    Patch(StackPatchArgs),
    /// Delete a cluster stack
    Delete(DeleteArgs),
    /// Display cluster stack status
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct StackCreateArgs {
    /// Cluster stack name
    pub name: String,
    /// Stack id, e.g. io.buildpacks.stacks.bionic
    #[arg(long)]
    pub id: String,
    /// Build image reference
    #[arg(long = "build-image")]
    pub build_image: String,
    /// Run image reference
    #[arg(long = "run-image")]
    pub run_image: String,
    #[command(flatten)]
    pub write: WriteFlags,
}

#[derive(Args, Debug)]
pub struct StackPatchArgs {
    /// Cluster stack name
    pub name: String,
    /// Stack id
    #[arg(long)]
    pub id: Option<String>,
    /// Build image reference
    #[arg(long = "build-image")]
    pub build_image: Option<String>,
    /// Run image reference
    #[arg(long = "run-image")]
    pub run_image: Option<String>,
    #[command(flatten)]
    pub write: WriteFlags,
}
