//! Command implementations

pub mod create;
pub mod delete;
pub mod get;
pub mod install;

use clap::Args;

/// Name of the cluster used when `--name` is not given.
pub const DEFAULT_CLUSTER_NAME: &str = "kind";

/// Arguments selecting an existing cluster.
#[derive(Args, Debug)]
pub struct ClusterNameArgs {
    /// Cluster name
    #[arg(long, default_value = DEFAULT_CLUSTER_NAME)]
    pub name: String,
}
