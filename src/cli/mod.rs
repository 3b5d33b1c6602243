//! Command-line interface definitions for the `varta` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, ValueEnum};

/// Top-level CLI for the `varta` binary.
#[derive(Debug, Parser)]
#[command(
    name = "varta",
    about = "Discover publicly exposed cloud resources across an account's regions",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Scan regions for publicly exposed resources.
    #[command(
        name = "discover",
        about = "Scan regions for publicly exposed resources"
    )]
    Discover(DiscoverCommand),
    /// List the regions enabled for the account.
    #[command(name = "regions", about = "List the regions enabled for the account")]
    Regions(RegionsCommand),
}

/// Arguments for the `varta discover` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct DiscoverCommand {
    /// Region to scan; repeat the flag to scan several.
    ///
    /// When omitted entirely, every region enabled for the account is
    /// scanned.
    #[arg(long = "region", value_name = "REGION")]
    pub(crate) regions: Option<Vec<String>>,
    /// Resource kind to discover; repeat the flag to select several.
    ///
    /// When omitted, all kinds are discovered.
    #[arg(long = "kind", value_enum, value_name = "KIND")]
    pub(crate) kinds: Vec<KindArg>,
    /// Emit the full result as JSON instead of one identifier per line.
    #[arg(long)]
    pub(crate) json: bool,
}

/// Arguments for the `varta regions` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct RegionsCommand {
    /// Emit the region list as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

/// Resource kind selection accepted by `--kind`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum KindArg {
    /// Compute instances with a public address.
    Instances,
    /// Internet-facing load balancers of either API generation.
    LoadBalancers,
    /// Subnets that auto-assign public addresses at launch.
    Subnets,
}
