//! Command-line interface definitions for the `e24cloud-driver` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Machine name used when `--name` is omitted.
pub(crate) const DEFAULT_MACHINE_NAME: &str = "docker-host";

/// Top-level CLI for the `e24cloud-driver` binary.
#[derive(Debug, Parser)]
#[command(
    name = "e24cloud-driver",
    about = "Provision and manage e24cloud virtual machines",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create a machine and wait for its public address.
    #[command(name = "create", about = "Create a machine and wait for its public address")]
    Create(CreateCommand),
    /// Print a machine's state.
    #[command(name = "state", about = "Print a machine's state")]
    State(MachineArgs),
    /// Power a machine on.
    #[command(name = "start", about = "Power a machine on")]
    Start(MachineArgs),
    /// Shut a machine down.
    #[command(name = "stop", about = "Shut a machine down")]
    Stop(MachineArgs),
    /// Reboot a machine.
    #[command(name = "restart", about = "Reboot a machine")]
    Restart(MachineArgs),
    /// Delete a machine.
    #[command(name = "rm", about = "Delete a machine")]
    Rm(MachineArgs),
    /// Print a machine's public address.
    #[command(name = "ip", about = "Print a machine's public address")]
    Ip(MachineArgs),
    /// List operating system templates.
    #[command(name = "templates", about = "List operating system templates")]
    Templates,
    /// List regions.
    #[command(name = "regions", about = "List regions")]
    Regions,
}

/// Arguments for `e24cloud-driver create`.
#[derive(Debug, Parser)]
pub(crate) struct CreateCommand {
    /// Name shown in the e24cloud console.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_MACHINE_NAME)]
    pub(crate) name: String,
    /// Copy the configured private key here with mode 0600.
    #[arg(long, value_name = "PATH")]
    pub(crate) key_destination: Option<String>,
}

/// Arguments for commands acting on an existing machine.
#[derive(Debug, Parser)]
pub(crate) struct MachineArgs {
    /// Machine identifier returned by `create`.
    #[arg(long, value_name = "ID")]
    pub(crate) id: String,
}
