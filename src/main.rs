//! Binary entry point for the e24cloud driver CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use e24cloud_driver::{
    ApiError, ConfigError, DriverConfig, DriverError, E24Client, E24Driver, MachineDriver,
};

mod cli;

use cli::{Cli, CreateCommand, MachineArgs};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("e24cloud request failed: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Driver(#[from] DriverError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = DriverConfig::load_without_cli_args()?;
    execute(cli, config, &mut io::stdout()).await
}

async fn execute<W>(cli: Cli, config: DriverConfig, out: &mut W) -> Result<(), CliError>
where
    W: Write + Send,
{
    let client = config.client()?;
    match cli {
        Cli::Create(command) => create(client, config, command, out).await,
        Cli::State(MachineArgs { id }) => {
            let state = attach(client, config, id).current_state().await?;
            writeln!(out, "{state}")?;
            Ok(())
        }
        Cli::Start(MachineArgs { id }) => Ok(attach(client, config, id).start().await?),
        Cli::Stop(MachineArgs { id }) => Ok(attach(client, config, id).stop().await?),
        Cli::Restart(MachineArgs { id }) => Ok(attach(client, config, id).restart().await?),
        Cli::Rm(MachineArgs { id }) => Ok(attach(client, config, id).destroy().await?),
        Cli::Ip(MachineArgs { id }) => {
            let address = attach(client, config, id).refresh_address().await?;
            if let Some(ip) = address {
                writeln!(out, "{ip}")?;
            }
            Ok(())
        }
        Cli::Templates => {
            for template in client.templates().await? {
                writeln!(out, "{}\t{}", template.id, template.name)?;
            }
            Ok(())
        }
        Cli::Regions => {
            for region in client.regions().await? {
                writeln!(out, "{}\t{}", region.id, region.name)?;
            }
            Ok(())
        }
    }
}

fn attach(client: E24Client, config: DriverConfig, id: String) -> E24Driver<E24Client> {
    E24Driver::new(client, config, cli::DEFAULT_MACHINE_NAME).with_machine(id)
}

async fn create<W>(
    client: E24Client,
    config: DriverConfig,
    command: CreateCommand,
    out: &mut W,
) -> Result<(), CliError>
where
    W: Write + Send,
{
    let mut driver = E24Driver::new(client, config, command.name);
    if let Some(path) = command.key_destination {
        driver = driver.with_key_destination(path);
    }
    driver.create().await?;

    writeln!(out, "id\t{}", driver.machine_id().unwrap_or_default())?;
    if let Some(address) = driver.address() {
        writeln!(out, "address\t{address}")?;
    }
    if let Some(url) = driver.docker_url() {
        writeln!(out, "docker\t{url}")?;
    }
    writeln!(out, "ssh_user\t{}", driver.ssh_username())?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
