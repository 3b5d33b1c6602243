//! Binary entry point for the Varta CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use varta::{
    AwsApi, AwsConfig, DiscoveryEngine, DiscoveryError, DiscoveryRequest, ResourceKind,
};

mod cli;
use cli::{Cli, DiscoverCommand, KindArg, RegionsCommand};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("failed to render output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            if matches!(err, CliError::Discovery(DiscoveryError::Cancelled)) {
                EXIT_INTERRUPTED
            } else {
                EXIT_FAILURE
            }
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Discover(command) => run_discover(command).await,
        Cli::Regions(command) => run_regions(command).await,
    }
}

fn build_engine() -> Result<DiscoveryEngine<AwsApi>, CliError> {
    let config =
        AwsConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let api = AwsApi::new(&config).map_err(|err| CliError::Provider(err.to_string()))?;
    Ok(DiscoveryEngine::new(api))
}

/// Returns a token that fires when the user interrupts the process.
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

async fn run_discover(command: DiscoverCommand) -> Result<i32, CliError> {
    let engine = build_engine()?;
    let request = build_request(&command);
    let cancel = cancel_on_interrupt();

    let result = engine.discover(&request, &cancel).await?;

    let mut stdout = io::stdout();
    if command.json {
        let rendered = serde_json::to_string_pretty(&result)
            .map_err(|err| CliError::Output(err.to_string()))?;
        writeln!(stdout, "{rendered}").map_err(|err| CliError::Output(err.to_string()))?;
    } else {
        for identifier in &result.identifiers {
            writeln!(stdout, "{identifier}").map_err(|err| CliError::Output(err.to_string()))?;
        }
    }

    Ok(0)
}

async fn run_regions(command: RegionsCommand) -> Result<i32, CliError> {
    let engine = build_engine()?;
    let regions = engine.enabled_regions().await?;

    let mut stdout = io::stdout();
    if command.json {
        let rendered = serde_json::to_string_pretty(&regions)
            .map_err(|err| CliError::Output(err.to_string()))?;
        writeln!(stdout, "{rendered}").map_err(|err| CliError::Output(err.to_string()))?;
    } else {
        for region in &regions {
            writeln!(stdout, "{region}").map_err(|err| CliError::Output(err.to_string()))?;
        }
    }

    Ok(0)
}

fn build_request(command: &DiscoverCommand) -> DiscoveryRequest {
    let kinds: Vec<ResourceKind> = if command.kinds.is_empty() {
        ResourceKind::ALL.to_vec()
    } else {
        command.kinds.iter().map(|kind| resource_kind(*kind)).collect()
    };

    let mut request = DiscoveryRequest::new().with_kinds(kinds);
    if let Some(regions) = &command.regions {
        request = request.with_regions(regions.clone());
    }
    request
}

const fn resource_kind(kind: KindArg) -> ResourceKind {
    match kind {
        KindArg::Instances => ResourceKind::ComputeInstances,
        KindArg::LoadBalancers => ResourceKind::LoadBalancers,
        KindArg::Subnets => ResourceKind::Subnets,
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
