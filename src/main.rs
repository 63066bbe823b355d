mod cli;
mod output;
mod passages;
mod pipeline;
mod taxonomy;
mod xml;
mod yandex;

pub const USER_AGENT: &str = concat!("taxosearch/", env!("CARGO_PKG_VERSION"));

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::error;

use cli::Cli;
use pipeline::{Pipeline, RunOutcome};
use yandex::{Credentials, YandexClient};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Exit status when the run stopped at a failing line.
const EXIT_HALTED: u8 = 3;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taxosearch=info".parse()?),
        )
        .init();

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let client = YandexClient::new(http, Credentials::new(cli.username, cli.key));

    let outcome = Pipeline::new(client)
        .run(&cli.taxonomy, &cli.output)
        .await
        .inspect_err(|e| error!("{e}"))?;

    Ok(match outcome {
        RunOutcome::Completed { .. } => ExitCode::SUCCESS,
        RunOutcome::Halted { .. } => ExitCode::from(EXIT_HALTED),
    })
}
