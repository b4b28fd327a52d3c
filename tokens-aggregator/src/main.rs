use std::{process::ExitCode, sync::Arc, time::Instant};

use clap::Parser;
use rust_utils::{
    settings::{try_read_file_config, DEFAULT_SETTINGS_FILE},
    telemetry::Telemetry,
};
use tokens_aggregator::{
    advisory::{AdvisoryLog, FileAdvisoryLog},
    chains,
    pipeline::report_failure,
    run_reported,
    settings::{AggregatorSettings, Credentials, ENV_PREFIX},
    Aggregator, AggregatorError, RunOutcome,
};

/// Aggregates the top tokens of every supported chain with on-chain metadata.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Process only this chain
    chain: Option<String>,

    /// Settings file, layered under `AGGREGATOR__*` environment variables
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let settings: AggregatorSettings = try_read_file_config::<_, AggregatorError>(&args.config, ENV_PREFIX)?;

    let subscriber = Telemetry::init("tokens-aggregator".into(), &settings.tracing);
    Telemetry::init_subscriber(subscriber)?;

    if let Err(err) = chains::select(&settings.chains, args.chain.as_deref()) {
        eprintln!("{err}");
        return Ok(RunOutcome::UnknownChain.into());
    }

    let credentials = Credentials::resolve(&settings)?;
    let errors = FileAdvisoryLog::new(settings.logs_dir());
    let advisory: Arc<dyn AdvisoryLog> = Arc::new(errors.clone());

    let started = Instant::now();
    tracing::info!("starting token data aggregation with metadata enrichment");

    let outcome = match Aggregator::from_settings(&settings, &credentials, advisory) {
        Ok(aggregator) => run_reported(&aggregator, args.chain.as_deref(), &errors).await,
        Err(err) => report_failure(&errors, &format!("{err:#}")),
    };

    if outcome == RunOutcome::Completed {
        let elapsed = started.elapsed().as_secs();
        let (hours, minutes, seconds) = (elapsed / 3600, elapsed / 60 % 60, elapsed % 60);
        tracing::info!("data aggregation completed successfully in {hours}h {minutes}m {seconds}s");
    }

    Ok(outcome.into())
}
