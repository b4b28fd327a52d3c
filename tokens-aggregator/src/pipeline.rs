use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::{DateTime, Utc};
use coingecko_client::CoingeckoClient;
use http_client::{settings::HttpClientSettings, RetryingFetcher};

use crate::{
    advisory::{AdvisoryCategory, AdvisoryLog, FileAdvisoryLog},
    bucket::{self, TokenRecord},
    catalog::CatalogIndex,
    chains::{self, ChainDefinition},
    error::{AggregatorError, AggregatorResult},
    images::ImageCache,
    metadata::{Enricher, EnrichmentSummary},
    reconcile::StateDiff,
    settings::{AggregatorSettings, Credentials},
    store::{BucketStore, FinalRecord},
};

/// What happened to one chain during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub chain: String,
    pub tokens: usize,
    pub added: usize,
    pub removed: usize,
    pub failed_images: Vec<String>,
    pub enrichment: EnrichmentSummary,
    pub path: PathBuf,
}

/// How a run ended, as seen by the operator.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunOutcome {
    Completed,
    /// The requested chain is not configured; nothing was fetched.
    UnknownChain,
    /// Logged to `error.log`; buckets not yet rebuilt keep their previous state.
    Failed,
}

impl From<RunOutcome> for ExitCode {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => ExitCode::SUCCESS,
            RunOutcome::UnknownChain => ExitCode::from(2),
            RunOutcome::Failed => ExitCode::FAILURE,
        }
    }
}

/// Runs `aggregator` and turns any error into an `error.log` line and a [`RunOutcome`].
pub async fn run_reported(aggregator: &Aggregator, only: Option<&str>, errors: &FileAdvisoryLog) -> RunOutcome {
    match only {
        Some(chain) => tracing::info!(%chain, "processing only one chain"),
        None => tracing::info!(chains = %chains::names(aggregator.chains()), "processing all chains"),
    }

    let reports = match aggregator.run(only).await {
        Ok(reports) => reports,
        Err(err @ AggregatorError::UnknownChain { .. }) => {
            eprintln!("{err}");
            return RunOutcome::UnknownChain;
        },
        Err(err) => return report_failure(errors, &err.to_string()),
    };

    for report in &reports {
        tracing::info!(
            chain = %report.chain,
            tokens = report.tokens,
            added = report.added,
            removed = report.removed,
            failed_images = report.failed_images.len(),
            enrichment = %report.enrichment,
            path = %report.path.display(),
            "chain done"
        );
    }

    let enriched: Vec<_> = aggregator
        .enriched_chains()
        .map(|chain| chain.name.as_str())
        .collect();
    tracing::info!(chains = %enriched.join(", "), "chains with metadata enrichment");

    RunOutcome::Completed
}

/// Records a fatal error in `error.log`.
pub fn report_failure(errors: &FileAdvisoryLog, message: &str) -> RunOutcome {
    tracing::error!("error during data aggregation: {message}");
    errors.record(AdvisoryCategory::Error, "ERROR", message);
    eprintln!(
        "Process failed. See {} for details.",
        errors.path(AdvisoryCategory::Error).display()
    );
    RunOutcome::Failed
}

pub struct Aggregator {
    coingecko: CoingeckoClient,
    enricher: Enricher,
    images: ImageCache,
    store: BucketStore,
    advisory: Arc<dyn AdvisoryLog>,
    chains: Vec<ChainDefinition>,
    chain_pause: Duration,
    extract_time: DateTime<Utc>,
}

impl Aggregator {
    pub fn new(
        coingecko: CoingeckoClient,
        enricher: Enricher,
        images: ImageCache,
        store: BucketStore,
        advisory: Arc<dyn AdvisoryLog>,
        chains: Vec<ChainDefinition>,
    ) -> Self {
        Self {
            coingecko,
            enricher,
            images,
            store,
            advisory,
            chains,
            chain_pause: Duration::from_secs(1),
            extract_time: Utc::now(),
        }
    }

    pub fn from_settings(
        settings: &AggregatorSettings,
        credentials: &Credentials,
        advisory: Arc<dyn AdvisoryLog>,
    ) -> anyhow::Result<Self> {
        let coingecko_http = HttpClientSettings {
            api_key: Some(credentials.coingecko_api_key.clone()),
            ..settings.coingecko.http.clone()
        };
        let retry = settings.catalog_retry.clone();
        let mut coingecko = if settings.coingecko.pro {
            CoingeckoClient::new_pro(&coingecko_http, retry)?
        } else {
            CoingeckoClient::new(&coingecko_http, retry)?
        };
        if let Some(per_page) = settings.coingecko.per_page {
            coingecko = coingecko.with_per_page(per_page);
        }

        let client = reqwest::Client::try_from(&settings.alchemy).context("Unable to build metadata client")?;
        let fetcher = RetryingFetcher::new(client.clone(), settings.metadata_retry.clone(), "metadata");
        let enricher = Enricher::from_chains(
            &settings.chains,
            &fetcher,
            &credentials.alchemy_api_key,
            &settings.sui_rpc_url,
            advisory.clone(),
        );

        let aggregator = Self::new(
            coingecko,
            enricher,
            ImageCache::new(client, advisory.clone()),
            BucketStore::new(&settings.output_dir),
            advisory,
            settings.chains.clone(),
        )
        .with_chain_pause(settings.chain_pause);

        Ok(aggregator)
    }

    pub fn with_chain_pause(mut self, chain_pause: Duration) -> Self {
        self.chain_pause = chain_pause;
        self
    }

    pub fn with_extract_time(mut self, extract_time: DateTime<Utc>) -> Self {
        self.extract_time = extract_time;
        self
    }

    pub fn chains(&self) -> &[ChainDefinition] {
        &self.chains
    }

    /// Chains that have a metadata provider.
    pub fn enriched_chains(&self) -> impl Iterator<Item = &ChainDefinition> {
        self.chains.iter().filter(|chain| self.enricher.supports(&chain.name))
    }

    /// Rebuilds the bucket of every chain, or only of `only` when given.
    ///
    /// Both upstream datasets are fetched before any chain is touched, so a failed fetch leaves
    /// every bucket as it was.
    pub async fn run(&self, only: Option<&str>) -> AggregatorResult<Vec<ChainReport>> {
        let selected = chains::select(&self.chains, only)?;

        let index = CatalogIndex::build(self.coingecko.coins_list_with_platforms().await?);
        if index.is_empty() {
            return Err(AggregatorError::EmptyCatalog);
        }
        tracing::info!(coins = index.len(), "indexed coins list");

        let ranking = self
            .coingecko
            .all_coins_by_market_cap(|coins| self.advisory.checkpoint(coins))
            .await?;
        if ranking.is_empty() {
            return Err(AggregatorError::EmptyRanking);
        }

        tracing::info!("filling chain buckets based on platform affiliations");
        let mut buckets = bucket::partition(&ranking, &index, &selected);

        let mut reports = Vec::with_capacity(selected.len());
        for (position, chain) in selected.iter().enumerate() {
            if position > 0 && !self.chain_pause.is_zero() {
                tracing::info!(pause = ?self.chain_pause, "waiting before processing the next chain");
                tokio::time::sleep(self.chain_pause).await;
            }

            let candidates = buckets.remove(&chain.name).unwrap_or_default();
            reports.push(self.process_chain(&chain.name, candidates).await?);
        }

        Ok(reports)
    }

    #[tracing::instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    async fn process_chain(&self, chain: &str, candidates: Vec<TokenRecord>) -> AggregatorResult<ChainReport> {
        let mut tokens = bucket::top_tokens(candidates);

        self.store.prepare(chain)?;
        let images_dir = self.store.images_dir(chain);
        let previous_ids = self.store.previous_ids(chain);

        let (added, removed, failed_images) = {
            let diff = StateDiff::compute(&previous_ids, &tokens);
            tracing::info!(added = diff.added.len(), removed = diff.removed.len(), "compared with previous state");

            let removed = self.images.remove(&images_dir, &diff.removed).await;
            let failed_images = self.images.download_new(&images_dir, &diff.added).await;
            (diff.added.len(), removed, failed_images)
        };

        let enrichment = self.enricher.enrich_all(chain, &mut tokens).await;

        let records: Vec<_> = tokens
            .iter()
            .map(|token| FinalRecord::finalise(token, self.extract_time))
            .collect();
        let path = self.store.save(chain, &records)?;

        Ok(ChainReport {
            chain: chain.to_owned(),
            tokens: records.len(),
            added,
            removed,
            failed_images,
            enrichment,
            path,
        })
    }
}
