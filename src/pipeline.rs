// Fetch-then-aggregate run: both datasets go through the cache before the statistics are computed

use crate::analytics::{self, AggregateReport};
use crate::cache::{DatasetCache, FINANCIALS_DATASET, RESERVATIONS_DATASET};
use crate::config::ClientConfig;
use crate::{graphql, rest_api};
use anyhow::Context;

pub async fn run(config: &ClientConfig) -> anyhow::Result<AggregateReport> {
    let cache = DatasetCache::new(&config.cache_dir);

    let reservations = cache
        .fetch_or_load(RESERVATIONS_DATASET, || rest_api::fetch_reservations(config))
        .await
        .context("failed to fetch reservations")?;

    let financials = cache
        .fetch_or_load(FINANCIALS_DATASET, || graphql::fetch_financials(config))
        .await
        .context("failed to fetch financials")?;

    analytics::calculate(&reservations, &financials, &config.thresholds)
        .context("failed to calculate interesting facts")
}
