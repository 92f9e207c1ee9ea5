pub mod api;
pub mod core;
pub mod error;
pub mod providers;
pub mod setup;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::api::{AppState, create_router};
use crate::core::cache::Cache;
use crate::core::config::{AppConfig, RateStrategy};
use crate::core::currency::{ExchangeRateResolver, PairwiseRateResolver, TableRateResolver};
use crate::core::{BudgetCalculator, CountryResolver, HistoryFetcher};
use crate::providers::{
    FrankfurterProvider, HttpSettings, OpenErApiProvider, RestCountriesProvider,
};

/// Wires the providers, caches and resolvers described by `config`.
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let settings = HttpSettings::from(&config.providers);
    let ttl = config.cache.ttl();

    let directory = Arc::new(RestCountriesProvider::new(
        &config.providers.countries.base_url,
        settings.clone(),
    )?);
    let countries = CountryResolver::new(Cache::new(), directory.clone());
    if config.countries.preload {
        match directory.fetch_all().await {
            Ok(all) => {
                let count = countries.warm(all).await;
                info!("Preloaded {} countries", count);
            }
            Err(e) => warn!(error = %e, "Country preload failed, falling back to live lookups"),
        }
    }

    let rates: Arc<dyn ExchangeRateResolver> = match config.rates.strategy {
        RateStrategy::Table => Arc::new(TableRateResolver::new(
            OpenErApiProvider::new(&config.providers.rates.base_url, settings.clone())?,
            Cache::with_ttl(ttl),
        )),
        RateStrategy::Pairwise => Arc::new(PairwiseRateResolver::new(
            FrankfurterProvider::new(&config.providers.frankfurter.base_url, settings.clone())?,
            Cache::with_ttl(ttl),
        )),
    };
    debug!("Using {:?} rate strategy", config.rates.strategy);

    let history = FrankfurterProvider::new(&config.providers.frankfurter.base_url, settings)?;

    Ok(AppState {
        calculator: Arc::new(
            BudgetCalculator::new(Arc::new(countries), rates)
                .with_parallel_lookups(config.budget.parallel_lookups),
        ),
        history: Arc::new(HistoryFetcher::new(Arc::new(history))),
    })
}

/// Binds the configured address and serves the API until the process exits.
pub async fn serve(config: AppConfig) -> Result<()> {
    let state = build_state(&config).await?;
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Travel budget service starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    serve(config).await
}
