//! Currency rate abstractions and the two ways of resolving a rate.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::cache::Cache;
use crate::error::AppError;

/// Currency code to rate, all relative to one home currency.
pub type RateTable = HashMap<String, Decimal>;

/// Serves whole rate tables. `Ok(None)` when the home currency is unknown.
#[async_trait]
pub trait RateTableProvider: Send + Sync {
    async fn get_rates(&self, home: &str) -> Result<Option<RateTable>>;
}

/// Serves a single live rate. `Ok(None)` when the pair is not quoted.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<Option<Decimal>>;
}

/// The one seam the budget calculator depends on.
#[async_trait]
pub trait ExchangeRateResolver: Send + Sync {
    /// Rate such that `amount_in_home * rate = amount_in_target`.
    async fn resolve(&self, home: &str, target: &str) -> Result<Decimal, AppError>;
}

/// Fetches the full table for a home currency once and answers every
/// destination from it.
pub struct TableRateResolver<P: RateTableProvider> {
    provider: P,
    tables: Cache<String, Arc<RateTable>>,
}

impl<P: RateTableProvider> TableRateResolver<P> {
    pub fn new(provider: P, tables: Cache<String, Arc<RateTable>>) -> Self {
        Self { provider, tables }
    }

    async fn table_for(&self, home: &str) -> Result<Arc<RateTable>, AppError> {
        if let Some(table) = self.tables.get(&home.to_string()).await {
            return Ok(table);
        }

        debug!("Requesting rate table for {}", home);
        let table = self
            .provider
            .get_rates(home)
            .await?
            .ok_or_else(|| AppError::RateUnavailable(home.to_string()))?;
        let table = Arc::new(table);
        self.tables.put(home.to_string(), Arc::clone(&table)).await;
        Ok(table)
    }
}

#[async_trait]
impl<P: RateTableProvider> ExchangeRateResolver for TableRateResolver<P> {
    #[instrument(name = "TableRateResolve", skip(self))]
    async fn resolve(&self, home: &str, target: &str) -> Result<Decimal, AppError> {
        let home = home.to_uppercase();
        let target = target.to_uppercase();

        let table = self.table_for(&home).await?;
        table
            .get(&target)
            .copied()
            .ok_or(AppError::RateUnavailable(target))
    }
}

/// Asks the live provider for each pair, remembering answers for the
/// lifetime of the cache.
pub struct PairwiseRateResolver<P: CurrencyRateProvider> {
    provider: P,
    rates: Cache<String, Decimal>,
}

impl<P: CurrencyRateProvider> PairwiseRateResolver<P> {
    pub fn new(provider: P, rates: Cache<String, Decimal>) -> Self {
        Self { provider, rates }
    }
}

#[async_trait]
impl<P: CurrencyRateProvider> ExchangeRateResolver for PairwiseRateResolver<P> {
    #[instrument(name = "PairwiseRateResolve", skip(self))]
    async fn resolve(&self, home: &str, target: &str) -> Result<Decimal, AppError> {
        let home = home.to_uppercase();
        let target = target.to_uppercase();
        let key = format!("{home}-{target}");

        if let Some(rate) = self.rates.get(&key).await {
            return Ok(rate);
        }

        let rate = self
            .provider
            .get_rate(&home, &target)
            .await?
            .ok_or_else(|| AppError::RateUnavailable(target.clone()))?;
        self.rates.put(key, rate).await;
        Ok(rate)
    }
}
