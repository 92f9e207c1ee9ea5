//! Country metadata and the cache-then-live lookup chain.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::cache::Cache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    /// ISO 3166-1 alpha-2 code, upper case.
    pub code: String,
    pub name: String,
    /// ISO 4217 code, upper case.
    pub currency_code: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub flag_url: String,
}

/// A country directory that may not know every code.
#[async_trait]
pub trait CountryProvider: Send + Sync {
    async fn get_by_code(&self, code: &str) -> Result<Option<Country>>;
}

pub struct CountryResolver {
    cache: Cache<String, Country>,
    live: Arc<dyn CountryProvider>,
}

impl CountryResolver {
    pub fn new(cache: Cache<String, Country>, live: Arc<dyn CountryProvider>) -> Self {
        Self { cache, live }
    }

    /// Tries the cache, then the live directory. `Ok(None)` means neither
    /// knows the code; deciding whether that is an error is up to the caller.
    #[instrument(name = "CountryResolve", skip(self))]
    pub async fn resolve(&self, code: &str) -> Result<Option<Country>> {
        let key = code.to_uppercase();
        if let Some(country) = self.cache.get(&key).await {
            return Ok(Some(country));
        }

        debug!("Falling back to live country lookup");
        let found = self.live.get_by_code(&key).await?;
        if let Some(country) = &found {
            self.cache.put(key, country.clone()).await;
        }
        Ok(found)
    }

    /// Seeds the cache, returning how many entries were written.
    pub async fn warm(&self, countries: Vec<Country>) -> usize {
        let count = countries.len();
        for country in countries {
            self.cache.put(country.code.to_uppercase(), country).await;
        }
        count
    }
}
