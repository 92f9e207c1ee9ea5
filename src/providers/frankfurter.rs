use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use super::util::HttpSettings;
use crate::core::currency::CurrencyRateProvider;
use crate::core::history::{HistoryProvider, RateTimeSeries};

/// ECB reference rates from the Frankfurter API. Serves both live pairs
/// and date-range series.
pub struct FrankfurterProvider {
    base_url: String,
    client: Client,
    settings: HttpSettings,
}

impl FrankfurterProvider {
    pub fn new(base_url: &str, settings: HttpSettings) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: settings.client()?,
            settings,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

#[async_trait]
impl CurrencyRateProvider for FrankfurterProvider {
    #[instrument(name = "FrankfurterLatest", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<Option<Decimal>> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(Some(Decimal::ONE));
        }

        let url = format!("{}/latest?from={}&to={}", self.base_url, from, to);
        let response = self.settings.get(&self.client, &url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Pair {} to {} is not quoted", from, to);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(anyhow!(
                "HTTP error: {} for pair: {} to {}",
                status,
                from,
                to
            ));
        }

        let text = response.text().await?;
        let data: LatestResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow!("Failed to parse JSON response for {} to {}: {}", from, to, e)
        })?;
        Ok(data.rates.get(to).copied())
    }
}

#[async_trait]
impl HistoryProvider for FrankfurterProvider {
    #[instrument(name = "FrankfurterRange", skip(self))]
    async fn get_range(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateTimeSeries> {
        let url = format!(
            "{}/{}..{}?from={}&to={}",
            self.base_url,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            from,
            to
        );
        let response = self.settings.get(&self.client, &url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("No series for {} to {}", from, to);
            return Ok(RateTimeSeries::default());
        }
        if !status.is_success() {
            return Err(anyhow!(
                "HTTP error: {} for history: {} to {}",
                status,
                from,
                to
            ));
        }

        // An empty, null or unreadable body means no data for the range
        let text = response.text().await?;
        let series = match serde_json::from_str::<Option<RateTimeSeries>>(&text) {
            Ok(series) => series.unwrap_or_default(),
            Err(e) => {
                warn!(
                    "Discarding unreadable history response for {} to {}: {}",
                    from, to, e
                );
                RateTimeSeries::default()
            }
        };
        debug!("Received {} dated tables", series.rates.len());
        Ok(series)
    }
}
