use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::util::HttpSettings;
use crate::core::currency::{RateTable, RateTableProvider};

/// Batch rate tables from the open.er-api.com `latest` endpoint.
pub struct OpenErApiProvider {
    base_url: String,
    client: Client,
    settings: HttpSettings,
}

impl OpenErApiProvider {
    pub fn new(base_url: &str, settings: HttpSettings) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: settings.client()?,
            settings,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

#[async_trait]
impl RateTableProvider for OpenErApiProvider {
    #[instrument(name = "OpenErApiRates", skip(self))]
    async fn get_rates(&self, home: &str) -> Result<Option<RateTable>> {
        let url = format!("{}/v6/latest/{}", self.base_url, home);
        let response = self.settings.get(&self.client, &url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for rate table: {}", status, home));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", home, e))?;

        if data.result != "success" {
            return match data.error_type.as_deref() {
                Some("unsupported-code") => {
                    debug!("Home currency {} is not supported", home);
                    Ok(None)
                }
                other => Err(anyhow!(
                    "Rate table request for {} failed: {}",
                    home,
                    other.unwrap_or("unknown error")
                )),
            };
        }

        debug!("Received {} rates for {}", data.rates.len(), home);
        Ok(Some(data.rates))
    }
}
