use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use super::util::HttpSettings;
use crate::core::country::{Country, CountryProvider};

/// Live country directory backed by the REST Countries v3.1 API.
pub struct RestCountriesProvider {
    base_url: String,
    client: Client,
    settings: HttpSettings,
}

impl RestCountriesProvider {
    pub fn new(base_url: &str, settings: HttpSettings) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: settings.client()?,
            settings,
        })
    }

    /// Every country the directory knows that has a currency. Used to warm
    /// the country cache.
    #[instrument(name = "RestCountriesAll", skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Country>> {
        let url = format!(
            "{}/v3.1/all?fields=cca2,name,currencies,flags",
            self.base_url
        );
        let response = self.settings.get(&self.client, &url).await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} while listing countries",
                response.status()
            ));
        }

        let text = response.text().await?;
        let countries: Vec<RestCountry> = serde_json::from_str(&text)
            .context("Failed to parse JSON response for country listing")?;
        let total = countries.len();
        let converted: Vec<Country> = countries
            .into_iter()
            .filter_map(RestCountry::into_country)
            .collect();
        debug!(
            "Listed {} countries, {} with a currency",
            total,
            converted.len()
        );
        Ok(converted)
    }
}

#[derive(Debug, Deserialize)]
struct RestCountry {
    cca2: String,
    name: RestCountryName,
    #[serde(default)]
    currencies: BTreeMap<String, RestCurrency>,
    #[serde(default)]
    flags: RestFlags,
}

#[derive(Debug, Deserialize)]
struct RestCountryName {
    common: String,
}

#[derive(Debug, Deserialize)]
struct RestCurrency {
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Default, Deserialize)]
struct RestFlags {
    #[serde(default)]
    png: String,
    #[serde(default)]
    svg: String,
}

impl RestCountry {
    /// Countries with several currencies use the first in code order.
    fn into_country(self) -> Option<Country> {
        let (currency_code, currency) = self.currencies.into_iter().next()?;
        let flag_url = if self.flags.png.is_empty() {
            self.flags.svg
        } else {
            self.flags.png
        };
        Some(Country {
            code: self.cca2.to_uppercase(),
            name: self.name.common,
            currency_code: currency_code.to_uppercase(),
            currency_name: currency.name,
            currency_symbol: currency.symbol,
            flag_url,
        })
    }
}

#[async_trait]
impl CountryProvider for RestCountriesProvider {
    #[instrument(name = "RestCountriesLookup", skip(self))]
    async fn get_by_code(&self, code: &str) -> Result<Option<Country>> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            debug!("Not a country code: {:?}", code);
            return Ok(None);
        }

        let url = format!("{}/v3.1/alpha/{}", self.base_url, code);
        let response = self.settings.get(&self.client, &url).await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                debug!("Directory does not know country code {}", code);
                return Ok(None);
            }
            status if !status.is_success() => {
                return Err(anyhow!(
                    "HTTP error: {} for country code: {}",
                    status,
                    code
                ));
            }
            _ => {}
        }

        let text = response.text().await?;
        let countries: Vec<RestCountry> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", code, e))?;

        let found = countries
            .into_iter()
            .find(|c| c.cca2.eq_ignore_ascii_case(code));
        match found {
            Some(country) => {
                let converted = country.into_country();
                if converted.is_none() {
                    warn!("Country {} has no currency", code);
                }
                Ok(converted)
            }
            None => Ok(None),
        }
    }
}
