//! Historical exchange rate series for a currency pair.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct HistoryRequest {
    #[validate(
        length(equal = 3, message = "from must be a 3-character ISO currency code."),
        custom(function = "crate::core::validation::validate_currency_code")
    )]
    pub from: String,

    #[validate(
        length(equal = 3, message = "to must be a 3-character ISO currency code."),
        custom(function = "crate::core::validation::validate_currency_code")
    )]
    pub to: String,

    #[validate(custom(function = "crate::core::validation::validate_history_days"))]
    pub days: i32,
}

/// How far back a history request reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Month,
    Quarter,
    Year,
}

impl Display for HistoryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}D", self.days())
    }
}

impl HistoryWindow {
    pub fn days(&self) -> i64 {
        match self {
            HistoryWindow::Month => 30,
            HistoryWindow::Quarter => 90,
            HistoryWindow::Year => 365,
        }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::days(self.days())
    }

    /// `(start, end)` with `end = today` and `start = today - days`.
    pub fn range_ending(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - self.to_duration(), today)
    }
}

impl TryFrom<i32> for HistoryWindow {
    type Error = anyhow::Error;

    fn try_from(days: i32) -> Result<Self, Self::Error> {
        match days {
            30 => Ok(HistoryWindow::Month),
            90 => Ok(HistoryWindow::Quarter),
            365 => Ok(HistoryWindow::Year),
            _ => Err(anyhow!("Invalid history window: {} days", days)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateDataPoint {
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// Per-date rate tables as the provider returns them. Date keys are
/// `YYYY-MM-DD` strings. Explicit `null`s read as empty.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RateTimeSeries {
    #[serde(deserialize_with = "null_as_default")]
    pub base: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rates: BTreeMap<String, HashMap<String, Decimal>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RateTimeSeries {
    /// Flattens to one point per date for `target`, ascending. Dates without
    /// a `target` entry, or with an unparseable key, are skipped.
    pub fn points_for(self, target: &str) -> Vec<ExchangeRateDataPoint> {
        self.rates
            .into_iter()
            .filter_map(|(date, rates)| {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
                let rate = rates.get(target).copied()?;
                Some((date, rate))
            })
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .map(|(date, rate)| ExchangeRateDataPoint { date, rate })
            .collect()
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn get_range(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateTimeSeries>;
}

pub struct HistoryFetcher {
    provider: Arc<dyn HistoryProvider>,
}

impl HistoryFetcher {
    pub fn new(provider: Arc<dyn HistoryProvider>) -> Self {
        Self { provider }
    }

    pub async fn fetch_history(
        &self,
        from: &str,
        to: &str,
        window: HistoryWindow,
    ) -> Result<Vec<ExchangeRateDataPoint>, AppError> {
        self.fetch_history_until(from, to, window, Utc::now().date_naive())
            .await
    }

    /// Same as [`HistoryFetcher::fetch_history`] with an explicit end date.
    pub async fn fetch_history_until(
        &self,
        from: &str,
        to: &str,
        window: HistoryWindow,
        today: NaiveDate,
    ) -> Result<Vec<ExchangeRateDataPoint>, AppError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        let (start, end) = window.range_ending(today);
        info!(
            "Fetching {} exchange rate history from {} to {} ({} to {})",
            window, from, to, start, end
        );

        let series = match self.provider.get_range(&from, &to, start, end).await {
            Ok(series) => series,
            Err(e) => {
                error!(
                    error = %e,
                    from = %from,
                    to = %to,
                    start = %start,
                    end = %end,
                    "Failed to fetch historical exchange rates"
                );
                return Err(AppError::Upstream(e));
            }
        };

        let points = series.points_for(&to);
        if points.is_empty() {
            warn!(
                "No historical rates returned for {} to {} from {} to {}",
                from, to, start, end
            );
        }
        Ok(points)
    }
}
