//! Trip budget calculation across destination countries.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::core::country::{Country, CountryResolver};
use crate::core::currency::ExchangeRateResolver;
use crate::error::AppError;

/// Decimal places kept on the reported exchange rate.
pub const RATE_DP: u32 = 4;
/// Decimal places kept on converted money amounts.
pub const MONEY_DP: u32 = 2;

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetCalculateRequest {
    #[validate(
        length(
            equal = 3,
            message = "homeCurrency must be a 3-character ISO currency code."
        ),
        custom(function = "crate::core::validation::validate_currency_code")
    )]
    pub home_currency: String,

    #[validate(custom(function = "crate::core::validation::validate_positive_amount"))]
    pub daily_budget: Decimal,

    #[validate(range(min = 1, max = 365, message = "tripDays must be between 1 and 365."))]
    pub trip_days: i32,

    #[validate(
        length(min = 1, message = "destinationCountries must contain at least one country."),
        custom(function = "crate::core::validation::validate_country_codes")
    )]
    pub destination_countries: Vec<String>,
}

impl BudgetCalculateRequest {
    /// Upper-cases every code so collaborators see canonical ISO codes.
    /// Runs after validation, which only admits ASCII letters, so lengths
    /// are unchanged.
    pub fn normalized(mut self) -> Self {
        self.home_currency = self.home_currency.to_uppercase();
        for code in &mut self.destination_countries {
            *code = code.to_uppercase();
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFreshness {
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCalculationResult {
    pub country_code: String,
    pub country_name: String,
    pub destination_currency: String,
    pub exchange_rate: Decimal,
    pub daily_budget_home: Decimal,
    pub trip_days: i32,
    pub total_budget_home: Decimal,
    pub total_budget_local: Decimal,
    pub daily_local_amount: Decimal,
    pub data_freshness: DataFreshness,
    pub rate_timestamp: DateTime<Utc>,
}

/// Per-request figures shared by every destination.
struct TripBudget<'a> {
    home_currency: &'a str,
    daily_budget: Decimal,
    trip_days: i32,
    total_home: Decimal,
}

fn convert(amount: Decimal, rate: Decimal) -> Result<Decimal, AppError> {
    amount
        .checked_mul(rate)
        .map(|local| local.round_dp(MONEY_DP))
        .ok_or_else(|| AppError::validation("Budget amount is too large to convert."))
}

impl BudgetCalculationResult {
    fn compute(
        country: Country,
        budget: &TripBudget<'_>,
        rate: Decimal,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        Ok(BudgetCalculationResult {
            country_code: country.code,
            country_name: country.name,
            destination_currency: country.currency_code,
            exchange_rate: rate.round_dp(RATE_DP),
            daily_budget_home: budget.daily_budget,
            trip_days: budget.trip_days,
            total_budget_home: budget.total_home,
            total_budget_local: convert(budget.total_home, rate)?,
            daily_local_amount: convert(budget.daily_budget, rate)?,
            data_freshness: DataFreshness::Live,
            rate_timestamp: captured_at,
        })
    }
}

/// Resolves `fut` unless `cancel` fires first.
async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = fut => result,
    }
}

pub struct BudgetCalculator {
    countries: Arc<CountryResolver>,
    rates: Arc<dyn ExchangeRateResolver>,
    parallel_lookups: bool,
}

impl BudgetCalculator {
    pub fn new(countries: Arc<CountryResolver>, rates: Arc<dyn ExchangeRateResolver>) -> Self {
        Self {
            countries,
            rates,
            parallel_lookups: false,
        }
    }

    pub fn with_parallel_lookups(mut self, parallel_lookups: bool) -> Self {
        self.parallel_lookups = parallel_lookups;
        self
    }

    /// One result per destination, in request order. The first failure
    /// aborts the whole calculation.
    #[instrument(
        name = "BudgetCalculate",
        skip_all,
        fields(
            home = %request.home_currency,
            trip_days = request.trip_days,
            destinations = request.destination_countries.len()
        )
    )]
    pub async fn calculate(
        &self,
        request: &BudgetCalculateRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<BudgetCalculationResult>, AppError> {
        info!(
            "Calculating trip budget for {} days with {} across {} countries",
            request.trip_days,
            request.home_currency,
            request.destination_countries.len()
        );

        let total_home = request
            .daily_budget
            .checked_mul(Decimal::from(request.trip_days))
            .ok_or_else(|| AppError::validation("dailyBudget × tripDays is too large."))?;
        let budget = TripBudget {
            home_currency: &request.home_currency,
            daily_budget: request.daily_budget,
            trip_days: request.trip_days,
            total_home,
        };

        if self.parallel_lookups {
            return try_join_all(
                request
                    .destination_countries
                    .iter()
                    .map(|code| self.calculate_destination(&budget, code, cancel)),
            )
            .await;
        }

        let mut results = Vec::with_capacity(request.destination_countries.len());
        for code in &request.destination_countries {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            results.push(self.calculate_destination(&budget, code, cancel).await?);
        }
        Ok(results)
    }

    async fn calculate_destination(
        &self,
        budget: &TripBudget<'_>,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<BudgetCalculationResult, AppError> {
        let country = until_cancelled(cancel, async {
            Ok(self.countries.resolve(code).await?)
        })
        .await?
        .ok_or_else(|| AppError::CountryNotFound(code.to_string()))?;

        let rate = until_cancelled(
            cancel,
            self.rates
                .resolve(budget.home_currency, &country.currency_code),
        )
        .await?;
        debug!(
            "Resolved {} ({}) at rate {}",
            country.code, country.currency_code, rate
        );

        BudgetCalculationResult::compute(country, budget, rate, Utc::now())
    }
}
