//! Core business logic abstractions

pub mod budget;
pub mod cache;
pub mod config;
pub mod country;
pub mod currency;
pub mod history;
pub mod log;
pub mod validation;

// Re-export main types for cleaner imports
pub use budget::{BudgetCalculateRequest, BudgetCalculationResult, BudgetCalculator};
pub use country::{Country, CountryProvider, CountryResolver};
pub use currency::{CurrencyRateProvider, ExchangeRateResolver, RateTableProvider};
pub use history::{ExchangeRateDataPoint, HistoryFetcher, HistoryProvider, HistoryWindow};
