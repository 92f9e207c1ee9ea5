//! HTTP layer: axum routes over the budget calculator and history fetcher.

pub mod budget;
pub mod error;
pub mod health;
pub mod history;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::{BudgetCalculator, HistoryFetcher};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub calculator: Arc<BudgetCalculator>,
    pub history: Arc<HistoryFetcher>,
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(budget::routes())
        .merge(history::routes())
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
