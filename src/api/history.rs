use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};

use super::AppState;
use crate::core::history::{ExchangeRateDataPoint, HistoryRequest, HistoryWindow};
use crate::core::validation::validate_request;
use crate::error::AppError;

pub fn routes() -> Router<AppState> {
    Router::new().route("/history/rates", get(rate_history))
}

/// GET `/history/rates?from=USD&to=EUR&days=30`
async fn rate_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryRequest>, QueryRejection>,
) -> Result<Json<Vec<ExchangeRateDataPoint>>, AppError> {
    let Query(request) = query.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    validate_request(&request)?;
    let window = HistoryWindow::try_from(request.days)
        .map_err(|e| AppError::validation(e.to_string()))?;

    let points = state
        .history
        .fetch_history(&request.from, &request.to, window)
        .await?;
    Ok(Json(points))
}
