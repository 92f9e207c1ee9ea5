use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use tokio_util::sync::CancellationToken;

use super::AppState;
use crate::core::budget::{BudgetCalculateRequest, BudgetCalculationResult};
use crate::core::validation::validate_request;
use crate::error::AppError;

pub fn routes() -> Router<AppState> {
    Router::new().route("/budget/calculate", post(calculate_budget))
}

/// POST `/budget/calculate`. Results come back in request order.
async fn calculate_budget(
    State(state): State<AppState>,
    payload: Result<Json<BudgetCalculateRequest>, JsonRejection>,
) -> Result<Json<Vec<BudgetCalculationResult>>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    validate_request(&request)?;
    let request = request.normalized();

    // Dropping the handler (client went away) cancels outstanding lookups
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let results = state.calculator.calculate(&request, &cancel).await?;
    Ok(Json(results))
}
