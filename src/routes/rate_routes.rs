use axum::{extract::State, routing::post, Json, Router};

use crate::controllers::rate_controller::RateController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::rate_dto::{
    CalculatePriceRequest, CalculatePriceResponse, CostBreakdownBody, CostBreakdownResponse,
    TruckRentalRequest, TruckRentalResponse,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_rate_router() -> Router<AppState> {
    Router::new()
        .route("/truck-rental", post(truck_rental))
        .route("/calculate", post(calculate_price))
        .route("/cost-breakdown", post(cost_breakdown))
}

/// Siempre responde: sin proveedor se usa la estimación geométrica
async fn truck_rental(
    State(state): State<AppState>,
    Json(request): Json<TruckRentalRequest>,
) -> Result<Json<ApiResponse<TruckRentalResponse>>, AppError> {
    let controller = RateController::new(&state);
    Ok(Json(controller.truck_rental(request).await?))
}

async fn calculate_price(
    State(state): State<AppState>,
    Json(request): Json<CalculatePriceRequest>,
) -> Result<Json<ApiResponse<CalculatePriceResponse>>, AppError> {
    let controller = RateController::new(&state);
    Ok(Json(controller.calculate(request)?))
}

async fn cost_breakdown(
    State(state): State<AppState>,
    Json(body): Json<CostBreakdownBody>,
) -> Result<Json<ApiResponse<CostBreakdownResponse>>, AppError> {
    let controller = RateController::new(&state);
    Ok(Json(controller.cost_breakdown(body)?))
}
