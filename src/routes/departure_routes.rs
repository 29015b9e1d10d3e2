use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::departure_controller::DepartureController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::departure_dto::{
    CreateDepartureRequest, DepartureDetail, DepartureListQuery, DepartureSummary,
    UpdateDepartureRequest,
};
use crate::models::departure::Departure;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_departure_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_departures).post(create_departure))
        .route("/:id", get(get_departure).put(update_departure))
        .route("/:id/start", post(start_departure))
        .route("/:id/complete", post(complete_departure))
        .route("/:id/cancel", post(cancel_departure))
}

async fn list_departures(
    State(state): State<AppState>,
    Query(query): Query<DepartureListQuery>,
) -> Result<Json<ApiResponse<Vec<DepartureSummary>>>, AppError> {
    let controller = DepartureController::new(&state);
    Ok(Json(controller.list(query).await?))
}

async fn create_departure(
    State(state): State<AppState>,
    Json(request): Json<CreateDepartureRequest>,
) -> Result<Json<ApiResponse<Departure>>, AppError> {
    let controller = DepartureController::new(&state);
    Ok(Json(controller.create(request).await?))
}

async fn get_departure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DepartureDetail>>, AppError> {
    let controller = DepartureController::new(&state);
    Ok(Json(controller.detail(id).await?))
}

async fn update_departure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDepartureRequest>,
) -> Result<Json<ApiResponse<Departure>>, AppError> {
    let controller = DepartureController::new(&state);
    Ok(Json(controller.update(id, request).await?))
}

async fn start_departure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Departure>>, AppError> {
    let controller = DepartureController::new(&state);
    Ok(Json(controller.start(id).await?))
}

async fn complete_departure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Departure>>, AppError> {
    let controller = DepartureController::new(&state);
    Ok(Json(controller.complete(id).await?))
}

async fn cancel_departure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Departure>>, AppError> {
    let controller = DepartureController::new(&state);
    Ok(Json(controller.cancel(id).await?))
}
