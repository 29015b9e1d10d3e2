use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::master_route_controller::MasterRouteController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::route_dto::{
    AddRouteGateRequest, BboxQuery, CreateMasterRouteRequest, CreateRouteGateRequest,
    MasterRouteDetail, RouteGateLinkResponse, UpdateMasterRouteRequest, UpdateRouteGateRequest,
};
use crate::models::master_route::{
    MasterRoute, MasterRouteFilters, Page, RouteGate, RouteGateOnRoute, RoutePolyline,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_master_route_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes).post(create_route))
        .route("/:id", get(get_route).put(update_route).delete(delete_route))
        .route("/:id/gates", post(add_gate))
        .route("/:id/gates/:gate_id", put(update_gate).delete(remove_gate))
        .route("/:id/polyline", post(refresh_polyline))
}

pub fn create_route_gate_router() -> Router<AppState> {
    Router::new().route("/", get(gates_in_bbox).post(create_gate))
}

async fn create_route(
    State(state): State<AppState>,
    Json(request): Json<CreateMasterRouteRequest>,
) -> Result<Json<ApiResponse<MasterRoute>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.create(request).await?))
}

async fn list_routes(
    State(state): State<AppState>,
    Query(filters): Query<MasterRouteFilters>,
) -> Result<Json<ApiResponse<Page<MasterRoute>>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.list(filters).await?))
}

async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MasterRouteDetail>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.detail(id).await?))
}

async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMasterRouteRequest>,
) -> Result<Json<ApiResponse<MasterRoute>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.update(id, request).await?))
}

async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.delete(id).await?))
}

async fn add_gate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddRouteGateRequest>,
) -> Result<Json<ApiResponse<RouteGateLinkResponse>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.add_gate(id, request).await?))
}

async fn update_gate(
    State(state): State<AppState>,
    Path((id, gate_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateRouteGateRequest>,
) -> Result<Json<ApiResponse<RouteGateOnRoute>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.update_gate(id, gate_id, request).await?))
}

async fn remove_gate(
    State(state): State<AppState>,
    Path((id, gate_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.remove_gate(id, gate_id).await?))
}

async fn refresh_polyline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RoutePolyline>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.refresh_polyline(id).await?))
}

async fn gates_in_bbox(
    State(state): State<AppState>,
    Query(query): Query<BboxQuery>,
) -> Result<Json<ApiResponse<Vec<RouteGate>>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.gates_in_bbox(&query.bbox, query.gate_type).await?))
}

async fn create_gate(
    State(state): State<AppState>,
    Json(request): Json<CreateRouteGateRequest>,
) -> Result<Json<ApiResponse<RouteGate>>, AppError> {
    let controller = MasterRouteController::new(&state);
    Ok(Json(controller.create_gate(request).await?))
}
