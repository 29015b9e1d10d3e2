use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, patch, post, put},
    Json, Router,
};

use crate::controllers::tariff_controller::TariffController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::tariff_dto::{
    BulkCreateTariffsRequest, BulkCreateTariffsResponse, ImportReport, TariffListQuery,
    TariffQuoteRequest, TariffQuoteResponse, UpdateTariffStatusRequest, UpsertMultiplierRequest,
};
use crate::models::tariff::{ServiceMultiplier, SubService, Tariff, TariffBundle};
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppError};

pub fn create_tariff_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tariffs).post(bulk_create_tariffs))
        .route("/import", post(import_tariffs))
        .route("/quote", post(quote_tariff))
        .route("/:id", get(get_tariff).delete(delete_tariff))
        .route("/:id/status", patch(set_tariff_status))
        .route("/:id/duplicate", post(duplicate_tariff))
}

pub fn create_multiplier_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_multipliers))
        .route("/:sub_service", put(upsert_multiplier))
}

async fn bulk_create_tariffs(
    State(state): State<AppState>,
    Json(request): Json<BulkCreateTariffsRequest>,
) -> Result<Json<ApiResponse<BulkCreateTariffsResponse>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.bulk_create(request.tariffs).await?))
}

async fn list_tariffs(
    State(state): State<AppState>,
    Query(query): Query<TariffListQuery>,
) -> Result<Json<ApiResponse<Vec<Tariff>>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.list(query).await?))
}

async fn get_tariff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TariffBundle>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.get(&id).await?))
}

async fn delete_tariff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.delete(&id).await?))
}

async fn set_tariff_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTariffStatusRequest>,
) -> Result<Json<ApiResponse<Tariff>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.set_status(&id, request.is_active).await?))
}

async fn duplicate_tariff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TariffBundle>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.duplicate(&id).await?))
}

/// Planilla en el campo multipart `file`
async fn import_tariffs(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImportReport>>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request_error(&format!("could not read upload: {}", e)))?;

        let controller = TariffController::new(&state);
        return Ok(Json(controller.import(file_name, bytes.to_vec()).await?));
    }
    Err(bad_request_error("missing multipart field 'file'"))
}

async fn quote_tariff(
    State(state): State<AppState>,
    Json(request): Json<TariffQuoteRequest>,
) -> Result<Json<ApiResponse<TariffQuoteResponse>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.quote(request).await?))
}

async fn list_multipliers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ServiceMultiplier>>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.list_multipliers().await?))
}

async fn upsert_multiplier(
    State(state): State<AppState>,
    Path(sub_service): Path<SubService>,
    Json(request): Json<UpsertMultiplierRequest>,
) -> Result<Json<ApiResponse<ServiceMultiplier>>, AppError> {
    let controller = TariffController::new(&state);
    Ok(Json(controller.upsert_multiplier(sub_service, request.multiplier).await?))
}
