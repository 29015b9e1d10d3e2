use std::sync::Arc;
use uuid::Uuid;

use crate::dto::common_dto::ApiResponse;
use crate::dto::departure_dto::{
    CreateDepartureRequest, DepartureDetail, DepartureListQuery, DepartureSummary,
    UpdateDepartureRequest,
};
use crate::models::departure::Departure;
use crate::services::DepartureService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct DepartureController {
    service: Arc<DepartureService>,
}

impl DepartureController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: state.departures.clone(),
        }
    }

    pub async fn list(&self, query: DepartureListQuery) -> Result<ApiResponse<Vec<DepartureSummary>>, AppError> {
        Ok(ApiResponse::success(self.service.list(query.status).await?))
    }

    pub async fn create(&self, request: CreateDepartureRequest) -> Result<ApiResponse<Departure>, AppError> {
        let departure = self.service.create(request).await?;
        Ok(ApiResponse::success_with_message(
            departure,
            "Viaje creado exitosamente".to_string(),
        ))
    }

    pub async fn detail(&self, id: Uuid) -> Result<ApiResponse<DepartureDetail>, AppError> {
        Ok(ApiResponse::success(self.service.detail(id).await?))
    }

    pub async fn update(&self, id: Uuid, request: UpdateDepartureRequest) -> Result<ApiResponse<Departure>, AppError> {
        Ok(ApiResponse::success(self.service.update(id, request).await?))
    }

    pub async fn start(&self, id: Uuid) -> Result<ApiResponse<Departure>, AppError> {
        Ok(ApiResponse::success(self.service.start(id).await?))
    }

    pub async fn complete(&self, id: Uuid) -> Result<ApiResponse<Departure>, AppError> {
        Ok(ApiResponse::success(self.service.complete(id).await?))
    }

    pub async fn cancel(&self, id: Uuid) -> Result<ApiResponse<Departure>, AppError> {
        Ok(ApiResponse::success(self.service.cancel(id).await?))
    }
}
