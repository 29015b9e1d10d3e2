use std::sync::Arc;
use uuid::Uuid;

use crate::dto::common_dto::ApiResponse;
use crate::dto::route_dto::{
    AddRouteGateRequest, CreateMasterRouteRequest, CreateRouteGateRequest, MasterRouteDetail,
    RouteGateLinkResponse, UpdateMasterRouteRequest, UpdateRouteGateRequest,
};
use crate::models::master_route::{
    GateType, MasterRoute, MasterRouteFilters, Page, RouteGate, RouteGateOnRoute, RoutePolyline,
};
use crate::services::RouteGateService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct MasterRouteController {
    service: Arc<RouteGateService>,
}

impl MasterRouteController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: state.routes.clone(),
        }
    }

    pub async fn create(&self, request: CreateMasterRouteRequest) -> Result<ApiResponse<MasterRoute>, AppError> {
        let route = self.service.create_route(request).await?;
        Ok(ApiResponse::success_with_message(
            route,
            "Ruta maestra creada exitosamente".to_string(),
        ))
    }

    pub async fn list(&self, filters: MasterRouteFilters) -> Result<ApiResponse<Page<MasterRoute>>, AppError> {
        Ok(ApiResponse::success(self.service.list_routes(&filters).await?))
    }

    pub async fn detail(&self, id: Uuid) -> Result<ApiResponse<MasterRouteDetail>, AppError> {
        Ok(ApiResponse::success(self.service.route_detail(id).await?))
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateMasterRouteRequest,
    ) -> Result<ApiResponse<MasterRoute>, AppError> {
        Ok(ApiResponse::success(self.service.update_route(id, request).await?))
    }

    pub async fn delete(&self, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.service.delete_route(id).await?;
        Ok(ApiResponse::message("Ruta maestra eliminada".to_string()))
    }

    pub async fn add_gate(
        &self,
        route_id: Uuid,
        request: AddRouteGateRequest,
    ) -> Result<ApiResponse<RouteGateLinkResponse>, AppError> {
        let link = self.service.add_gate(route_id, request).await?;
        let message = if link.created {
            "Caseta agregada a la ruta"
        } else {
            "Caseta ya vinculada, orden y tarifa actualizados"
        };
        Ok(ApiResponse::success_with_message(link, message.to_string()))
    }

    pub async fn update_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        request: UpdateRouteGateRequest,
    ) -> Result<ApiResponse<RouteGateOnRoute>, AppError> {
        Ok(ApiResponse::success(
            self.service.update_gate(route_id, gate_id, request).await?,
        ))
    }

    pub async fn remove_gate(&self, route_id: Uuid, gate_id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.service.remove_gate(route_id, gate_id).await?;
        Ok(ApiResponse::message("Caseta desvinculada de la ruta".to_string()))
    }

    pub async fn refresh_polyline(&self, route_id: Uuid) -> Result<ApiResponse<RoutePolyline>, AppError> {
        Ok(ApiResponse::success(self.service.refresh_polyline(route_id).await?))
    }

    pub async fn create_gate(&self, request: CreateRouteGateRequest) -> Result<ApiResponse<RouteGate>, AppError> {
        Ok(ApiResponse::success(self.service.create_gate(request).await?))
    }

    pub async fn gates_in_bbox(
        &self,
        bbox: &str,
        gate_type: Option<GateType>,
    ) -> Result<ApiResponse<Vec<RouteGate>>, AppError> {
        Ok(ApiResponse::success(self.service.gates_in_bbox(bbox, gate_type).await?))
    }
}
