//! Rutas maestras y su grafo ordenado de casetas
//! 
//! Vincular una caseta exige que ya exista en el dataset; nunca se crean
//! casetas desde una ruta. Re-vincular el mismo par actualiza orden y
//! override en lugar de duplicar.

use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::route_dto::{
    AddRouteGateRequest, CreateMasterRouteRequest, CreateRouteGateRequest, MasterRouteDetail,
    RouteGateLinkResponse, UpdateMasterRouteRequest, UpdateRouteGateRequest,
};
use crate::models::master_route::{
    sort_gates, GateType, MasterRoute, MasterRouteFilters, Page, RouteGate, RouteGateOnRoute,
    RoutePolyline,
};
use crate::repositories::{GateKey, RouteRepository};
use crate::services::distance_estimator::{DistanceEstimator, EstimateSource, TollVariants};
use crate::utils::errors::{
    bad_request_error, conflict_error, not_found_error, validation_error, AppResult,
};
use crate::utils::geo::{BoundingBox, LatLng};
use crate::utils::validation::validate_coordinates;

pub struct RouteGateService {
    repository: Arc<dyn RouteRepository>,
    estimator: Arc<DistanceEstimator>,
}

impl RouteGateService {
    pub fn new(repository: Arc<dyn RouteRepository>, estimator: Arc<DistanceEstimator>) -> Self {
        Self {
            repository,
            estimator,
        }
    }

    pub async fn create_route(&self, request: CreateMasterRouteRequest) -> AppResult<MasterRoute> {
        request.validate()?;
        validate_coordinates(request.origin_lat, request.origin_lng)
            .map_err(|_| validation_error("origin", "invalid origin coordinates"))?;
        validate_coordinates(request.destination_lat, request.destination_lng)
            .map_err(|_| validation_error("destination", "invalid destination coordinates"))?;

        let route_code = request.route_code.trim().to_uppercase();
        if self.repository.route_code_exists(&route_code, None).await? {
            return Err(conflict_error("Master route", "route_code", &route_code));
        }

        let now = Utc::now();
        let route = MasterRoute {
            id: Uuid::new_v4(),
            route_code,
            origin_name: request.origin_name.trim().to_string(),
            origin_lat: request.origin_lat,
            origin_lng: request.origin_lng,
            destination_name: request.destination_name.trim().to_string(),
            destination_lat: request.destination_lat,
            destination_lng: request.destination_lng,
            route_type: request.route_type,
            road_constraint: request.road_constraint,
            service_zone: request.service_zone,
            default_distance_km: request.default_distance_km,
            default_duration_min: request.default_duration_min,
            created_by: request.created_by,
            created_at: now,
            updated_at: now,
        };

        let saved = self.repository.insert_route(&route).await?;
        log::info!("🛣️ Ruta maestra {} creada ({} → {})", saved.route_code, saved.origin_name, saved.destination_name);
        Ok(saved)
    }

    pub async fn list_routes(&self, filters: &MasterRouteFilters) -> AppResult<Page<MasterRoute>> {
        self.repository.list_routes(filters).await
    }

    async fn require_route(&self, id: Uuid) -> AppResult<MasterRoute> {
        self.repository
            .find_route(id)
            .await?
            .ok_or_else(|| not_found_error("Master route", &id.to_string()))
    }

    /// Casetas de la ruta en orden de recorrido
    pub async fn ordered_gates(&self, route_id: Uuid) -> AppResult<Vec<RouteGateOnRoute>> {
        let mut gates = self.repository.route_gates(route_id).await?;
        sort_gates(&mut gates);
        Ok(gates)
    }

    pub async fn route_detail(&self, id: Uuid) -> AppResult<MasterRouteDetail> {
        let route = self.require_route(id).await?;
        let gates = self.ordered_gates(id).await?;
        let toll_total = gates.iter().map(|g| g.toll_fee).sum();
        let polyline = self.repository.latest_polyline(id).await?;

        Ok(MasterRouteDetail {
            route,
            gates,
            toll_total,
            polyline,
        })
    }

    pub async fn update_route(&self, id: Uuid, request: UpdateMasterRouteRequest) -> AppResult<MasterRoute> {
        request.validate()?;
        let mut route = self.require_route(id).await?;

        if let Some(code) = request.route_code {
            let code = code.trim().to_uppercase();
            if code != route.route_code && self.repository.route_code_exists(&code, Some(id)).await? {
                return Err(conflict_error("Master route", "route_code", &code));
            }
            route.route_code = code;
        }
        if let Some(name) = request.origin_name {
            route.origin_name = name.trim().to_string();
        }
        if let Some(name) = request.destination_name {
            route.destination_name = name.trim().to_string();
        }
        route.origin_lat = request.origin_lat.unwrap_or(route.origin_lat);
        route.origin_lng = request.origin_lng.unwrap_or(route.origin_lng);
        route.destination_lat = request.destination_lat.unwrap_or(route.destination_lat);
        route.destination_lng = request.destination_lng.unwrap_or(route.destination_lng);
        validate_coordinates(route.origin_lat, route.origin_lng)
            .map_err(|_| validation_error("origin", "invalid origin coordinates"))?;
        validate_coordinates(route.destination_lat, route.destination_lng)
            .map_err(|_| validation_error("destination", "invalid destination coordinates"))?;

        if let Some(route_type) = request.route_type {
            route.route_type = route_type;
        }
        if let Some(constraint) = request.road_constraint {
            route.road_constraint = constraint;
        }
        if request.service_zone.is_some() {
            route.service_zone = request.service_zone;
        }
        if request.default_distance_km.is_some() {
            route.default_distance_km = request.default_distance_km;
        }
        if request.default_duration_min.is_some() {
            route.default_duration_min = request.default_duration_min;
        }
        route.updated_at = Utc::now();

        self.repository.update_route(&route).await
    }

    pub async fn delete_route(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.delete_route(id).await? {
            return Err(not_found_error("Master route", &id.to_string()));
        }
        log::info!("🗑️ Ruta maestra {} eliminada", id);
        Ok(())
    }

    /// Alta de una caseta en el dataset
    pub async fn create_gate(&self, request: CreateRouteGateRequest) -> AppResult<RouteGate> {
        request.validate()?;
        validate_coordinates(request.lat, request.lng)
            .map_err(|_| validation_error("lat", "invalid gate coordinates"))?;

        let gate = RouteGate {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            gate_type: request.gate_type,
            lat: request.lat,
            lng: request.lng,
            toll_fee: request.toll_fee,
            external_id: request.external_id.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            master_route_id: None,
        };
        self.repository.insert_gate(&gate).await
    }

    /// Casetas del dataset dentro de `minLng,minLat,maxLng,maxLat`
    pub async fn gates_in_bbox(&self, raw_bbox: &str, gate_type: Option<GateType>) -> AppResult<Vec<RouteGate>> {
        // validar antes de tocar el almacenamiento
        let bbox = BoundingBox::parse(raw_bbox).map_err(|e| bad_request_error(&e))?;
        self.repository.gates_in_bbox(&bbox, gate_type).await
    }

    pub async fn add_gate(&self, route_id: Uuid, request: AddRouteGateRequest) -> AppResult<RouteGateLinkResponse> {
        request.validate()?;
        self.require_route(route_id).await?;

        let key = match (request.gate_id, request.external_id) {
            (Some(id), _) => GateKey::Id(id),
            (None, Some(external_id)) if !external_id.trim().is_empty() => {
                GateKey::External(external_id.trim().to_string())
            }
            _ => return Err(bad_request_error("gate_id or external_id is required")),
        };

        let gate = self.repository.find_gate(&key).await?.ok_or_else(|| {
            let id = match &key {
                GateKey::Id(id) => id.to_string(),
                GateKey::External(external_id) => external_id.clone(),
            };
            not_found_error("Route gate", &id)
        })?;

        let (link, created) = self
            .repository
            .upsert_route_gate(route_id, gate.id, request.sequence_index, request.toll_fee_override)
            .await?;

        if created {
            log::info!("➕ Caseta {} vinculada a ruta {}", gate.name, route_id);
        } else {
            log::info!("🔄 Vínculo caseta {} / ruta {} actualizado", gate.name, route_id);
        }

        Ok(RouteGateLinkResponse {
            created,
            gate: RouteGateOnRoute::resolve(&link, &gate),
        })
    }

    pub async fn update_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        request: UpdateRouteGateRequest,
    ) -> AppResult<RouteGateOnRoute> {
        request.validate()?;
        let current = self
            .repository
            .route_gates(route_id)
            .await?
            .into_iter()
            .find(|g| g.gate_id == gate_id)
            .ok_or_else(|| not_found_error("Route gate link", &gate_id.to_string()))?;

        let sequence_index = request.sequence_index.or(current.sequence_index);
        let toll_fee_override = if request.clear_override {
            None
        } else {
            request.toll_fee_override.or(current.toll_fee_override)
        };

        self.repository
            .update_route_gate(route_id, gate_id, sequence_index, toll_fee_override)
            .await?
            .ok_or_else(|| not_found_error("Route gate link", &gate_id.to_string()))?;

        self.repository
            .route_gates(route_id)
            .await?
            .into_iter()
            .find(|g| g.gate_id == gate_id)
            .ok_or_else(|| not_found_error("Route gate link", &gate_id.to_string()))
    }

    /// Borra sólo el vínculo; la caseta sigue en el dataset
    pub async fn remove_gate(&self, route_id: Uuid, gate_id: Uuid) -> AppResult<()> {
        if !self.repository.remove_route_gate(route_id, gate_id).await? {
            return Err(not_found_error("Route gate link", &gate_id.to_string()));
        }
        Ok(())
    }

    /// Recalcula la geometría y refresca la distancia/duración cacheadas
    pub async fn refresh_polyline(&self, route_id: Uuid) -> AppResult<RoutePolyline> {
        let mut route = self.require_route(route_id).await?;
        let from = LatLng::new(route.origin_lat, route.origin_lng);
        let to = LatLng::new(route.destination_lat, route.destination_lng);

        let (variants, use_toll) = if route.road_constraint.uses_toll_roads() {
            (TollVariants::Toll, true)
        } else {
            (TollVariants::NonToll, false)
        };
        let estimate = self.estimator.estimate(from, to, variants).await;
        let leg = if use_toll { estimate.toll } else { estimate.non_toll };
        let leg = leg.unwrap_or_else(|| self.estimator.fallback_leg(from, to, use_toll));

        let polyline = RoutePolyline {
            id: Uuid::new_v4(),
            master_route_id: route_id,
            geometry: leg.geometry.clone().map(Json),
            distance_m: leg.distance_km * 1000.0,
            duration_s: leg.duration_min * 60.0,
            source: match leg.source {
                EstimateSource::Provider => "provider".to_string(),
                EstimateSource::Fallback => "fallback".to_string(),
            },
            created_at: Utc::now(),
        };
        let saved = self.repository.insert_polyline(&polyline).await?;

        route.default_distance_km = Some(leg.distance_km);
        route.default_duration_min = Some(leg.duration_min);
        route.updated_at = Utc::now();
        self.repository.update_route(&route).await?;

        log::info!(
            "🗺️ Polilínea de {} actualizada: {:.1} km ({})",
            route.route_code,
            leg.distance_km,
            saved.source
        );
        Ok(saved)
    }
}
