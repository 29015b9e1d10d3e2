use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::master_route::{
    GateType, MasterRoute, RoadConstraint, RouteGateOnRoute, RoutePolyline, RouteType,
};
use crate::utils::validation::{validate_not_empty, validate_route_code};

// Request para crear una ruta maestra (coordenadas se validan en el servicio)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMasterRouteRequest {
    #[validate(custom = "validate_route_code")]
    pub route_code: String,
    #[validate(length(min = 1, max = 150), custom = "validate_not_empty")]
    pub origin_name: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    #[validate(length(min = 1, max = 150), custom = "validate_not_empty")]
    pub destination_name: String,
    pub destination_lat: f64,
    pub destination_lng: f64,
    pub route_type: RouteType,
    pub road_constraint: RoadConstraint,
    #[serde(default)]
    pub service_zone: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub default_distance_km: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub default_duration_min: Option<f64>,
    #[serde(default)]
    pub created_by: Option<String>,
}

// Request para actualizar una ruta (parcial)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMasterRouteRequest {
    #[validate(custom = "validate_route_code")]
    pub route_code: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub origin_name: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    #[validate(length(min = 1, max = 150))]
    pub destination_name: Option<String>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub route_type: Option<RouteType>,
    pub road_constraint: Option<RoadConstraint>,
    pub service_zone: Option<String>,
    #[validate(range(min = 0.0))]
    pub default_distance_km: Option<f64>,
    #[validate(range(min = 0.0))]
    pub default_duration_min: Option<f64>,
}

// Alta de caseta en el dataset
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRouteGateRequest {
    #[validate(length(min = 1, max = 150), custom = "validate_not_empty")]
    pub name: String,
    pub gate_type: GateType,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub toll_fee: Option<f64>,
    #[serde(default)]
    pub external_id: Option<String>,
}

// Vincular una caseta existente a una ruta (por id o external_id)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AddRouteGateRequest {
    #[serde(default)]
    pub gate_id: Option<Uuid>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub sequence_index: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub toll_fee_override: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRouteGateRequest {
    #[validate(range(min = 0))]
    pub sequence_index: Option<i32>,
    #[validate(range(min = 0.0))]
    pub toll_fee_override: Option<f64>,
    /// Quitar el override y volver a la tarifa de la caseta
    #[serde(default)]
    pub clear_override: bool,
}

#[derive(Debug, Deserialize)]
pub struct BboxQuery {
    pub bbox: String,
    #[serde(default, rename = "type")]
    pub gate_type: Option<GateType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteGateLinkResponse {
    pub created: bool,
    pub gate: RouteGateOnRoute,
}

// Detalle de ruta con casetas ordenadas y geometría más reciente
#[derive(Debug, Clone, Serialize)]
pub struct MasterRouteDetail {
    #[serde(flatten)]
    pub route: MasterRoute,
    pub gates: Vec<RouteGateOnRoute>,
    pub toll_total: f64,
    pub polyline: Option<RoutePolyline>,
}
