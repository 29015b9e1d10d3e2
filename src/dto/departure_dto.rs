use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dto::route_dto::MasterRouteDetail;
use crate::models::departure::{Departure, DepartureStatus};
use crate::utils::validation::{validate_non_negative, validate_not_empty};

// Request para crear un viaje; siempre nace en `pending`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDepartureRequest {
    #[validate(length(min = 1, max = 50), custom = "validate_not_empty")]
    pub truck_id: String,
    #[validate(length(min = 1, max = 50), custom = "validate_not_empty")]
    pub driver_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_route_id: Option<Uuid>,
    #[serde(default)]
    pub current_hub: Option<String>,
    #[serde(default)]
    pub next_hub: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub est_fuel: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub est_driver1: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub est_driver2: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub other_costs: Decimal,
    /// Si falta y hay ruta asignada, se toma el total de peajes de la ruta
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub toll_total: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDepartureRequest {
    #[validate(length(min = 1, max = 50))]
    pub truck_id: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub driver_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub assigned_route_id: Option<Uuid>,
    pub current_hub: Option<String>,
    pub next_hub: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub est_fuel: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub est_driver1: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub est_driver2: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub other_costs: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub toll_total: Option<Decimal>,
    pub status: Option<DepartureStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DepartureListQuery {
    pub status: Option<DepartureStatus>,
}

// Viaje con nombres resueltos
#[derive(Debug, Clone, Serialize)]
pub struct DepartureSummary {
    #[serde(flatten)]
    pub departure: Departure,
    pub driver_name: Option<String>,
    pub current_hub_name: Option<String>,
    pub next_hub_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LastPosition {
    pub lat: f64,
    pub lng: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartureDetail {
    #[serde(flatten)]
    pub summary: DepartureSummary,
    pub route: Option<MasterRouteDetail>,
    pub last_position: Option<LastPosition>,
}
