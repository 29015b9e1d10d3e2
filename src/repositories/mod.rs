//! Repositorios
//! 
//! Cada recurso se accede a través de un trait; hay un backend PostgreSQL
//! (`postgres`) y uno en memoria (`memory`) para arranque sin base de datos
//! y para los tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::departure::{Departure, DepartureStatus, DriverPosition};
use crate::models::master_route::{
    GateType, MasterRoute, MasterRouteFilters, MasterRouteGate, Page, RouteGate, RouteGateOnRoute,
    RoutePolyline,
};
use crate::models::tariff::{ServiceMultiplier, SubService, Tariff, TariffBundle, TariffFilters};
use crate::utils::errors::AppResult;
use crate::utils::geo::BoundingBox;

/// Cómo se identifica una caseta del dataset
#[derive(Debug, Clone, PartialEq)]
pub enum GateKey {
    Id(Uuid),
    External(String),
}

#[async_trait]
pub trait TariffRepository: Send + Sync {
    /// Inserta todas las tarifas y sus hijos en una única transacción.
    /// Si alguna falla no queda nada guardado y se devuelve `BatchRejected`
    /// con todas las filas que fallaron (índice 1-based, en orden de entrada).
    async fn insert_batch(&self, bundles: &[TariffBundle]) -> AppResult<()>;

    async fn find_bundle(&self, id: &str) -> AppResult<Option<TariffBundle>>;

    async fn list(&self, filters: &TariffFilters) -> AppResult<Vec<Tariff>>;

    /// Cambia sólo `is_active`
    async fn set_active(&self, id: &str, is_active: bool) -> AppResult<Option<Tariff>>;

    /// Borra la tarifa y, en cascada, sus hijos
    async fn delete(&self, id: &str) -> AppResult<bool>;

    async fn list_multipliers(&self) -> AppResult<Vec<ServiceMultiplier>>;

    async fn find_multiplier(&self, sub_service: SubService) -> AppResult<Option<ServiceMultiplier>>;

    async fn upsert_multiplier(
        &self,
        sub_service: SubService,
        multiplier: Decimal,
    ) -> AppResult<ServiceMultiplier>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn route_code_exists(&self, route_code: &str, exclude: Option<Uuid>) -> AppResult<bool>;

    async fn insert_route(&self, route: &MasterRoute) -> AppResult<MasterRoute>;

    async fn find_route(&self, id: Uuid) -> AppResult<Option<MasterRoute>>;

    async fn list_routes(&self, filters: &MasterRouteFilters) -> AppResult<Page<MasterRoute>>;

    async fn update_route(&self, route: &MasterRoute) -> AppResult<MasterRoute>;

    async fn delete_route(&self, id: Uuid) -> AppResult<bool>;

    /// Alta en el dataset de casetas (importación)
    async fn insert_gate(&self, gate: &RouteGate) -> AppResult<RouteGate>;

    async fn find_gate(&self, key: &GateKey) -> AppResult<Option<RouteGate>>;

    async fn gates_in_bbox(
        &self,
        bbox: &BoundingBox,
        gate_type: Option<GateType>,
    ) -> AppResult<Vec<RouteGate>>;

    /// Inserta el vínculo o, si el par ya existe, actualiza orden y override.
    /// Devuelve `true` si se creó una fila nueva.
    async fn upsert_route_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        sequence_index: Option<i32>,
        toll_fee_override: Option<f64>,
    ) -> AppResult<(MasterRouteGate, bool)>;

    async fn update_route_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        sequence_index: Option<i32>,
        toll_fee_override: Option<f64>,
    ) -> AppResult<Option<MasterRouteGate>>;

    /// Borra sólo la fila de unión, nunca la caseta
    async fn remove_route_gate(&self, route_id: Uuid, gate_id: Uuid) -> AppResult<bool>;

    /// Casetas vinculadas con la tarifa efectiva resuelta (sin ordenar)
    async fn route_gates(&self, route_id: Uuid) -> AppResult<Vec<RouteGateOnRoute>>;

    async fn insert_polyline(&self, polyline: &RoutePolyline) -> AppResult<RoutePolyline>;

    async fn latest_polyline(&self, route_id: Uuid) -> AppResult<Option<RoutePolyline>>;
}

#[async_trait]
pub trait DepartureRepository: Send + Sync {
    async fn insert(&self, departure: &Departure) -> AppResult<Departure>;

    async fn find(&self, id: Uuid) -> AppResult<Option<Departure>>;

    async fn list(&self, status: Option<DepartureStatus>) -> AppResult<Vec<Departure>>;

    async fn update(&self, departure: &Departure) -> AppResult<Departure>;

    async fn driver_names(&self, ids: &[String]) -> AppResult<HashMap<String, String>>;

    async fn hub_names(&self, ids: &[String]) -> AppResult<HashMap<String, String>>;

    /// Telemetría más reciente por `recorded_at`
    async fn latest_position(&self, driver_id: &str) -> AppResult<Option<DriverPosition>>;
}
