//! Backend en memoria
//! 
//! Misma semántica que el backend PostgreSQL (unicidad, cascadas, lote
//! atómico). Se usa cuando no hay `DATABASE_URL` y en los tests.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DepartureRepository, GateKey, RouteRepository, TariffRepository};
use crate::models::departure::{Departure, DepartureStatus, DriverPosition};
use crate::models::master_route::{
    GateType, MasterRoute, MasterRouteFilters, MasterRouteGate, Page, RouteGate, RouteGateOnRoute,
    RoutePolyline,
};
use crate::models::tariff::{ServiceMultiplier, SubService, Tariff, TariffBundle, TariffFilters};
use crate::utils::errors::{conflict_error, AppError, AppResult, RowError};
use crate::utils::geo::{BoundingBox, LatLng};

#[derive(Default)]
struct MemoryState {
    tariffs: HashMap<String, TariffBundle>,
    multipliers: HashMap<SubService, ServiceMultiplier>,
    routes: HashMap<Uuid, MasterRoute>,
    gates: HashMap<Uuid, RouteGate>,
    route_gates: Vec<MasterRouteGate>,
    polylines: Vec<RoutePolyline>,
    departures: HashMap<Uuid, Departure>,
    drivers: HashMap<String, String>,
    hubs: HashMap<String, String>,
    positions: Vec<DriverPosition>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrar un chofer (normalmente viene del módulo de usuarios)
    pub async fn seed_driver(&self, id: &str, name: &str) {
        self.state.write().await.drivers.insert(id.to_string(), name.to_string());
    }

    pub async fn seed_hub(&self, id: &str, name: &str) {
        self.state.write().await.hubs.insert(id.to_string(), name.to_string());
    }

    /// Registrar telemetría "lat,lng"
    pub async fn record_position(&self, position: DriverPosition) {
        self.state.write().await.positions.push(position);
    }

    pub async fn count_tariffs(&self) -> usize {
        self.state.read().await.tariffs.len()
    }

    pub async fn count_route_gate_links(&self, route_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .route_gates
            .iter()
            .filter(|link| link.master_route_id == route_id)
            .count()
    }
}

#[async_trait]
impl TariffRepository for MemoryStore {
    async fn insert_batch(&self, bundles: &[TariffBundle]) -> AppResult<()> {
        let mut state = self.state.write().await;

        let mut seen = HashSet::new();
        let mut failures = Vec::new();
        for (index, bundle) in bundles.iter().enumerate() {
            let id = &bundle.tariff.id;
            if state.tariffs.contains_key(id) || !seen.insert(id.clone()) {
                failures.push(RowError::new(
                    index + 1,
                    bundle.tariff.name.clone(),
                    format!("tariff id '{}' already exists", id),
                ));
            }
        }
        if !failures.is_empty() {
            return Err(AppError::BatchRejected(failures));
        }

        for bundle in bundles {
            state.tariffs.insert(bundle.tariff.id.clone(), bundle.clone());
        }
        Ok(())
    }

    async fn find_bundle(&self, id: &str) -> AppResult<Option<TariffBundle>> {
        Ok(self.state.read().await.tariffs.get(id).cloned())
    }

    async fn list(&self, filters: &TariffFilters) -> AppResult<Vec<Tariff>> {
        let state = self.state.read().await;
        let mut tariffs: Vec<Tariff> = state
            .tariffs
            .values()
            .map(|bundle| bundle.tariff.clone())
            .filter(|tariff| filters.matches(tariff))
            .collect();
        tariffs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(tariffs)
    }

    async fn set_active(&self, id: &str, is_active: bool) -> AppResult<Option<Tariff>> {
        let mut state = self.state.write().await;
        Ok(state.tariffs.get_mut(id).map(|bundle| {
            bundle.tariff.is_active = is_active;
            bundle.tariff.clone()
        }))
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.state.write().await.tariffs.remove(id).is_some())
    }

    async fn list_multipliers(&self) -> AppResult<Vec<ServiceMultiplier>> {
        let state = self.state.read().await;
        let mut multipliers: Vec<ServiceMultiplier> = state.multipliers.values().cloned().collect();
        multipliers.sort_by_key(|m| format!("{:?}", m.sub_service));
        Ok(multipliers)
    }

    async fn find_multiplier(&self, sub_service: SubService) -> AppResult<Option<ServiceMultiplier>> {
        Ok(self.state.read().await.multipliers.get(&sub_service).cloned())
    }

    async fn upsert_multiplier(
        &self,
        sub_service: SubService,
        multiplier: Decimal,
    ) -> AppResult<ServiceMultiplier> {
        let row = ServiceMultiplier {
            sub_service,
            multiplier,
            updated_at: Utc::now(),
        };
        self.state.write().await.multipliers.insert(sub_service, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl RouteRepository for MemoryStore {
    async fn route_code_exists(&self, route_code: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .any(|r| r.route_code == route_code && Some(r.id) != exclude))
    }

    async fn insert_route(&self, route: &MasterRoute) -> AppResult<MasterRoute> {
        let mut state = self.state.write().await;
        if state.routes.values().any(|r| r.route_code == route.route_code) {
            return Err(conflict_error("Master route", "route_code", &route.route_code));
        }
        state.routes.insert(route.id, route.clone());
        Ok(route.clone())
    }

    async fn find_route(&self, id: Uuid) -> AppResult<Option<MasterRoute>> {
        Ok(self.state.read().await.routes.get(&id).cloned())
    }

    async fn list_routes(&self, filters: &MasterRouteFilters) -> AppResult<Page<MasterRoute>> {
        let state = self.state.read().await;
        let mut matching: Vec<MasterRoute> = state
            .routes
            .values()
            .filter(|route| filters.matches(route))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.route_code.cmp(&b.route_code)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(filters.offset() as usize)
            .take(filters.limit() as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: filters.page(),
            limit: filters.limit(),
        })
    }

    async fn update_route(&self, route: &MasterRoute) -> AppResult<MasterRoute> {
        let mut state = self.state.write().await;
        if state
            .routes
            .values()
            .any(|r| r.route_code == route.route_code && r.id != route.id)
        {
            return Err(conflict_error("Master route", "route_code", &route.route_code));
        }
        match state.routes.get_mut(&route.id) {
            Some(existing) => {
                *existing = route.clone();
                Ok(route.clone())
            }
            None => Err(AppError::NotFound(format!("Master route '{}' not found", route.id))),
        }
    }

    async fn delete_route(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if state.routes.remove(&id).is_none() {
            return Ok(false);
        }
        state.route_gates.retain(|link| link.master_route_id != id);
        state.polylines.retain(|p| p.master_route_id != id);
        for gate in state.gates.values_mut() {
            if gate.master_route_id == Some(id) {
                gate.master_route_id = None;
            }
        }
        for departure in state.departures.values_mut() {
            if departure.assigned_route_id == Some(id) {
                departure.assigned_route_id = None;
            }
        }
        Ok(true)
    }

    async fn insert_gate(&self, gate: &RouteGate) -> AppResult<RouteGate> {
        let mut state = self.state.write().await;
        if let Some(external_id) = &gate.external_id {
            if state
                .gates
                .values()
                .any(|g| g.external_id.as_ref() == Some(external_id))
            {
                return Err(conflict_error("Route gate", "external_id", external_id));
            }
        }
        state.gates.insert(gate.id, gate.clone());
        Ok(gate.clone())
    }

    async fn find_gate(&self, key: &GateKey) -> AppResult<Option<RouteGate>> {
        let state = self.state.read().await;
        Ok(match key {
            GateKey::Id(id) => state.gates.get(id).cloned(),
            GateKey::External(external_id) => state
                .gates
                .values()
                .find(|g| g.external_id.as_ref() == Some(external_id))
                .cloned(),
        })
    }

    async fn gates_in_bbox(
        &self,
        bbox: &BoundingBox,
        gate_type: Option<GateType>,
    ) -> AppResult<Vec<RouteGate>> {
        let state = self.state.read().await;
        let mut gates: Vec<RouteGate> = state
            .gates
            .values()
            .filter(|g| bbox.contains(LatLng::new(g.lat, g.lng)))
            .filter(|g| gate_type.map_or(true, |t| g.gate_type == t))
            .cloned()
            .collect();
        gates.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(gates)
    }

    async fn upsert_route_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        sequence_index: Option<i32>,
        toll_fee_override: Option<f64>,
    ) -> AppResult<(MasterRouteGate, bool)> {
        let mut state = self.state.write().await;
        if let Some(link) = state
            .route_gates
            .iter_mut()
            .find(|l| l.master_route_id == route_id && l.route_gate_id == gate_id)
        {
            link.sequence_index = sequence_index;
            link.toll_fee_override = toll_fee_override;
            return Ok((link.clone(), false));
        }

        let link = MasterRouteGate {
            id: Uuid::new_v4(),
            master_route_id: route_id,
            route_gate_id: gate_id,
            sequence_index,
            toll_fee_override,
            created_at: Utc::now(),
        };
        state.route_gates.push(link.clone());
        Ok((link, true))
    }

    async fn update_route_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        sequence_index: Option<i32>,
        toll_fee_override: Option<f64>,
    ) -> AppResult<Option<MasterRouteGate>> {
        let mut state = self.state.write().await;
        Ok(state
            .route_gates
            .iter_mut()
            .find(|l| l.master_route_id == route_id && l.route_gate_id == gate_id)
            .map(|link| {
                link.sequence_index = sequence_index;
                link.toll_fee_override = toll_fee_override;
                link.clone()
            }))
    }

    async fn remove_route_gate(&self, route_id: Uuid, gate_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.route_gates.len();
        state
            .route_gates
            .retain(|l| !(l.master_route_id == route_id && l.route_gate_id == gate_id));
        Ok(state.route_gates.len() != before)
    }

    async fn route_gates(&self, route_id: Uuid) -> AppResult<Vec<RouteGateOnRoute>> {
        let state = self.state.read().await;
        Ok(state
            .route_gates
            .iter()
            .filter(|link| link.master_route_id == route_id)
            .filter_map(|link| {
                state
                    .gates
                    .get(&link.route_gate_id)
                    .map(|gate| RouteGateOnRoute::resolve(link, gate))
            })
            .collect())
    }

    async fn insert_polyline(&self, polyline: &RoutePolyline) -> AppResult<RoutePolyline> {
        self.state.write().await.polylines.push(polyline.clone());
        Ok(polyline.clone())
    }

    async fn latest_polyline(&self, route_id: Uuid) -> AppResult<Option<RoutePolyline>> {
        let state = self.state.read().await;
        // a igual fecha gana la última insertada
        Ok(state
            .polylines
            .iter()
            .enumerate()
            .filter(|(_, p)| p.master_route_id == route_id)
            .max_by_key(|(index, p)| (p.created_at, *index))
            .map(|(_, p)| p.clone()))
    }
}

#[async_trait]
impl DepartureRepository for MemoryStore {
    async fn insert(&self, departure: &Departure) -> AppResult<Departure> {
        self.state
            .write()
            .await
            .departures
            .insert(departure.id, departure.clone());
        Ok(departure.clone())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Departure>> {
        Ok(self.state.read().await.departures.get(&id).cloned())
    }

    async fn list(&self, status: Option<DepartureStatus>) -> AppResult<Vec<Departure>> {
        let state = self.state.read().await;
        let mut departures: Vec<Departure> = state
            .departures
            .values()
            .filter(|d| status.map_or(true, |s| d.status == s))
            .cloned()
            .collect();
        departures.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at).then(a.id.cmp(&b.id)));
        Ok(departures)
    }

    async fn update(&self, departure: &Departure) -> AppResult<Departure> {
        let mut state = self.state.write().await;
        match state.departures.get_mut(&departure.id) {
            Some(existing) => {
                *existing = departure.clone();
                Ok(departure.clone())
            }
            None => Err(AppError::NotFound(format!("Departure '{}' not found", departure.id))),
        }
    }

    async fn driver_names(&self, ids: &[String]) -> AppResult<HashMap<String, String>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.drivers.get(id).map(|name| (id.clone(), name.clone())))
            .collect())
    }

    async fn hub_names(&self, ids: &[String]) -> AppResult<HashMap<String, String>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.hubs.get(id).map(|name| (id.clone(), name.clone())))
            .collect())
    }

    async fn latest_position(&self, driver_id: &str) -> AppResult<Option<DriverPosition>> {
        let state = self.state.read().await;
        Ok(state
            .positions
            .iter()
            .filter(|p| p.driver_id == driver_id)
            .max_by_key(|p| p.recorded_at)
            .cloned())
    }
}
