//! Modelo de MasterRoute, RouteGate y la tabla de unión ordenada
//! 
//! `master_route_gates` es la única vía de pertenencia ruta↔caseta.
//! `route_gates.master_route_id` se conserva sólo como columna heredada.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use uuid::Uuid;

/// Tipo de ruta - mapea al ENUM route_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "route_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RouteType {
    OneWay,
    RoundTrip,
    MultiDrop,
}

/// Restricción de vía - mapea al ENUM road_constraint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "road_constraint", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RoadConstraint {
    Toll,
    NonToll,
    Mixed,
}

impl RoadConstraint {
    /// Las rutas `mixed` se calculan por la variante con peaje
    pub fn uses_toll_roads(&self) -> bool {
        !matches!(self, RoadConstraint::NonToll)
    }
}

/// Tipo de punto - mapea al ENUM gate_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "gate_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GateType {
    Toll,
    Port,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MasterRoute {
    pub id: Uuid,
    pub route_code: String,
    pub origin_name: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub destination_name: String,
    pub destination_lat: f64,
    pub destination_lng: f64,
    pub route_type: RouteType,
    pub road_constraint: RoadConstraint,
    pub service_zone: Option<String>,
    pub default_distance_km: Option<f64>,
    pub default_duration_min: Option<f64>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Punto del dataset (caseta de peaje o puerto)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RouteGate {
    pub id: Uuid,
    pub name: String,
    pub gate_type: GateType,
    pub lat: f64,
    pub lng: f64,
    pub toll_fee: Option<f64>,
    pub external_id: Option<String>,
    /// Columna heredada; se lee pero nunca se escribe
    pub master_route_id: Option<Uuid>,
}

/// Fila de la tabla de unión ruta↔caseta
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MasterRouteGate {
    pub id: Uuid,
    pub master_route_id: Uuid,
    pub route_gate_id: Uuid,
    /// `None` = sin orden
    pub sequence_index: Option<i32>,
    pub toll_fee_override: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Caseta ya resuelta para una ruta concreta
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteGateOnRoute {
    pub gate_id: Uuid,
    pub external_id: Option<String>,
    pub name: String,
    pub gate_type: GateType,
    pub lat: f64,
    pub lng: f64,
    pub sequence_index: Option<i32>,
    pub toll_fee_override: Option<f64>,
    /// `override ?? gate.toll_fee ?? 0`
    pub toll_fee: f64,
    #[serde(skip)]
    pub linked_at: DateTime<Utc>,
}

impl RouteGateOnRoute {
    pub fn resolve(link: &MasterRouteGate, gate: &RouteGate) -> Self {
        Self {
            gate_id: gate.id,
            external_id: gate.external_id.clone(),
            name: gate.name.clone(),
            gate_type: gate.gate_type,
            lat: gate.lat,
            lng: gate.lng,
            sequence_index: link.sequence_index,
            toll_fee_override: link.toll_fee_override,
            toll_fee: link.toll_fee_override.or(gate.toll_fee).unwrap_or(0.0),
            linked_at: link.created_at,
        }
    }
}

/// Geometría cacheada; sólo se insertan filas nuevas
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RoutePolyline {
    pub id: Uuid,
    pub master_route_id: Uuid,
    pub geometry: Option<Json<serde_json::Value>>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Filtros para listado de rutas
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MasterRouteFilters {
    pub search: Option<String>,
    pub road_constraint: Option<RoadConstraint>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl MasterRouteFilters {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// Página acotada para que `offset` no desborde
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, i64::MAX / Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    pub fn matches(&self, route: &MasterRoute) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                route.route_code.to_lowercase().contains(&term)
                    || route.origin_name.to_lowercase().contains(&term)
                    || route.destination_name.to_lowercase().contains(&term)
            }
            _ => true,
        };
        search_ok && self.road_constraint.map_or(true, |rc| route.road_constraint == rc)
    }
}

/// Página de resultados
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Ordenar casetas por `sequence_index` ascendente, nulos al final,
/// desempate por fecha de vínculo y luego id
pub fn sort_gates(gates: &mut [RouteGateOnRoute]) {
    gates.sort_by(|a, b| {
        let seq = match (a.sequence_index, b.sequence_index) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        seq.then(a.linked_at.cmp(&b.linked_at))
            .then(a.gate_id.cmp(&b.gate_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn gate(fee: Option<f64>) -> RouteGate {
        RouteGate {
            id: Uuid::new_v4(),
            name: "GT Cikampek".to_string(),
            gate_type: GateType::Toll,
            lat: -6.4,
            lng: 107.4,
            toll_fee: fee,
            external_id: Some("OSM-1".to_string()),
            master_route_id: None,
        }
    }

    fn link(gate: &RouteGate, seq: Option<i32>, fee: Option<f64>) -> MasterRouteGate {
        MasterRouteGate {
            id: Uuid::new_v4(),
            master_route_id: Uuid::new_v4(),
            route_gate_id: gate.id,
            sequence_index: seq,
            toll_fee_override: fee,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_fee() {
        let g = gate(Some(25_000.0));
        assert_eq!(RouteGateOnRoute::resolve(&link(&g, None, None), &g).toll_fee, 25_000.0);
        assert_eq!(
            RouteGateOnRoute::resolve(&link(&g, None, Some(30_000.0)), &g).toll_fee,
            30_000.0
        );

        let no_fee = gate(None);
        assert_eq!(RouteGateOnRoute::resolve(&link(&no_fee, None, None), &no_fee).toll_fee, 0.0);
    }

    #[test]
    fn test_sort_gates_nulls_last_and_stable() {
        let base = Utc::now();
        let mut resolved: Vec<RouteGateOnRoute> = [(None, 0), (Some(2), 1), (Some(1), 2), (None, 3)]
            .into_iter()
            .map(|(seq, offset)| {
                let g = gate(Some(1.0));
                let mut l = link(&g, seq, None);
                l.created_at = base + Duration::seconds(offset);
                RouteGateOnRoute::resolve(&l, &g)
            })
            .collect();
        let first_null = resolved[0].gate_id;
        let second_null = resolved[3].gate_id;

        sort_gates(&mut resolved);

        let order: Vec<Option<i32>> = resolved.iter().map(|g| g.sequence_index).collect();
        assert_eq!(order, vec![Some(1), Some(2), None, None]);
        assert_eq!(resolved[2].gate_id, first_null);
        assert_eq!(resolved[3].gate_id, second_null);
    }

    #[test]
    fn test_filters_pagination() {
        let filters = MasterRouteFilters {
            page: Some(3),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(filters.limit(), 100);
        assert_eq!(filters.offset(), 200);
    }

    #[test]
    fn test_filters_huge_page_does_not_overflow() {
        let filters = MasterRouteFilters {
            page: Some(i64::MAX),
            limit: Some(MasterRouteFilters::MAX_LIMIT),
            ..Default::default()
        };
        assert_eq!(filters.page(), i64::MAX / MasterRouteFilters::MAX_LIMIT);
        assert!(filters.offset() > 0);

        let negative = MasterRouteFilters {
            page: Some(i64::MIN),
            ..Default::default()
        };
        assert_eq!(negative.page(), 1);
        assert_eq!(negative.offset(), 0);
    }
}
