//! Ciclo de vida de los viajes
//! 
//! pending → scheduled → departed → completed, con `cancelled` desde
//! cualquier estado no terminal. Las transiciones no se rechazan; las que
//! van hacia atrás quedan registradas en el log.

use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::departure_dto::{
    CreateDepartureRequest, DepartureDetail, DepartureSummary, LastPosition,
    UpdateDepartureRequest,
};
use crate::models::departure::{Departure, DepartureStatus};
use crate::repositories::DepartureRepository;
use crate::services::route_gate_service::RouteGateService;
use crate::utils::errors::{bad_request_error, not_found_error, AppResult};
use crate::utils::geo::parse_lat_lng;

pub struct DepartureService {
    repository: Arc<dyn DepartureRepository>,
    routes: Arc<RouteGateService>,
}

impl DepartureService {
    pub fn new(repository: Arc<dyn DepartureRepository>, routes: Arc<RouteGateService>) -> Self {
        Self { repository, routes }
    }

    pub async fn create(&self, request: CreateDepartureRequest) -> AppResult<Departure> {
        request.validate()?;

        let toll_total = match (request.toll_total, request.assigned_route_id) {
            (Some(total), _) => total,
            (None, Some(route_id)) => self.route_toll_total(route_id).await?,
            (None, None) => Decimal::ZERO,
        };

        let now = Utc::now();
        let mut departure = Departure {
            id: Uuid::new_v4(),
            truck_id: request.truck_id.trim().to_string(),
            driver_id: request.driver_id.trim().to_string(),
            scheduled_at: request.scheduled_at,
            assigned_route_id: request.assigned_route_id,
            current_hub: request.current_hub,
            next_hub: request.next_hub,
            est_fuel: request.est_fuel,
            est_driver1: request.est_driver1,
            est_driver2: request.est_driver2,
            other_costs: request.other_costs,
            toll_total,
            grand_total: Decimal::ZERO,
            status: DepartureStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        recompute_grand_total(&mut departure)?;

        let saved = self.repository.insert(&departure).await?;
        log::info!("🚚 Viaje {} creado (camión {}, chofer {})", saved.id, saved.truck_id, saved.driver_id);
        Ok(saved)
    }

    /// Total de peajes de la ruta (valida que exista)
    async fn route_toll_total(&self, route_id: Uuid) -> AppResult<Decimal> {
        let detail = self.routes.route_detail(route_id).await?;
        Ok(Decimal::from_f64(detail.toll_total).unwrap_or(Decimal::ZERO))
    }

    async fn require(&self, id: Uuid) -> AppResult<Departure> {
        self.repository
            .find(id)
            .await?
            .ok_or_else(|| not_found_error("Departure", &id.to_string()))
    }

    pub async fn update(&self, id: Uuid, request: UpdateDepartureRequest) -> AppResult<Departure> {
        request.validate()?;
        let mut departure = self.require(id).await?;

        if let Some(route_id) = request.assigned_route_id {
            // la ruta debe existir
            self.route_toll_total(route_id).await?;
            departure.assigned_route_id = Some(route_id);
        }
        if let Some(truck_id) = request.truck_id {
            departure.truck_id = truck_id.trim().to_string();
        }
        if let Some(driver_id) = request.driver_id {
            departure.driver_id = driver_id.trim().to_string();
        }
        if let Some(scheduled_at) = request.scheduled_at {
            departure.scheduled_at = scheduled_at;
        }
        if request.current_hub.is_some() {
            departure.current_hub = request.current_hub;
        }
        if request.next_hub.is_some() {
            departure.next_hub = request.next_hub;
        }

        departure.est_fuel = request.est_fuel.unwrap_or(departure.est_fuel);
        departure.est_driver1 = request.est_driver1.unwrap_or(departure.est_driver1);
        departure.est_driver2 = request.est_driver2.unwrap_or(departure.est_driver2);
        departure.other_costs = request.other_costs.unwrap_or(departure.other_costs);
        departure.toll_total = request.toll_total.unwrap_or(departure.toll_total);
        recompute_grand_total(&mut departure)?;

        if let Some(status) = request.status {
            apply_status(&mut departure, status);
        }
        departure.updated_at = Utc::now();

        self.repository.update(&departure).await
    }

    pub async fn start(&self, id: Uuid) -> AppResult<Departure> {
        self.transition(id, DepartureStatus::Departed).await
    }

    pub async fn complete(&self, id: Uuid) -> AppResult<Departure> {
        self.transition(id, DepartureStatus::Completed).await
    }

    pub async fn cancel(&self, id: Uuid) -> AppResult<Departure> {
        self.transition(id, DepartureStatus::Cancelled).await
    }

    async fn transition(&self, id: Uuid, next: DepartureStatus) -> AppResult<Departure> {
        let mut departure = self.require(id).await?;
        apply_status(&mut departure, next);
        departure.updated_at = Utc::now();
        self.repository.update(&departure).await
    }

    pub async fn list(&self, status: Option<DepartureStatus>) -> AppResult<Vec<DepartureSummary>> {
        let departures = self.repository.list(status).await?;
        self.summarize(departures).await
    }

    /// Viaje con nombres, ruta (casetas ordenadas) y última posición del chofer
    pub async fn detail(&self, id: Uuid) -> AppResult<DepartureDetail> {
        let departure = self.require(id).await?;
        let driver_id = departure.driver_id.clone();
        let route_id = departure.assigned_route_id;

        let summary = self
            .summarize(vec![departure])
            .await?
            .pop()
            .ok_or_else(|| not_found_error("Departure", &id.to_string()))?;

        let route = match route_id {
            Some(route_id) => match self.routes.route_detail(route_id).await {
                Ok(detail) => Some(detail),
                Err(e) => {
                    log::warn!("⚠️ Ruta {} del viaje {} no disponible: {}", route_id, id, e);
                    None
                }
            },
            None => None,
        };

        let last_position = self
            .repository
            .latest_position(&driver_id)
            .await?
            .and_then(|p| {
                parse_lat_lng(&p.position).map(|point| LastPosition {
                    lat: point.lat,
                    lng: point.lng,
                    recorded_at: p.recorded_at,
                })
            });

        Ok(DepartureDetail {
            summary,
            route,
            last_position,
        })
    }

    async fn summarize(&self, departures: Vec<Departure>) -> AppResult<Vec<DepartureSummary>> {
        let mut driver_ids: Vec<String> = departures.iter().map(|d| d.driver_id.clone()).collect();
        driver_ids.sort();
        driver_ids.dedup();

        let mut hub_ids: Vec<String> = departures
            .iter()
            .flat_map(|d| [d.current_hub.clone(), d.next_hub.clone()])
            .flatten()
            .collect();
        hub_ids.sort();
        hub_ids.dedup();

        let drivers = self.repository.driver_names(&driver_ids).await?;
        let hubs = self.repository.hub_names(&hub_ids).await?;
        let hub_name = |hub: &Option<String>| lookup(&hubs, hub.as_deref());

        Ok(departures
            .into_iter()
            .map(|departure| DepartureSummary {
                driver_name: drivers.get(&departure.driver_id).cloned(),
                current_hub_name: hub_name(&departure.current_hub),
                next_hub_name: hub_name(&departure.next_hub),
                departure,
            })
            .collect())
    }
}

fn lookup(names: &HashMap<String, String>, id: Option<&str>) -> Option<String> {
    id.and_then(|id| names.get(id).cloned())
}

fn apply_status(departure: &mut Departure, next: DepartureStatus) {
    if departure.status == next {
        return;
    }
    if !departure.status.is_forward_transition(next) {
        log::warn!(
            "⚠️ Transición no secuencial en viaje {}: {:?} → {:?}",
            departure.id,
            departure.status,
            next
        );
    }
    departure.status = next;
}

fn recompute_grand_total(departure: &mut Departure) -> AppResult<()> {
    departure
        .recompute_grand_total()
        .map(|_| ())
        .ok_or_else(|| bad_request_error("cost fields are too large to add up"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::departure::DriverPosition;
    use crate::repositories::memory::MemoryStore;
    use crate::services::distance_estimator::DistanceEstimator;
    use crate::utils::errors::AppError;
    use chrono::Duration;

    fn service(store: Arc<MemoryStore>) -> DepartureService {
        let estimator = Arc::new(DistanceEstimator::new(None, std::time::Duration::from_secs(1)));
        let routes = Arc::new(RouteGateService::new(store.clone(), estimator));
        DepartureService::new(store, routes)
    }

    fn create_request() -> CreateDepartureRequest {
        CreateDepartureRequest {
            truck_id: "B 9123 XY".to_string(),
            driver_id: "DRV-1".to_string(),
            scheduled_at: Utc::now(),
            assigned_route_id: None,
            current_hub: Some("HUB-JKT".to_string()),
            next_hub: Some("HUB-SBY".to_string()),
            est_fuel: Decimal::from(1_200_000),
            est_driver1: Decimal::from(400_000),
            est_driver2: Decimal::from(250_000),
            other_costs: Decimal::from(50_000),
            toll_total: Some(Decimal::from(100_000)),
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let service = service(Arc::new(MemoryStore::new()));

        let created = service.create(create_request()).await.unwrap();
        assert_eq!(created.status, DepartureStatus::Pending);
        assert_eq!(created.grand_total, Decimal::from(2_000_000));

        let started = service.start(created.id).await.unwrap();
        assert_eq!(started.status, DepartureStatus::Departed);

        let completed = service.complete(created.id).await.unwrap();
        assert_eq!(completed.status, DepartureStatus::Completed);

        // sin guardas: se permite incluso desde un estado terminal
        let cancelled = service.cancel(created.id).await.unwrap();
        assert_eq!(cancelled.status, DepartureStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_update_recomputes_grand_total() {
        let service = service(Arc::new(MemoryStore::new()));
        let created = service.create(create_request()).await.unwrap();

        let updated = service
            .update(
                created.id,
                UpdateDepartureRequest {
                    other_costs: Some(Decimal::from(150_000)),
                    status: Some(DepartureStatus::Scheduled),
                    ..UpdateDepartureRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.grand_total, Decimal::from(2_100_000));
        assert_eq!(updated.status, DepartureStatus::Scheduled);

        let err = service
            .update(
                created.id,
                UpdateDepartureRequest {
                    est_fuel: Some(Decimal::from(-1)),
                    ..UpdateDepartureRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cost_sum_overflow_is_bad_request() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store);
        let mut request = create_request();
        request.est_fuel = Decimal::MAX;
        request.est_driver1 = Decimal::ONE;

        let err = service.create(request).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("too large")));
        assert!(service.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_rejected() {
        let service = service(Arc::new(MemoryStore::new()));
        let mut request = create_request();
        request.assigned_route_id = Some(Uuid::new_v4());
        request.toll_total = None;
        assert!(matches!(service.create(request).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_detail_enrichment() {
        let store = Arc::new(MemoryStore::new());
        store.seed_driver("DRV-1", "Budi Santoso").await;
        store.seed_hub("HUB-JKT", "Hub Jakarta").await;
        let now = Utc::now();
        store
            .record_position(DriverPosition {
                driver_id: "DRV-1".to_string(),
                position: "-6.30,106.90".to_string(),
                recorded_at: now - Duration::minutes(10),
            })
            .await;
        store
            .record_position(DriverPosition {
                driver_id: "DRV-1".to_string(),
                position: " -6.45 , 107.10 ".to_string(),
                recorded_at: now,
            })
            .await;

        let service = service(store);
        let created = service.create(create_request()).await.unwrap();
        let detail = service.detail(created.id).await.unwrap();

        assert_eq!(detail.summary.driver_name.as_deref(), Some("Budi Santoso"));
        assert_eq!(detail.summary.current_hub_name.as_deref(), Some("Hub Jakarta"));
        assert_eq!(detail.summary.next_hub_name, None);
        assert!(detail.route.is_none());
        let position = detail.last_position.unwrap();
        assert_eq!((position.lat, position.lng), (-6.45, 107.10));
    }

    #[tokio::test]
    async fn test_unparsable_position_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store
            .record_position(DriverPosition {
                driver_id: "DRV-1".to_string(),
                position: "unknown".to_string(),
                recorded_at: Utc::now(),
            })
            .await;
        let service = service(store);
        let created = service.create(create_request()).await.unwrap();
        assert!(service.detail(created.id).await.unwrap().last_position.is_none());
    }
}
