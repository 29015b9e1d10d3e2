//! Shared application state
//! 
//! Estado compartido que se pasa a través del router de Axum. Los
//! repositorios son traits, así que el mismo estado sirve para PostgreSQL y
//! para el backend en memoria.

use std::sync::Arc;

use crate::clients::RoutingProvider;
use crate::config::environment::EnvironmentConfig;
use crate::config::PricingRules;
use crate::repositories::memory::MemoryStore;
use crate::repositories::{DepartureRepository, RouteRepository, TariffRepository};
use crate::services::{
    CostBreakdownCalculator, DepartureService, DistanceEstimator, RateCalculator,
    RouteGateService, TariffAuthoringService, TariffPricingService, TruckRentalService,
};

/// Repositorios de los tres recursos
#[derive(Clone)]
pub struct Repositories {
    pub tariffs: Arc<dyn TariffRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub departures: Arc<dyn DepartureRepository>,
}

impl Repositories {
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            tariffs: store.clone(),
            routes: store.clone(),
            departures: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub rules: Arc<PricingRules>,
    pub tariff_authoring: Arc<TariffAuthoringService>,
    pub tariff_pricing: Arc<TariffPricingService>,
    pub routes: Arc<RouteGateService>,
    pub departures: Arc<DepartureService>,
    pub rate_calculator: Arc<RateCalculator>,
    pub cost_breakdown: Arc<CostBreakdownCalculator>,
    pub truck_rental: Arc<TruckRentalService>,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        rules: PricingRules,
        repositories: Repositories,
        provider: Option<Arc<dyn RoutingProvider>>,
    ) -> Self {
        let rules = Arc::new(rules);
        let estimator = Arc::new(DistanceEstimator::new(provider, config.routing_timeout));
        let rate_calculator = Arc::new(RateCalculator::new(rules.clone()));
        let routes = Arc::new(RouteGateService::new(repositories.routes, estimator.clone()));

        Self {
            tariff_authoring: Arc::new(TariffAuthoringService::new(repositories.tariffs.clone())),
            tariff_pricing: Arc::new(TariffPricingService::new(repositories.tariffs)),
            departures: Arc::new(DepartureService::new(repositories.departures, routes.clone())),
            cost_breakdown: Arc::new(CostBreakdownCalculator::new(rules.clone())),
            truck_rental: Arc::new(TruckRentalService::new(estimator, rate_calculator.clone())),
            rate_calculator,
            routes,
            rules,
            config,
        }
    }
}
