//! Services module
//! 
//! Lógica de negocio: catálogo de tarifas, grafo de rutas y casetas,
//! estimación de distancias, motor de tarifas FTL y viajes.

pub mod cost_breakdown;
pub mod departure_service;
pub mod distance_estimator;
pub mod rate_calculator;
pub mod route_gate_service;
pub mod surcharge_rules;
pub mod tariff_authoring;
pub mod tariff_import;
pub mod tariff_pricing;
pub mod truck_rental;

pub use cost_breakdown::CostBreakdownCalculator;
pub use departure_service::DepartureService;
pub use distance_estimator::{DistanceEstimator, FallbackHeuristic, TollVariants};
pub use rate_calculator::RateCalculator;
pub use route_gate_service::RouteGateService;
pub use tariff_authoring::TariffAuthoringService;
pub use tariff_pricing::TariffPricingService;
pub use truck_rental::TruckRentalService;
