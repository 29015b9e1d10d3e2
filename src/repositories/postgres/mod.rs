//! Backend PostgreSQL (sqlx)

pub mod departure_repository;
pub mod route_repository;
pub mod tariff_repository;

pub use departure_repository::PgDepartureRepository;
pub use route_repository::PgRouteRepository;
pub use tariff_repository::PgTariffRepository;
