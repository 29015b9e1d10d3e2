pub mod departure_routes;
pub mod master_route_routes;
pub mod rate_routes;
pub mod tariff_routes;
