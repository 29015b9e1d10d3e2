//! Controllers: orquestan servicios y arman los envelopes `ApiResponse`

pub mod departure_controller;
pub mod master_route_controller;
pub mod rate_controller;
pub mod tariff_controller;
