pub mod common_dto;
pub mod departure_dto;
pub mod rate_dto;
pub mod route_dto;
pub mod tariff_dto;
