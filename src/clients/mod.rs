//! Clients - HTTP clients for external APIs
//! 
//! El proveedor de rutas se modela como trait para poder sustituirlo en
//! tests y para que el estimador de distancias no dependa de Mapbox.

pub mod mapbox_directions_client;

use async_trait::async_trait;
use thiserror::Error;

use crate::utils::geo::LatLng;

pub use mapbox_directions_client::MapboxDirectionsClient;

/// Ruta de manejo devuelta por el proveedor
#[derive(Debug, Clone, PartialEq)]
pub struct DrivingRoute {
    pub distance_m: f64,
    pub duration_s: f64,
    /// GeoJSON LineString, si el proveedor la devuelve
    pub geometry: Option<serde_json::Value>,
}

/// Fallos del proveedor; todos terminan en la estimación geométrica
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("no route found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn driving_route(
        &self,
        from: LatLng,
        to: LatLng,
        avoid_tolls: bool,
    ) -> Result<DrivingRoute, RoutingError>;
}
