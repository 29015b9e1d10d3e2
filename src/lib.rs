//! Backend de tarifas de carga y costos de ruta
//!
//! Catálogo de tarifas polimórficas, grafo de rutas con casetas de peaje,
//! estimación de distancia con respaldo geométrico y motor de precios.

pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use middleware::cors::cors_middleware;
use state::AppState;

/// Router completo de la API con sus capas
pub fn build_router(state: AppState) -> Router {
    let cors = cors_middleware(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/tariffs", routes::tariff_routes::create_tariff_router())
        .nest(
            "/api/service-multipliers",
            routes::tariff_routes::create_multiplier_router(),
        )
        .nest(
            "/api/master-routes",
            routes::master_route_routes::create_master_route_router(),
        )
        .nest(
            "/api/route-gates",
            routes::master_route_routes::create_route_gate_router(),
        )
        .nest("/api/rates", routes::rate_routes::create_rate_router())
        .nest("/api/departures", routes::departure_routes::create_departure_router())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
