use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use freight_pricing::build_router;
use freight_pricing::clients::{MapboxDirectionsClient, RoutingProvider};
use freight_pricing::config::database::DatabaseConfig;
use freight_pricing::config::{EnvironmentConfig, PricingRules};
use freight_pricing::database::connect_and_migrate;
use freight_pricing::repositories::memory::MemoryStore;
use freight_pricing::repositories::postgres::{
    PgDepartureRepository, PgRouteRepository, PgTariffRepository,
};
use freight_pricing::state::{AppState, Repositories};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚚 Freight Pricing - Tarifas y costos de ruta");
    info!("==============================================");

    let rules = PricingRules::load_or_default(config.pricing_rules_path.as_deref())?;
    info!(
        "📐 Reglas de precios cargadas ({} rutas promo, {} bandas locales)",
        rules.promo_routes.len(),
        rules.local_bands.len()
    );

    // Repositorios: PostgreSQL si hay DATABASE_URL, si no memoria
    let repositories = match DatabaseConfig::from_env() {
        Some(db_config) => {
            let pool = match connect_and_migrate(&db_config).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            info!("✅ PostgreSQL conectado");
            Repositories {
                tariffs: Arc::new(PgTariffRepository::new(pool.clone())),
                routes: Arc::new(PgRouteRepository::new(pool.clone())),
                departures: Arc::new(PgDepartureRepository::new(pool)),
            }
        }
        None => {
            warn!("⚠️ DATABASE_URL no definida, usando almacenamiento en memoria");
            Repositories::in_memory(Arc::new(MemoryStore::new()))
        }
    };

    // Proveedor de rutas opcional
    let provider: Option<Arc<dyn RoutingProvider>> = match config.mapbox_token.clone() {
        Some(token) => match MapboxDirectionsClient::new(token, config.routing_timeout) {
            Ok(client) => {
                info!("🗺️ Mapbox Directions habilitado");
                Some(Arc::new(client) as Arc<dyn RoutingProvider>)
            }
            Err(e) => {
                warn!("⚠️ No se pudo crear el cliente Mapbox ({}), usando estimación geométrica", e);
                None
            }
        },
        None => {
            info!("📏 Sin MAPBOX_TOKEN, distancias por estimación geométrica");
            None
        }
    };

    let addr: SocketAddr = config.server_url().parse()?;
    let app = build_router(AppState::new(config, rules, repositories, provider));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("💰 Tarifas:");
    info!("   GET  /api/tariffs - Listar tarifas");
    info!("   POST /api/tariffs - Alta masiva (atómica)");
    info!("   POST /api/tariffs/import - Validar planilla CSV");
    info!("   POST /api/tariffs/quote - Cotizar contra el catálogo");
    info!("   GET  /api/tariffs/:id - Tarifa con sus hijos");
    info!("   PATCH /api/tariffs/:id/status - Activar/desactivar");
    info!("   POST /api/tariffs/:id/duplicate - Duplicar");
    info!("   DELETE /api/tariffs/:id - Eliminar");
    info!("   GET  /api/service-multipliers - Multiplicadores");
    info!("   PUT  /api/service-multipliers/:sub_service - Upsert multiplicador");
    info!("🛣️ Rutas maestras:");
    info!("   GET  /api/master-routes - Listar rutas");
    info!("   POST /api/master-routes - Crear ruta");
    info!("   GET  /api/master-routes/:id - Detalle con casetas");
    info!("   POST /api/master-routes/:id/gates - Vincular caseta");
    info!("   POST /api/master-routes/:id/polyline - Recalcular geometría");
    info!("   GET  /api/route-gates?bbox=... - Casetas en un área");
    info!("🧮 Tarifas de camión:");
    info!("   POST /api/rates/truck-rental - Cotización con/sin peaje");
    info!("   POST /api/rates/calculate - Cálculo de precio");
    info!("   POST /api/rates/cost-breakdown - Desglose de uang jalan");
    info!("🚛 Viajes:");
    info!("   GET  /api/departures - Listar viajes");
    info!("   POST /api/departures - Crear viaje");
    info!("   POST /api/departures/:id/start|complete|cancel - Cambiar estado");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal SIGTERM recibida, apagando servidor...");
        },
    }
}
