//! Estimación de distancia y duración
//! 
//! Primero el proveedor de rutas (sólo las variantes pedidas); ante
//! cualquier fallo, distancia haversine. Este camino alimenta los
//! endpoints de cotización y nunca devuelve error.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::{DrivingRoute, RoutingError, RoutingProvider};
use crate::utils::geo::{haversine_km, LatLng};

/// Supuestos de negocio del cálculo de respaldo
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackHeuristic {
    /// distancia con peaje = distancia geométrica × ratio
    pub toll_ratio: f64,
    pub avg_speed_kmh: f64,
    pub default_non_toll_km: f64,
    pub default_toll_km: f64,
}

impl Default for FallbackHeuristic {
    fn default() -> Self {
        Self {
            toll_ratio: 0.85,
            avg_speed_kmh: 50.0,
            default_non_toll_km: 100.0,
            default_toll_km: 85.0,
        }
    }
}

/// Qué variantes necesita el llamador
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TollVariants {
    NonToll,
    Toll,
    Both,
}

impl TollVariants {
    pub fn needs_non_toll(&self) -> bool {
        matches!(self, TollVariants::NonToll | TollVariants::Both)
    }

    pub fn needs_toll(&self) -> bool {
        matches!(self, TollVariants::Toll | TollVariants::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegEstimate {
    pub distance_km: f64,
    pub duration_min: f64,
    pub source: EstimateSource,
    #[serde(skip)]
    pub geometry: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceEstimate {
    pub non_toll: Option<LegEstimate>,
    pub toll: Option<LegEstimate>,
}

pub struct DistanceEstimator {
    provider: Option<Arc<dyn RoutingProvider>>,
    heuristic: FallbackHeuristic,
    timeout: Duration,
}

impl DistanceEstimator {
    /// `provider = None` (p.ej. sin credenciales) ⇒ siempre respaldo
    pub fn new(provider: Option<Arc<dyn RoutingProvider>>, timeout: Duration) -> Self {
        Self {
            provider,
            heuristic: FallbackHeuristic::default(),
            timeout,
        }
    }

    pub fn with_heuristic(mut self, heuristic: FallbackHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn heuristic(&self) -> &FallbackHeuristic {
        &self.heuristic
    }

    pub async fn estimate(&self, from: LatLng, to: LatLng, variants: TollVariants) -> DistanceEstimate {
        match variants {
            TollVariants::NonToll => DistanceEstimate {
                non_toll: Some(self.leg(from, to, false).await),
                toll: None,
            },
            TollVariants::Toll => DistanceEstimate {
                non_toll: None,
                toll: Some(self.leg(from, to, true).await),
            },
            TollVariants::Both => {
                let (non_toll, toll) =
                    tokio::join!(self.leg(from, to, false), self.leg(from, to, true));
                DistanceEstimate {
                    non_toll: Some(non_toll),
                    toll: Some(toll),
                }
            }
        }
    }

    /// Una variante: proveedor con timeout, si no respaldo
    async fn leg(&self, from: LatLng, to: LatLng, toll: bool) -> LegEstimate {
        let Some(provider) = &self.provider else {
            return self.fallback_leg(from, to, toll);
        };

        let result = match tokio::time::timeout(self.timeout, provider.driving_route(from, to, !toll)).await {
            Ok(result) => result,
            Err(_) => Err(RoutingError::Timeout),
        };

        match result {
            Ok(route) => provider_leg(route),
            Err(e) => {
                log::warn!(
                    "⚠️ Proveedor de rutas falló ({}), usando haversine para variante {}",
                    e,
                    if toll { "con peaje" } else { "sin peaje" }
                );
                self.fallback_leg(from, to, toll)
            }
        }
    }

    /// Respaldo geométrico; nunca falla
    pub fn fallback_leg(&self, from: LatLng, to: LatLng, toll: bool) -> LegEstimate {
        let h = &self.heuristic;
        let geometric_km = haversine_km(from, to);

        let distance_km = if geometric_km.is_finite() && h.toll_ratio.is_finite() {
            if toll {
                geometric_km * h.toll_ratio
            } else {
                geometric_km
            }
        } else {
            log::warn!("⚠️ Distancia geométrica inválida, usando valores conservadores");
            if toll {
                h.default_toll_km
            } else {
                h.default_non_toll_km
            }
        };

        let mut duration_min = distance_km / h.avg_speed_kmh * 60.0;
        if !duration_min.is_finite() {
            let defaults = FallbackHeuristic::default();
            duration_min = distance_km / defaults.avg_speed_kmh * 60.0;
        }

        LegEstimate {
            distance_km,
            duration_min,
            source: EstimateSource::Fallback,
            geometry: None,
        }
    }
}

fn provider_leg(route: DrivingRoute) -> LegEstimate {
    LegEstimate {
        distance_km: route.distance_m / 1000.0,
        duration_min: route.duration_s / 60.0,
        source: EstimateSource::Provider,
        geometry: route.geometry,
    }
}
