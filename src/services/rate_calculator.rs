//! Motor de cálculo de tarifas FTL
//! 
//! Despacho en orden: promo exacta → banda local (≤ 100 km) → fórmula
//! interurbana. Todas las ramas devuelven montos crudos; el formateo de
//! moneda se hace en los controllers.

use serde::Serialize;
use std::sync::Arc;

use crate::config::pricing_rules::{DistanceBand, PricingRules};
use crate::utils::errors::{bad_request_error, AppResult};

/// Límite superior (inclusive) del tramo local
pub const LOCAL_MAX_KM: f64 = 100.0;

/// Distancia de manejo asumida por día para el viático
pub const DAILY_DRIVING_KM: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceCategory {
    #[serde(rename = "Promo")]
    Promo,
    #[serde(rename = "FTL Lokal")]
    LocalFtl,
    #[serde(rename = "FTL Antar Kota")]
    IntercityFtl,
}

impl PriceCategory {
    pub fn label(&self) -> &'static str {
        match self {
            PriceCategory::Promo => "Promo",
            PriceCategory::LocalFtl => "FTL Lokal",
            PriceCategory::IntercityFtl => "FTL Antar Kota",
        }
    }
}

/// Entrada del cálculo
#[derive(Debug, Clone, Default)]
pub struct PriceRequest {
    pub distance_km: f64,
    pub include_toll: bool,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub is_promo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub base_price: f64,
    pub toll_fee: f64,
    pub total_price: f64,
    pub category: PriceCategory,
    /// Banda local aplicada, si la hubo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

pub struct RateCalculator {
    rules: Arc<PricingRules>,
}

impl RateCalculator {
    pub fn new(rules: Arc<PricingRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PricingRules {
        &self.rules
    }

    pub fn calculate_price(&self, request: &PriceRequest) -> AppResult<PriceQuote> {
        let km = request.distance_km;
        if !km.is_finite() || km < 0.0 {
            return Err(bad_request_error("distance_km must be a non-negative number"));
        }

        if request.is_promo {
            if let Some(quote) = self.promo_price(request) {
                return Ok(quote);
            }
            log::debug!("🔍 Sin promo para {:?} → {:?}, siguiendo con tarifa normal", request.origin, request.destination);
        }

        if km <= LOCAL_MAX_KM {
            Ok(self.local_price(km, request.include_toll))
        } else {
            Ok(self.intercity_price(request))
        }
    }

    fn promo_price(&self, request: &PriceRequest) -> Option<PriceQuote> {
        let origin = request.origin.as_deref()?;
        let destination = request.destination.as_deref()?;
        let promo = self
            .rules
            .promo_routes
            .iter()
            .find(|p| same_city(&p.origin, origin) && same_city(&p.destination, destination))?;

        Some(PriceQuote {
            base_price: promo.price,
            toll_fee: 0.0,
            total_price: promo.price,
            category: PriceCategory::Promo,
            band: None,
            days: None,
        })
    }

    fn local_price(&self, km: f64, include_toll: bool) -> PriceQuote {
        let band: Option<&DistanceBand> = self.rules.local_bands.iter().find(|b| b.contains(km));
        let base_price = band.map(|b| b.price).unwrap_or(self.rules.local_min_charge);
        let toll_fee = if include_toll {
            km * self.rules.toll_rate_per_km
        } else {
            0.0
        };

        PriceQuote {
            base_price,
            toll_fee,
            total_price: base_price + toll_fee,
            category: PriceCategory::LocalFtl,
            band: band.map(|b| b.name.clone()),
            days: None,
        }
    }

    fn intercity_price(&self, request: &PriceRequest) -> PriceQuote {
        let km = request.distance_km;
        let formula = &self.rules.intercity;
        let days = (km / DAILY_DRIVING_KM).ceil() as u32;

        // la tabla por ruta manda; la estimación por km sólo si se pidió peaje
        let toll_fee = self
            .route_toll_fee(request.origin.as_deref(), request.destination.as_deref())
            .unwrap_or(if request.include_toll { km * self.rules.toll_rate_per_km } else { 0.0 });

        let base_price =
            formula.base_fee + formula.rate_per_km * km + formula.allowance_per_day * days as f64;
        let subtotal = base_price + toll_fee;

        PriceQuote {
            base_price,
            toll_fee,
            total_price: subtotal * (1.0 - formula.discount_rate),
            category: PriceCategory::IntercityFtl,
            band: None,
            days: Some(days),
        }
    }

    fn route_toll_fee(&self, origin: Option<&str>, destination: Option<&str>) -> Option<f64> {
        let (origin, destination) = (origin?, destination?);
        self.rules
            .route_toll_fees
            .iter()
            .find(|t| same_city(&t.origin, origin) && same_city(&t.destination, destination))
            .map(|t| t.fee)
    }
}

/// Comparación de nombres de ciudad sin mayúsculas ni espacios extremos
pub fn same_city(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
