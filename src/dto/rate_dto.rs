use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::cost_breakdown::CostBreakdown;
use crate::services::rate_calculator::PriceQuote;
use crate::services::truck_rental::PricedLeg;

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceInput {
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TollFilter {
    Toll,
    NonToll,
}

// Estimación de renta de camión
#[derive(Debug, Clone, Deserialize)]
pub struct TruckRentalRequest {
    pub origin: PlaceInput,
    pub destination: PlaceInput,
    /// Sin filtro se calculan las dos variantes
    #[serde(default)]
    pub filter: Option<TollFilter>,
    #[serde(default)]
    pub is_promo: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantQuote {
    #[serde(flatten)]
    pub leg: PricedLeg,
    pub formatted_total: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TruckRentalResponse {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub non_toll: Option<VariantQuote>,
    pub toll: Option<VariantQuote>,
}

// Punto de entrada de prueba del cálculo crudo
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CalculatePriceRequest {
    #[validate(range(min = 0.0))]
    pub distance_km: f64,
    #[serde(default)]
    pub include_toll: bool,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub is_promo: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculatePriceResponse {
    #[serde(flatten)]
    pub quote: PriceQuote,
    pub formatted_total: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CostBreakdownBody {
    #[validate(length(min = 1))]
    pub origin: String,
    #[validate(length(min = 1))]
    pub destination: String,
    #[serde(default)]
    pub truck_type: Option<String>,
    pub distance_km: f64,
    #[serde(default)]
    pub known_total: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostBreakdownResponse {
    #[serde(flatten)]
    pub breakdown: CostBreakdown,
    pub formatted: FormattedBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormattedBreakdown {
    pub uang_jalan: String,
    pub uang_jalan_90_percent: String,
    pub uang_jalan_10_percent: String,
    pub driver1_cost: String,
    pub driver2_cost: String,
}
