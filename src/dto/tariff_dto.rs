use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::tariff::{
    PricingModel, ServiceType, SubService, SurchargeCalculation, SurchargeCondition, Tariff,
};
use crate::services::tariff_pricing::PricedQuote;
use crate::utils::validation::{validate_non_negative, validate_not_empty, validate_positive};

fn default_currency() -> String {
    "IDR".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct WeightTierInput {
    #[validate(custom = "validate_non_negative")]
    pub min_weight_kg: Decimal,
    pub max_weight_kg: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub rate_per_kg: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RoutePriceInput {
    #[validate(custom = "validate_not_empty")]
    pub origin_city: String,
    #[validate(custom = "validate_not_empty")]
    pub destination_city: String,
    #[serde(default)]
    pub item_type: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct DistanceConfigInput {
    #[validate(custom = "validate_non_negative")]
    pub base_price: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub rate_per_km: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_positive")]
    pub max_km: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct VehicleDailyRateInput {
    #[validate(custom = "validate_not_empty")]
    pub vehicle_type: String,
    #[validate(custom = "validate_non_negative")]
    pub daily_rate: Decimal,
    #[serde(default)]
    pub max_hours: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SeaFreightConfigInput {
    pub origin_port: String,
    pub destination_port: String,
    #[validate(custom = "validate_non_negative")]
    pub rate_per_cbm: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

// Condición: expresión etiquetada o texto heredado ("distance > 300")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionInput {
    Expression(SurchargeCondition),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SurchargeInput {
    pub surcharge_type: String,
    pub calculation: SurchargeCalculation,
    #[validate(custom = "validate_non_negative")]
    pub value: Decimal,
    #[serde(default)]
    pub condition: Option<ConditionInput>,
}

// Request para crear una tarifa con sus hijos
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CreateTariffRequest {
    #[validate(length(min = 1, max = 150), custom = "validate_not_empty")]
    pub name: String,
    pub service_type: ServiceType,
    pub sub_service: SubService,
    pub pricing_model: PricingModel,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub origin_zone: Option<String>,
    #[serde(default)]
    pub destination_zone: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub min_charge: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub sla_hours: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub effective_start: NaiveDate,
    #[serde(default)]
    pub effective_end: Option<NaiveDate>,
    #[serde(default)]
    pub weight_tiers: Vec<WeightTierInput>,
    #[serde(default)]
    pub route_prices: Vec<RoutePriceInput>,
    #[serde(default)]
    pub distance_config: Option<DistanceConfigInput>,
    #[serde(default)]
    pub vehicle_daily_rates: Vec<VehicleDailyRateInput>,
    #[serde(default)]
    pub sea_freight_configs: Vec<SeaFreightConfigInput>,
    #[serde(default)]
    pub surcharges: Vec<SurchargeInput>,
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateTariffsRequest {
    pub tariffs: Vec<CreateTariffRequest>,
}

#[derive(Debug, Serialize)]
pub struct BulkCreateTariffsResponse {
    pub created: usize,
    pub tariffs: Vec<Tariff>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTariffStatusRequest {
    pub is_active: bool,
}

// Query de listado
#[derive(Debug, Default, Deserialize)]
pub struct TariffListQuery {
    pub service_type: Option<ServiceType>,
    pub sub_service: Option<SubService>,
    pub pricing_model: Option<PricingModel>,
    pub customer_id: Option<String>,
    pub is_active: Option<bool>,
}

// Request de cotización contra el catálogo
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TariffQuoteRequest {
    pub service_type: Option<ServiceType>,
    pub sub_service: Option<SubService>,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Fecha del envío; por defecto hoy
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub tariff_id: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub distance_km: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_positive")]
    pub days: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub volume_cbm: Option<Decimal>,
    #[serde(default)]
    pub apply_multiplier: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TariffQuoteResponse {
    #[serde(flatten)]
    pub quote: PricedQuote,
    pub formatted_total: String,
}

#[derive(Debug, Deserialize)]
pub struct UpsertMultiplierRequest {
    pub multiplier: Decimal,
}

// Reporte de importación de planilla
#[derive(Debug, Clone, Serialize)]
pub struct ImportedRow {
    pub row: usize,
    pub tariff: CreateTariffRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub row: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub file_name: String,
    pub total_rows: usize,
    pub valid_rows: Vec<ImportedRow>,
    pub invalid_rows: Vec<RejectedRow>,
}
