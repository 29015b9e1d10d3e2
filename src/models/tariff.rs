//! Modelo de Tariff
//! 
//! Una tarifa declara un `pricing_model` y debe traer los registros hijos
//! de ese modelo. Todos los hijos pertenecen a una sola tarifa y se borran
//! en cascada con ella.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Tipo de servicio - mapea al ENUM service_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "service_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    ShipGoods,
    ShipMotorcycle,
    RentTruck,
    International,
}

/// Sub-servicio - mapea al ENUM sub_service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "sub_service", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubService {
    Economy,
    Regular,
    Package,
    Express,
}

/// Estrategia de precio - mapea al ENUM pricing_model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "pricing_model", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PricingModel {
    WeightBased,
    RouteBased,
    DistanceBased,
    DailyBased,
}

impl PricingModel {
    pub const ALL: [PricingModel; 4] = [
        PricingModel::WeightBased,
        PricingModel::RouteBased,
        PricingModel::DistanceBased,
        PricingModel::DailyBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::WeightBased => "weight-based",
            PricingModel::RouteBased => "route-based",
            PricingModel::DistanceBased => "distance-based",
            PricingModel::DailyBased => "daily-based",
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingModel {
    type Err = String;

    /// Acepta "weight-based", "weight_based", "Weight Based"...
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace([' ', '_'], "-");
        PricingModel::ALL
            .into_iter()
            .find(|model| model.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown pricing model '{}', expected one of: weight-based, route-based, distance-based, daily-based",
                    raw.trim()
                )
            })
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "ship-goods" => Ok(ServiceType::ShipGoods),
            "ship-motorcycle" => Ok(ServiceType::ShipMotorcycle),
            "rent-truck" => Ok(ServiceType::RentTruck),
            "international" => Ok(ServiceType::International),
            other => Err(format!("unknown service type '{}'", other)),
        }
    }
}

impl FromStr for SubService {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "economy" => Ok(SubService::Economy),
            "regular" => Ok(SubService::Regular),
            "package" => Ok(SubService::Package),
            "express" => Ok(SubService::Express),
            other => Err(format!("unknown sub service '{}'", other)),
        }
    }
}

/// Tariff principal - mapea a la tabla tariffs
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Tariff {
    pub id: String,
    pub name: String,
    pub service_type: ServiceType,
    pub sub_service: SubService,
    pub pricing_model: PricingModel,
    /// `None` = tarifa general
    pub customer_id: Option<String>,
    pub origin_zone: Option<String>,
    pub destination_zone: Option<String>,
    pub vehicle_type: Option<String>,
    pub currency: String,
    pub min_charge: Decimal,
    pub sla_hours: Option<i32>,
    pub is_active: bool,
    pub effective_start: NaiveDate,
    /// `None` = sin fecha de fin
    pub effective_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Tariff {
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_start <= date && self.effective_end.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WeightTier {
    pub id: Uuid,
    pub tariff_id: String,
    pub min_weight_kg: Decimal,
    pub max_weight_kg: Decimal,
    pub rate_per_kg: Decimal,
}

impl WeightTier {
    /// Rango semiabierto `[min, max)`
    pub fn contains(&self, weight_kg: Decimal) -> bool {
        weight_kg >= self.min_weight_kg && weight_kg < self.max_weight_kg
    }

    pub fn overlaps(&self, other: &WeightTier) -> bool {
        self.min_weight_kg < other.max_weight_kg && other.min_weight_kg < self.max_weight_kg
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RoutePrice {
    pub id: Uuid,
    pub tariff_id: String,
    pub origin_city: String,
    pub destination_city: String,
    pub item_type: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DistanceConfig {
    pub id: Uuid,
    pub tariff_id: String,
    pub base_price: Decimal,
    pub rate_per_km: Decimal,
    pub max_km: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VehicleDailyRate {
    pub id: Uuid,
    pub tariff_id: String,
    pub vehicle_type: String,
    pub daily_rate: Decimal,
    pub max_hours: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SeaFreightConfig {
    pub id: Uuid,
    pub tariff_id: String,
    pub origin_port: String,
    pub destination_port: String,
    pub rate_per_cbm: Decimal,
    pub currency: String,
}

/// Forma de cálculo del recargo - mapea al ENUM surcharge_calculation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "surcharge_calculation", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SurchargeCalculation {
    Percent,
    Fixed,
}

/// Campo del envío sobre el que se evalúa una condición
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    DistanceKm,
    WeightKg,
    Days,
    VolumeCbm,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

/// Condición de recargo: `field comparator threshold`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SurchargeCondition {
    pub field: ConditionField,
    pub comparator: Comparator,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Surcharge {
    pub id: Uuid,
    pub tariff_id: String,
    pub surcharge_type: String,
    pub calculation: SurchargeCalculation,
    pub value: Decimal,
    /// `None` = se aplica siempre
    pub condition: Option<Json<SurchargeCondition>>,
}

/// Multiplicador por sub-servicio (tabla global, único por sub_service)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ServiceMultiplier {
    pub sub_service: SubService,
    pub multiplier: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Tarifa con todos sus registros hijos
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TariffBundle {
    #[serde(flatten)]
    pub tariff: Tariff,
    pub weight_tiers: Vec<WeightTier>,
    pub route_prices: Vec<RoutePrice>,
    pub distance_config: Option<DistanceConfig>,
    pub vehicle_daily_rates: Vec<VehicleDailyRate>,
    pub sea_freight_configs: Vec<SeaFreightConfig>,
    pub surcharges: Vec<Surcharge>,
}

impl TariffBundle {
    /// La tarifa sólo es usable si trae al menos un hijo del tipo que exige su modelo
    pub fn check_pricing_children(&self) -> Result<(), String> {
        let ok = match self.tariff.pricing_model {
            PricingModel::WeightBased => !self.weight_tiers.is_empty(),
            PricingModel::RouteBased => !self.route_prices.is_empty(),
            PricingModel::DistanceBased => self.distance_config.is_some(),
            PricingModel::DailyBased => !self.vehicle_daily_rates.is_empty(),
        };
        if ok {
            return Ok(());
        }
        let needed = match self.tariff.pricing_model {
            PricingModel::WeightBased => "at least one weight tier",
            PricingModel::RouteBased => "at least one route price",
            PricingModel::DistanceBased => "a distance config",
            PricingModel::DailyBased => "at least one vehicle daily rate",
        };
        Err(format!("{} tariff requires {}", self.tariff.pricing_model, needed))
    }

    /// Copia completa bajo un id nuevo, inactiva
    pub fn duplicate(&self, new_id: String) -> TariffBundle {
        let mut copy = self.clone();
        copy.tariff.id = new_id.clone();
        copy.tariff.is_active = false;
        copy.tariff.created_at = Utc::now();

        for tier in &mut copy.weight_tiers {
            tier.id = Uuid::new_v4();
            tier.tariff_id = new_id.clone();
        }
        for price in &mut copy.route_prices {
            price.id = Uuid::new_v4();
            price.tariff_id = new_id.clone();
        }
        if let Some(config) = &mut copy.distance_config {
            config.id = Uuid::new_v4();
            config.tariff_id = new_id.clone();
        }
        for rate in &mut copy.vehicle_daily_rates {
            rate.id = Uuid::new_v4();
            rate.tariff_id = new_id.clone();
        }
        for sea in &mut copy.sea_freight_configs {
            sea.id = Uuid::new_v4();
            sea.tariff_id = new_id.clone();
        }
        for surcharge in &mut copy.surcharges {
            surcharge.id = Uuid::new_v4();
            surcharge.tariff_id = new_id.clone();
        }
        copy
    }
}

/// Generar un id de tarifa nuevo (opaco)
pub fn new_tariff_id() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TRF-{}", &raw[..12])
}

/// Filtros para listado de tarifas
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TariffFilters {
    pub service_type: Option<ServiceType>,
    pub sub_service: Option<SubService>,
    pub pricing_model: Option<PricingModel>,
    pub customer_id: Option<String>,
    pub is_active: Option<bool>,
}

impl TariffFilters {
    pub fn matches(&self, tariff: &Tariff) -> bool {
        self.service_type.map_or(true, |v| tariff.service_type == v)
            && self.sub_service.map_or(true, |v| tariff.sub_service == v)
            && self.pricing_model.map_or(true, |v| tariff.pricing_model == v)
            && self
                .customer_id
                .as_ref()
                .map_or(true, |v| tariff.customer_id.as_ref() == Some(v))
            && self.is_active.map_or(true, |v| tariff.is_active == v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tariff(model: PricingModel) -> Tariff {
        Tariff {
            id: "TRF-TEST".to_string(),
            name: "Test".to_string(),
            service_type: ServiceType::ShipGoods,
            sub_service: SubService::Regular,
            pricing_model: model,
            customer_id: None,
            origin_zone: None,
            destination_zone: None,
            vehicle_type: None,
            currency: "IDR".to_string(),
            min_charge: Decimal::ZERO,
            sla_hours: None,
            is_active: true,
            effective_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            effective_end: None,
            created_at: Utc::now(),
        }
    }

    fn empty_bundle(model: PricingModel) -> TariffBundle {
        TariffBundle {
            tariff: sample_tariff(model),
            weight_tiers: vec![],
            route_prices: vec![],
            distance_config: None,
            vehicle_daily_rates: vec![],
            sea_freight_configs: vec![],
            surcharges: vec![],
        }
    }

    #[test]
    fn test_pricing_model_from_str() {
        assert_eq!("weight-based".parse::<PricingModel>(), Ok(PricingModel::WeightBased));
        assert_eq!("Route Based".parse::<PricingModel>(), Ok(PricingModel::RouteBased));
        assert_eq!("distance_based".parse::<PricingModel>(), Ok(PricingModel::DistanceBased));
        assert!("per-cbm".parse::<PricingModel>().is_err());
    }

    #[test]
    fn test_check_pricing_children() {
        let mut bundle = empty_bundle(PricingModel::DistanceBased);
        assert!(bundle.check_pricing_children().is_err());

        bundle.distance_config = Some(DistanceConfig {
            id: Uuid::new_v4(),
            tariff_id: "TRF-TEST".to_string(),
            base_price: Decimal::new(50_000, 0),
            rate_per_km: Decimal::new(4_000, 0),
            max_km: None,
        });
        assert!(bundle.check_pricing_children().is_ok());

        // un hijo de otro tipo no cuenta
        let mut daily = empty_bundle(PricingModel::DailyBased);
        daily.distance_config = bundle.distance_config.clone();
        let err = daily.check_pricing_children().unwrap_err();
        assert!(err.contains("vehicle daily rate"));
    }

    #[test]
    fn test_weight_tier_half_open() {
        let tier = WeightTier {
            id: Uuid::new_v4(),
            tariff_id: "T".to_string(),
            min_weight_kg: Decimal::new(0, 0),
            max_weight_kg: Decimal::new(10, 0),
            rate_per_kg: Decimal::new(5_000, 0),
        };
        assert!(tier.contains(Decimal::ZERO));
        assert!(tier.contains(Decimal::new(99, 1)));
        assert!(!tier.contains(Decimal::new(10, 0)));

        let next = WeightTier {
            min_weight_kg: Decimal::new(10, 0),
            max_weight_kg: Decimal::new(20, 0),
            ..tier.clone()
        };
        assert!(!tier.overlaps(&next));
    }

    #[test]
    fn test_duplicate_rewrites_ids() {
        let mut bundle = empty_bundle(PricingModel::RouteBased);
        bundle.route_prices.push(RoutePrice {
            id: Uuid::new_v4(),
            tariff_id: "TRF-TEST".to_string(),
            origin_city: "Jakarta".to_string(),
            destination_city: "Bandung".to_string(),
            item_type: None,
            price: Decimal::new(1_500_000, 0),
        });

        let copy = bundle.duplicate("TRF-COPY".to_string());
        assert_eq!(copy.tariff.id, "TRF-COPY");
        assert!(!copy.tariff.is_active);
        assert_eq!(copy.route_prices[0].tariff_id, "TRF-COPY");
        assert_ne!(copy.route_prices[0].id, bundle.route_prices[0].id);
        assert_eq!(copy.route_prices[0].price, bundle.route_prices[0].price);
    }

    #[test]
    fn test_effective_window() {
        let mut tariff = sample_tariff(PricingModel::WeightBased);
        tariff.effective_end = NaiveDate::from_ymd_opt(2024, 12, 31);
        assert!(tariff.is_effective_on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert!(!tariff.is_effective_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(!tariff.is_effective_on(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    }
}
