//! Reglas de precios
//! 
//! Tabla de bandas, tarifas de peaje, constantes de la fórmula interurbana y
//! reglas de "uang jalan". Se cargan una vez (JSON) y se inyectan en
//! `RateCalculator` y `CostBreakdownCalculator`; nunca son estado global.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Precio fijo promocional para un par origen/destino exacto
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoRoute {
    pub origin: String,
    pub destination: String,
    pub price: f64,
}

/// Banda de distancia local, rango cerrado `[min_km, max_km]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistanceBand {
    pub name: String,
    pub min_km: f64,
    pub max_km: f64,
    pub price: f64,
}

impl DistanceBand {
    pub fn contains(&self, distance_km: f64) -> bool {
        distance_km >= self.min_km && distance_km <= self.max_km
    }
}

/// Constantes de la fórmula interurbana
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntercityFormula {
    pub base_fee: f64,
    pub rate_per_km: f64,
    pub allowance_per_day: f64,
    /// Fracción 0..1
    pub discount_rate: f64,
}

/// Peaje conocido para un par de ciudades
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteTollFee {
    pub origin: String,
    pub destination: String,
    pub fee: f64,
}

/// Regla de uang jalan por origen/destino/banda de distancia
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoadMoneyRule {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub truck_type: Option<String>,
    pub min_km: f64,
    pub max_km: f64,
    pub road_money: f64,
    #[serde(default)]
    pub driver1_cost: Option<f64>,
    #[serde(default)]
    pub driver2_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoadMoneyRules {
    pub rules: Vec<RoadMoneyRule>,
    /// Se usa cuando ninguna regla coincide
    pub fallback_per_km: f64,
    pub driver1_ratio: f64,
    pub driver2_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingRules {
    pub promo_routes: Vec<PromoRoute>,
    pub local_bands: Vec<DistanceBand>,
    pub local_min_charge: f64,
    pub toll_rate_per_km: f64,
    pub intercity: IntercityFormula,
    pub route_toll_fees: Vec<RouteTollFee>,
    pub road_money: RoadMoneyRules,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            promo_routes: vec![
                PromoRoute {
                    origin: "Jakarta".to_string(),
                    destination: "Bandung".to_string(),
                    price: 1_750_000.0,
                },
                PromoRoute {
                    origin: "Jakarta".to_string(),
                    destination: "Surabaya".to_string(),
                    price: 6_500_000.0,
                },
            ],
            local_bands: vec![
                DistanceBand {
                    name: "Dalam Kota".to_string(),
                    min_km: 0.0,
                    max_km: 25.0,
                    price: 850_000.0,
                },
                DistanceBand {
                    name: "Pinggiran Kota".to_string(),
                    min_km: 25.0,
                    max_km: 50.0,
                    price: 1_250_000.0,
                },
                DistanceBand {
                    name: "Antar Kabupaten".to_string(),
                    min_km: 50.0,
                    max_km: 100.0,
                    price: 1_750_000.0,
                },
            ],
            local_min_charge: 850_000.0,
            toll_rate_per_km: 500.0,
            intercity: IntercityFormula {
                base_fee: 1_500_000.0,
                rate_per_km: 6_500.0,
                allowance_per_day: 250_000.0,
                discount_rate: 0.05,
            },
            route_toll_fees: vec![
                RouteTollFee {
                    origin: "Jakarta".to_string(),
                    destination: "Surabaya".to_string(),
                    fee: 875_000.0,
                },
                RouteTollFee {
                    origin: "Jakarta".to_string(),
                    destination: "Semarang".to_string(),
                    fee: 480_000.0,
                },
            ],
            road_money: RoadMoneyRules {
                rules: vec![RoadMoneyRule {
                    origin: "Jakarta".to_string(),
                    destination: "Surabaya".to_string(),
                    truck_type: Some("CDD".to_string()),
                    min_km: 750.0,
                    max_km: 900.0,
                    road_money: 3_121_500.0,
                    driver1_cost: None,
                    driver2_cost: None,
                }],
                fallback_per_km: 3_700.0,
                driver1_ratio: 0.22,
                driver2_ratio: 0.15,
            },
        }
    }
}

impl PricingRules {
    /// Cargar reglas desde un archivo JSON
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read pricing rules at {}", path.display()))?;
        let rules: PricingRules = serde_json::from_str(&raw)
            .with_context(|| format!("invalid pricing rules JSON at {}", path.display()))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Cargar desde `path` si existe, si no usar los valores por defecto
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let discount = self.intercity.discount_rate;
        if !(0.0..=1.0).contains(&discount) {
            return Err(anyhow!("discount_rate must be within 0..=1, got {}", discount));
        }
        for band in &self.local_bands {
            if band.min_km > band.max_km || band.price < 0.0 {
                return Err(anyhow!("invalid local band '{}'", band.name));
            }
        }
        for rule in &self.road_money.rules {
            if rule.min_km > rule.max_km || rule.road_money < 0.0 {
                return Err(anyhow!(
                    "invalid road money rule {} -> {}",
                    rule.origin,
                    rule.destination
                ));
            }
        }
        if self.toll_rate_per_km < 0.0 || self.local_min_charge < 0.0 {
            return Err(anyhow!("toll_rate_per_km and local_min_charge must be non-negative"));
        }
        Ok(())
    }
}
