//! Desglose de "uang jalan" (dinero de ruta)
//! 
//! Monto completo conocido → tramos de liquidación 90% / 10% y costos de
//! los dos choferes.

use serde::Serialize;
use std::sync::Arc;

use crate::config::pricing_rules::{PricingRules, RoadMoneyRule};
use crate::services::rate_calculator::same_city;
use crate::utils::errors::{bad_request_error, AppResult};

const FIRST_TRANCHE: f64 = 0.9;
const SECOND_TRANCHE: f64 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct CostBreakdownRequest {
    pub origin: String,
    pub destination: String,
    pub truck_type: Option<String>,
    pub distance_km: f64,
    /// Monto completo ya conocido; si viene, no se consulta la tabla
    pub known_total: Option<f64>,
}

/// De dónde salió el monto completo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadMoneySource {
    Provided,
    RuleTable,
    PerKmFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub origin: String,
    pub destination: String,
    pub truck_type: Option<String>,
    pub distance_km: f64,
    pub uang_jalan: f64,
    pub uang_jalan_90_percent: f64,
    pub uang_jalan_10_percent: f64,
    pub driver1_cost: f64,
    pub driver2_cost: f64,
    pub source: RoadMoneySource,
}

pub struct CostBreakdownCalculator {
    rules: Arc<PricingRules>,
}

impl CostBreakdownCalculator {
    pub fn new(rules: Arc<PricingRules>) -> Self {
        Self { rules }
    }

    pub fn calculate(&self, request: &CostBreakdownRequest) -> AppResult<CostBreakdown> {
        let km = request.distance_km;
        if !km.is_finite() || km <= 0.0 {
            return Err(bad_request_error("distance_km must be greater than 0"));
        }

        let rule = self.find_rule(request);
        let road_rules = &self.rules.road_money;

        let (full, source) = match (request.known_total, rule) {
            (Some(total), _) => {
                if !total.is_finite() || total < 0.0 {
                    return Err(bad_request_error("known_total must be a non-negative number"));
                }
                (total, RoadMoneySource::Provided)
            }
            (None, Some(rule)) => (rule.road_money, RoadMoneySource::RuleTable),
            (None, None) => {
                log::info!(
                    "ℹ️ Sin regla de uang jalan para {} → {}, usando {} por km",
                    request.origin,
                    request.destination,
                    road_rules.fallback_per_km
                );
                ((km * road_rules.fallback_per_km).round(), RoadMoneySource::PerKmFallback)
            }
        };

        let driver1_cost = rule
            .and_then(|r| r.driver1_cost)
            .unwrap_or_else(|| (full * road_rules.driver1_ratio).round());
        let driver2_cost = rule
            .and_then(|r| r.driver2_cost)
            .unwrap_or_else(|| (full * road_rules.driver2_ratio).round());

        Ok(CostBreakdown {
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            truck_type: request.truck_type.clone(),
            distance_km: km,
            uang_jalan: full,
            // redondeo independiente; la suma puede diferir en 1 del total
            uang_jalan_90_percent: (full * FIRST_TRANCHE).round(),
            uang_jalan_10_percent: (full * SECOND_TRANCHE).round(),
            driver1_cost,
            driver2_cost,
            source,
        })
    }

    fn find_rule(&self, request: &CostBreakdownRequest) -> Option<&RoadMoneyRule> {
        self.rules.road_money.rules.iter().find(|rule| {
            same_city(&rule.origin, &request.origin)
                && same_city(&rule.destination, &request.destination)
                && request.distance_km >= rule.min_km
                && request.distance_km <= rule.max_km
                && match (&rule.truck_type, &request.truck_type) {
                    (Some(expected), Some(given)) => expected.eq_ignore_ascii_case(given),
                    _ => true,
                }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> CostBreakdownCalculator {
        CostBreakdownCalculator::new(Arc::new(PricingRules::default()))
    }

    fn request(origin: &str, destination: &str, km: f64) -> CostBreakdownRequest {
        CostBreakdownRequest {
            origin: origin.to_string(),
            destination: destination.to_string(),
            truck_type: Some("CDD".to_string()),
            distance_km: km,
            known_total: None,
        }
    }

    #[test]
    fn test_rule_table_tranches() {
        let breakdown = calculator().calculate(&request("Jakarta", "Surabaya", 850.0)).unwrap();
        assert_eq!(breakdown.source, RoadMoneySource::RuleTable);
        assert_eq!(breakdown.uang_jalan, 3_121_500.0);
        assert_eq!(breakdown.uang_jalan_90_percent, 2_809_350.0);
        assert_eq!(breakdown.uang_jalan_10_percent, 312_150.0);
        assert_eq!(breakdown.driver1_cost, 686_730.0);
        assert_eq!(breakdown.driver2_cost, 468_225.0);
    }

    #[test]
    fn test_known_total_wins() {
        let mut req = request("Bandung", "Cirebon", 130.0);
        req.known_total = Some(3_121_500.0);
        let breakdown = calculator().calculate(&req).unwrap();
        assert_eq!(breakdown.source, RoadMoneySource::Provided);
        assert_eq!(breakdown.uang_jalan_90_percent, 2_809_350.0);
        assert_eq!(breakdown.uang_jalan_10_percent, 312_150.0);
    }

    #[test]
    fn test_per_km_fallback() {
        let breakdown = calculator().calculate(&request("Bandung", "Cirebon", 130.0)).unwrap();
        assert_eq!(breakdown.source, RoadMoneySource::PerKmFallback);
        assert_eq!(breakdown.uang_jalan, 481_000.0);
    }

    #[test]
    fn test_rule_driver_costs_override_ratios() {
        let mut rules = PricingRules::default();
        rules.road_money.rules[0].driver1_cost = Some(700_000.0);
        let calc = CostBreakdownCalculator::new(Arc::new(rules));
        let breakdown = calc.calculate(&request("Jakarta", "Surabaya", 800.0)).unwrap();
        assert_eq!(breakdown.driver1_cost, 700_000.0);
        assert_eq!(breakdown.driver2_cost, 468_225.0);
    }

    #[test]
    fn test_tranches_round_independently() {
        let mut req = request("X", "Y", 10.0);
        req.known_total = Some(15.0);
        let breakdown = calculator().calculate(&req).unwrap();
        assert_eq!(breakdown.uang_jalan_90_percent, 14.0);
        assert_eq!(breakdown.uang_jalan_10_percent, 2.0);
    }

    #[test]
    fn test_rejects_non_positive_distance() {
        assert!(calculator().calculate(&request("Jakarta", "Surabaya", 0.0)).is_err());
        assert!(calculator().calculate(&request("Jakarta", "Surabaya", -5.0)).is_err());
    }

    #[test]
    fn test_truck_type_mismatch_skips_rule() {
        let mut req = request("Jakarta", "Surabaya", 850.0);
        req.truck_type = Some("Tronton".to_string());
        let breakdown = calculator().calculate(&req).unwrap();
        assert_eq!(breakdown.source, RoadMoneySource::PerKmFallback);
    }
}
