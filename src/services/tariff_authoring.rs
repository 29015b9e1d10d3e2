//! Alta y mantenimiento del catálogo de tarifas
//! 
//! El alta masiva valida todas las filas en orden de entrada y sólo llega
//! al repositorio si ninguna falla. El repositorio inserta el lote en una
//! única transacción, así que nunca queda un lote a medias.

use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::tariff_dto::{ConditionInput, CreateTariffRequest};
use crate::models::tariff::{
    new_tariff_id, DistanceConfig, RoutePrice, SeaFreightConfig, Surcharge, Tariff,
    TariffBundle, TariffFilters, VehicleDailyRate, WeightTier,
};
use crate::repositories::TariffRepository;
use crate::services::surcharge_rules::parse_condition;
use crate::utils::errors::{bad_request_error, not_found_error, AppError, AppResult, RowError};

pub struct TariffAuthoringService {
    repository: Arc<dyn TariffRepository>,
}

impl TariffAuthoringService {
    pub fn new(repository: Arc<dyn TariffRepository>) -> Self {
        Self { repository }
    }

    /// Alta masiva todo-o-nada
    pub async fn bulk_create(&self, requests: Vec<CreateTariffRequest>) -> AppResult<Vec<Tariff>> {
        if requests.is_empty() {
            return Err(bad_request_error("tariffs must contain at least one entry"));
        }

        let mut bundles = Vec::with_capacity(requests.len());
        let mut failures = Vec::new();

        for (index, request) in requests.iter().enumerate() {
            match build_bundle(request, new_tariff_id()) {
                Ok(bundle) => bundles.push(bundle),
                Err(reasons) => failures.push(RowError::new(index + 1, request.name.clone(), reasons.join("; "))),
            }
        }

        if !failures.is_empty() {
            log::warn!("❌ Alta masiva rechazada: {} de {} filas inválidas", failures.len(), requests.len());
            return Err(AppError::BatchRejected(failures));
        }

        self.repository.insert_batch(&bundles).await?;
        log::info!("✅ {} tarifas creadas", bundles.len());

        Ok(bundles.into_iter().map(|bundle| bundle.tariff).collect())
    }

    pub async fn get(&self, id: &str) -> AppResult<TariffBundle> {
        self.repository
            .find_bundle(id)
            .await?
            .ok_or_else(|| not_found_error("Tariff", id))
    }

    pub async fn list(&self, filters: &TariffFilters) -> AppResult<Vec<Tariff>> {
        self.repository.list(filters).await
    }

    /// Copia completa bajo un id nuevo, inactiva
    pub async fn duplicate(&self, id: &str) -> AppResult<TariffBundle> {
        let original = self.get(id).await?;
        let copy = original.duplicate(new_tariff_id());

        self.repository.insert_batch(std::slice::from_ref(&copy)).await?;
        log::info!("📋 Tarifa {} duplicada como {}", id, copy.tariff.id);
        Ok(copy)
    }

    pub async fn set_status(&self, id: &str, is_active: bool) -> AppResult<Tariff> {
        let tariff = self
            .repository
            .set_active(id, is_active)
            .await?
            .ok_or_else(|| not_found_error("Tariff", id))?;
        log::info!("🔄 Tarifa {} → activa={}", id, is_active);
        Ok(tariff)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.repository.delete(id).await? {
            return Err(not_found_error("Tariff", id));
        }
        log::info!("🗑️ Tarifa {} eliminada", id);
        Ok(())
    }
}

/// Motivos de rechazo de las reglas `#[validate]`, en orden de campo
fn push_invalid_fields(reasons: &mut Vec<String>, prefix: &str, input: &impl Validate) {
    if let Err(errors) = input.validate() {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        for (field, field_errors) in fields {
            for error in field_errors {
                reasons.push(format!("{}{}: invalid ({})", prefix, field, error.code));
            }
        }
    }
}

/// Valida una fila y arma la tarifa con sus hijos.
/// Devuelve todos los motivos de rechazo de la fila, no sólo el primero.
pub fn build_bundle(request: &CreateTariffRequest, id: String) -> Result<TariffBundle, Vec<String>> {
    let mut reasons = Vec::new();

    push_invalid_fields(&mut reasons, "", request);
    for (i, tier) in request.weight_tiers.iter().enumerate() {
        push_invalid_fields(&mut reasons, &format!("weight tier {} ", i + 1), tier);
    }
    for (i, price) in request.route_prices.iter().enumerate() {
        push_invalid_fields(&mut reasons, &format!("route price {} ", i + 1), price);
    }
    if let Some(config) = &request.distance_config {
        push_invalid_fields(&mut reasons, "distance config ", config);
    }
    for (i, rate) in request.vehicle_daily_rates.iter().enumerate() {
        push_invalid_fields(&mut reasons, &format!("vehicle daily rate {} ", i + 1), rate);
    }
    for (i, sea) in request.sea_freight_configs.iter().enumerate() {
        push_invalid_fields(&mut reasons, &format!("sea freight config {} ", i + 1), sea);
    }
    for (i, surcharge) in request.surcharges.iter().enumerate() {
        push_invalid_fields(&mut reasons, &format!("surcharge {} ", i + 1), surcharge);
    }

    if let Some(end) = request.effective_end {
        if end < request.effective_start {
            reasons.push("effective_end must not be before effective_start".to_string());
        }
    }

    let tariff = Tariff {
        id: id.clone(),
        name: request.name.trim().to_string(),
        service_type: request.service_type,
        sub_service: request.sub_service,
        pricing_model: request.pricing_model,
        customer_id: request.customer_id.clone(),
        origin_zone: request.origin_zone.clone(),
        destination_zone: request.destination_zone.clone(),
        vehicle_type: request.vehicle_type.clone(),
        currency: request.currency.to_uppercase(),
        min_charge: request.min_charge,
        sla_hours: request.sla_hours,
        is_active: request.is_active,
        effective_start: request.effective_start,
        effective_end: request.effective_end,
        created_at: Utc::now(),
    };

    let weight_tiers: Vec<WeightTier> = request
        .weight_tiers
        .iter()
        .map(|t| WeightTier {
            id: Uuid::new_v4(),
            tariff_id: id.clone(),
            min_weight_kg: t.min_weight_kg,
            max_weight_kg: t.max_weight_kg,
            rate_per_kg: t.rate_per_kg,
        })
        .collect();
    for (i, tier) in weight_tiers.iter().enumerate() {
        if tier.min_weight_kg >= tier.max_weight_kg {
            reasons.push(format!("weight tier {} must satisfy min < max", i + 1));
        }
        if weight_tiers[..i].iter().any(|other| other.overlaps(tier)) {
            reasons.push(format!("weight tier {} overlaps a previous tier", i + 1));
        }
    }

    let route_prices: Vec<RoutePrice> = request
        .route_prices
        .iter()
        .map(|p| RoutePrice {
            id: Uuid::new_v4(),
            tariff_id: id.clone(),
            origin_city: p.origin_city.trim().to_string(),
            destination_city: p.destination_city.trim().to_string(),
            item_type: p.item_type.clone(),
            price: p.price,
        })
        .collect();

    let distance_config = request.distance_config.as_ref().map(|c| DistanceConfig {
        id: Uuid::new_v4(),
        tariff_id: id.clone(),
        base_price: c.base_price,
        rate_per_km: c.rate_per_km,
        max_km: c.max_km,
    });

    let vehicle_daily_rates: Vec<VehicleDailyRate> = request
        .vehicle_daily_rates
        .iter()
        .map(|r| VehicleDailyRate {
            id: Uuid::new_v4(),
            tariff_id: id.clone(),
            vehicle_type: r.vehicle_type.trim().to_string(),
            daily_rate: r.daily_rate,
            max_hours: r.max_hours,
        })
        .collect();

    let sea_freight_configs: Vec<SeaFreightConfig> = request
        .sea_freight_configs
        .iter()
        .map(|s| SeaFreightConfig {
            id: Uuid::new_v4(),
            tariff_id: id.clone(),
            origin_port: s.origin_port.trim().to_string(),
            destination_port: s.destination_port.trim().to_string(),
            rate_per_cbm: s.rate_per_cbm,
            currency: s.currency.to_uppercase(),
        })
        .collect();

    let mut surcharges = Vec::with_capacity(request.surcharges.len());
    for (i, s) in request.surcharges.iter().enumerate() {
        let condition = match &s.condition {
            None => None,
            Some(ConditionInput::Expression(expr)) => Some(*expr),
            Some(ConditionInput::Text(text)) => match parse_condition(text) {
                Ok(expr) => Some(expr),
                Err(e) => {
                    reasons.push(format!("surcharge {}: {}", i + 1, e));
                    None
                }
            },
        };
        surcharges.push(Surcharge {
            id: Uuid::new_v4(),
            tariff_id: id.clone(),
            surcharge_type: s.surcharge_type.trim().to_string(),
            calculation: s.calculation,
            value: s.value,
            condition: condition.map(Json),
        });
    }

    let bundle = TariffBundle {
        tariff,
        weight_tiers,
        route_prices,
        distance_config,
        vehicle_daily_rates,
        sea_freight_configs,
        surcharges,
    };

    if let Err(reason) = bundle.check_pricing_children() {
        reasons.push(reason);
    }

    if reasons.is_empty() {
        Ok(bundle)
    } else {
        Err(reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use crate::dto::tariff_dto::{DistanceConfigInput, SurchargeInput, WeightTierInput};
    use crate::models::tariff::{PricingModel, ServiceType, SubService, SurchargeCalculation};
    use crate::repositories::memory::MemoryStore;
    use chrono::NaiveDate;

    fn weight_request(name: &str) -> CreateTariffRequest {
        CreateTariffRequest {
            name: name.to_string(),
            service_type: ServiceType::ShipGoods,
            sub_service: SubService::Regular,
            pricing_model: PricingModel::WeightBased,
            customer_id: None,
            origin_zone: Some("Jakarta".to_string()),
            destination_zone: Some("Bandung".to_string()),
            vehicle_type: None,
            currency: "IDR".to_string(),
            min_charge: Decimal::from(50_000),
            sla_hours: Some(48),
            is_active: true,
            effective_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            effective_end: None,
            weight_tiers: vec![WeightTierInput {
                min_weight_kg: Decimal::ZERO,
                max_weight_kg: Decimal::from(100),
                rate_per_kg: Decimal::from(5_000),
            }],
            route_prices: vec![],
            distance_config: None,
            vehicle_daily_rates: vec![],
            sea_freight_configs: vec![],
            surcharges: vec![],
        }
    }

    #[test]
    fn test_build_bundle_valid() {
        let bundle = build_bundle(&weight_request("Reguler JKT-BDG"), "TRF-1".to_string()).unwrap();
        assert_eq!(bundle.weight_tiers.len(), 1);
        assert_eq!(bundle.weight_tiers[0].tariff_id, "TRF-1");
    }

    #[test]
    fn test_build_bundle_missing_children() {
        let mut request = weight_request("Sin tramos");
        request.weight_tiers.clear();
        let reasons = build_bundle(&request, "TRF-1".to_string()).unwrap_err();
        assert_eq!(reasons, vec!["weight-based tariff requires at least one weight tier".to_string()]);
    }

    #[test]
    fn test_build_bundle_distance_without_config() {
        let mut request = weight_request("Distancia");
        request.pricing_model = PricingModel::DistanceBased;
        assert!(build_bundle(&request, "TRF-1".to_string()).is_err());

        request.distance_config = Some(DistanceConfigInput {
            base_price: Decimal::from(100_000),
            rate_per_km: Decimal::from(3_000),
            max_km: None,
        });
        assert!(build_bundle(&request, "TRF-1".to_string()).is_ok());
    }

    #[test]
    fn test_build_bundle_rejects_overlapping_tiers() {
        let mut request = weight_request("Solapada");
        request.weight_tiers.push(WeightTierInput {
            min_weight_kg: Decimal::from(50),
            max_weight_kg: Decimal::from(200),
            rate_per_kg: Decimal::from(4_000),
        });
        let reasons = build_bundle(&request, "TRF-1".to_string()).unwrap_err();
        assert!(reasons.iter().any(|r| r.contains("overlaps")));
    }

    #[test]
    fn test_build_bundle_adjacent_tiers_ok() {
        let mut request = weight_request("Contiguas");
        request.weight_tiers.push(WeightTierInput {
            min_weight_kg: Decimal::from(100),
            max_weight_kg: Decimal::from(500),
            rate_per_kg: Decimal::from(4_000),
        });
        assert!(build_bundle(&request, "TRF-1".to_string()).is_ok());
    }

    #[test]
    fn test_build_bundle_parses_legacy_condition() {
        let mut request = weight_request("Con recargo");
        request.surcharges.push(SurchargeInput {
            surcharge_type: "remote".to_string(),
            calculation: SurchargeCalculation::Percent,
            value: Decimal::from(10),
            condition: Some(ConditionInput::Text("DISTANCE>300".to_string())),
        });
        let bundle = build_bundle(&request, "TRF-1".to_string()).unwrap();
        assert_eq!(bundle.surcharges[0].condition.as_ref().unwrap().0.threshold, 300.0);

        request.surcharges[0].condition = Some(ConditionInput::Text("altitude > 1".to_string()));
        assert!(build_bundle(&request, "TRF-1".to_string()).is_err());
    }

    #[test]
    fn test_build_bundle_collects_several_reasons() {
        let mut request = weight_request("  ");
        request.min_charge = Decimal::from(-1);
        request.effective_end = NaiveDate::from_ymd_opt(2023, 1, 1);
        let reasons = build_bundle(&request, "TRF-1".to_string()).unwrap_err();
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[0], "min_charge: invalid (non_negative)");
    }

    #[test]
    fn test_build_bundle_rejects_negative_child_amounts() {
        let mut request = weight_request("Negativa");
        request.weight_tiers[0].rate_per_kg = Decimal::from(-10);
        request.surcharges.push(SurchargeInput {
            surcharge_type: "fuel".to_string(),
            calculation: SurchargeCalculation::Fixed,
            value: Decimal::from(-1),
            condition: None,
        });
        let reasons = build_bundle(&request, "TRF-1".to_string()).unwrap_err();
        assert_eq!(
            reasons,
            vec![
                "weight tier 1 rate_per_kg: invalid (non_negative)".to_string(),
                "surcharge 1 value: invalid (non_negative)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_bulk_create_rejects_whole_batch() {
        let store = Arc::new(MemoryStore::new());
        let service = TariffAuthoringService::new(store.clone());

        let mut requests: Vec<_> = (1..=5).map(|i| weight_request(&format!("Tarif {}", i))).collect();
        let mut bad = weight_request("Tarif rusak");
        bad.weight_tiers.clear();
        requests.insert(3, bad);

        match service.bulk_create(requests).await {
            Err(AppError::BatchRejected(rows)) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].row, 4);
                assert_eq!(rows[0].name, "Tarif rusak");
            }
            other => panic!("expected BatchRejected, got {:?}", other.map(|t| t.len())),
        }
        assert_eq!(store.count_tariffs().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_and_status() {
        let store = Arc::new(MemoryStore::new());
        let service = TariffAuthoringService::new(store.clone());

        let created = service.bulk_create(vec![weight_request("Asli")]).await.unwrap();
        let copy = service.duplicate(&created[0].id).await.unwrap();
        assert_ne!(copy.tariff.id, created[0].id);
        assert!(!copy.tariff.is_active);
        assert_eq!(copy.weight_tiers.len(), 1);
        assert_eq!(store.count_tariffs().await, 2);

        let activated = service.set_status(&copy.tariff.id, true).await.unwrap();
        assert!(activated.is_active);

        service.delete(&created[0].id).await.unwrap();
        assert!(matches!(service.get(&created[0].id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete("TRF-NOPE").await, Err(AppError::NotFound(_))));
    }
}
