//! Cotización contra el catálogo de tarifas
//! 
//! Selección de la tarifa aplicable, monto base según el modelo de precio,
//! cargo mínimo y recargos. El multiplicador de sub-servicio es un paso
//! aparte y explícito (`apply_multiplier`).

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::dto::tariff_dto::TariffQuoteRequest;
use crate::models::tariff::{
    PricingModel, ServiceMultiplier, SubService, Tariff, TariffBundle, TariffFilters,
};
use crate::repositories::TariffRepository;
use crate::services::rate_calculator::same_city;
use crate::services::surcharge_rules::{
    applicable_surcharges, decimal_fact, AppliedSurcharge, ShipmentFacts,
};
use crate::utils::errors::{bad_request_error, not_found_error, AppError, AppResult};
use crate::utils::validation::validate_non_negative;

/// Resultado del cálculo sobre una tarifa concreta
#[derive(Debug, Clone, PartialEq)]
pub struct TariffQuote {
    pub base_amount: Decimal,
    pub min_charge_applied: bool,
    pub surcharges: Vec<AppliedSurcharge>,
    pub total: Decimal,
}

/// Cotización final, sin formato de moneda
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricedQuote {
    pub tariff_id: String,
    pub tariff_name: String,
    pub pricing_model: PricingModel,
    pub base_amount: Decimal,
    pub min_charge_applied: bool,
    pub surcharges: Vec<AppliedSurcharge>,
    pub multiplier: Option<Decimal>,
    pub total: Decimal,
    pub currency: String,
}

fn overflow_error() -> AppError {
    bad_request_error("amounts are too large to price")
}

/// Escala un monto por el factor del sub-servicio
pub fn apply_multiplier(amount: Decimal, factor: Decimal) -> AppResult<Decimal> {
    amount
        .checked_mul(factor)
        .map(|scaled| scaled.round_dp(2))
        .ok_or_else(overflow_error)
}

/// Tarifa aplicable: activa, vigente en `date`, del servicio pedido.
/// Gana la específica del cliente sobre la general, luego la vigencia más reciente.
pub fn select_applicable<'a>(
    tariffs: &'a [Tariff],
    customer_id: Option<&str>,
    date: NaiveDate,
) -> Option<&'a Tariff> {
    tariffs
        .iter()
        .filter(|t| t.is_active && t.is_effective_on(date))
        .filter(|t| match (&t.customer_id, customer_id) {
            (None, _) => true,
            (Some(owner), Some(customer)) => owner == customer,
            (Some(_), None) => false,
        })
        .max_by(|a, b| {
            a.customer_id
                .is_some()
                .cmp(&b.customer_id.is_some())
                .then(a.effective_start.cmp(&b.effective_start))
                .then(a.created_at.cmp(&b.created_at))
        })
}

fn required<T: Copy>(value: Option<T>, field: &str, model: PricingModel) -> AppResult<T> {
    value.ok_or_else(|| AppError::BadRequest(format!("{} is required for {} tariffs", field, model)))
}

/// Monto según el modelo de la tarifa, más cargo mínimo y recargos
pub fn quote_tariff(bundle: &TariffBundle, request: &TariffQuoteRequest) -> AppResult<TariffQuote> {
    request.validate()?;
    let tariff = &bundle.tariff;
    let model = tariff.pricing_model;

    let base = match model {
        PricingModel::WeightBased => {
            let weight = required(request.weight_kg, "weight_kg", model)?;
            let tier = bundle
                .weight_tiers
                .iter()
                .find(|tier| tier.contains(weight))
                .ok_or_else(|| AppError::BadRequest(format!("no weight tier covers {} kg", weight)))?;
            weight.checked_mul(tier.rate_per_kg).ok_or_else(overflow_error)?
        }
        PricingModel::RouteBased => {
            let (Some(origin), Some(destination)) = (request.origin.as_deref(), request.destination.as_deref())
            else {
                return Err(AppError::BadRequest(format!(
                    "origin and destination are required for {} tariffs",
                    model
                )));
            };
            let same_pair = |p: &&crate::models::tariff::RoutePrice| {
                same_city(&p.origin_city, origin) && same_city(&p.destination_city, destination)
            };
            let wanted = request.item_type.as_deref();
            let exact = bundle.route_prices.iter().filter(same_pair).find(|p| {
                match (p.item_type.as_deref(), wanted) {
                    (Some(row), Some(item)) => row.eq_ignore_ascii_case(item),
                    (None, None) => true,
                    _ => false,
                }
            });
            let any_item = || bundle.route_prices.iter().filter(same_pair).find(|p| p.item_type.is_none());
            exact
                .or_else(any_item)
                .map(|p| p.price)
                .ok_or_else(|| AppError::BadRequest(format!("no route price for {} → {}", origin, destination)))?
        }
        PricingModel::DistanceBased => {
            let km = required(request.distance_km, "distance_km", model)?;
            let config = bundle
                .distance_config
                .as_ref()
                .ok_or_else(|| bad_request_error("tariff has no distance config"))?;
            let billable = config.max_km.map_or(km, |cap| km.min(cap));
            config
                .rate_per_km
                .checked_mul(billable)
                .and_then(|variable| config.base_price.checked_add(variable))
                .ok_or_else(overflow_error)?
        }
        PricingModel::DailyBased => {
            let days = required(request.days, "days", model)?;
            let vehicle = request.vehicle_type.as_deref().or(tariff.vehicle_type.as_deref());
            let rate = match vehicle {
                Some(vehicle) => bundle
                    .vehicle_daily_rates
                    .iter()
                    .find(|r| r.vehicle_type.eq_ignore_ascii_case(vehicle)),
                None if bundle.vehicle_daily_rates.len() == 1 => bundle.vehicle_daily_rates.first(),
                None => return Err(bad_request_error("vehicle_type is required for daily-based tariffs")),
            }
            .ok_or_else(|| AppError::BadRequest(format!("no daily rate for vehicle {:?}", vehicle)))?;
            days.checked_mul(rate.daily_rate).ok_or_else(overflow_error)?
        }
    };

    let min_charge_applied = base < tariff.min_charge;
    let base_amount = if min_charge_applied { tariff.min_charge } else { base };

    let facts = ShipmentFacts {
        distance_km: decimal_fact(request.distance_km),
        weight_kg: decimal_fact(request.weight_kg),
        days: decimal_fact(request.days),
        volume_cbm: decimal_fact(request.volume_cbm),
    };
    let surcharges = applicable_surcharges(&bundle.surcharges, base_amount, &facts).ok_or_else(overflow_error)?;
    let total = surcharges
        .iter()
        .try_fold(base_amount, |acc, s| acc.checked_add(s.amount))
        .ok_or_else(overflow_error)?;

    Ok(TariffQuote {
        base_amount,
        min_charge_applied,
        surcharges,
        total,
    })
}

pub struct TariffPricingService {
    repository: Arc<dyn TariffRepository>,
}

impl TariffPricingService {
    pub fn new(repository: Arc<dyn TariffRepository>) -> Self {
        Self { repository }
    }

    /// Selección + cálculo + multiplicador opcional
    pub async fn quote(&self, request: &TariffQuoteRequest) -> AppResult<PricedQuote> {
        let bundle = match &request.tariff_id {
            Some(id) => self
                .repository
                .find_bundle(id)
                .await?
                .ok_or_else(|| not_found_error("Tariff", id))?,
            None => self.find_applicable(request).await?,
        };

        let quote = quote_tariff(&bundle, request)?;

        let multiplier = if request.apply_multiplier {
            Some(self.multiplier_for(bundle.tariff.sub_service).await?)
        } else {
            None
        };
        let total = match multiplier {
            Some(factor) => apply_multiplier(quote.total, factor)?,
            None => quote.total,
        };

        log::info!(
            "💰 Cotización con tarifa {} ({}): {}",
            bundle.tariff.id,
            bundle.tariff.pricing_model,
            total
        );

        Ok(PricedQuote {
            tariff_id: bundle.tariff.id.clone(),
            tariff_name: bundle.tariff.name.clone(),
            pricing_model: bundle.tariff.pricing_model,
            base_amount: quote.base_amount,
            min_charge_applied: quote.min_charge_applied,
            surcharges: quote.surcharges,
            multiplier,
            total,
            currency: bundle.tariff.currency.clone(),
        })
    }

    async fn find_applicable(&self, request: &TariffQuoteRequest) -> AppResult<TariffBundle> {
        let (Some(service_type), Some(sub_service)) = (request.service_type, request.sub_service) else {
            return Err(bad_request_error("service_type and sub_service are required without tariff_id"));
        };

        let candidates = self
            .repository
            .list(&TariffFilters {
                service_type: Some(service_type),
                sub_service: Some(sub_service),
                is_active: Some(true),
                ..TariffFilters::default()
            })
            .await?;

        let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
        let tariff = select_applicable(&candidates, request.customer_id.as_deref(), date)
            .ok_or_else(|| AppError::NotFound(format!("no applicable tariff for {:?}/{:?} on {}", service_type, sub_service, date)))?;

        self.repository
            .find_bundle(&tariff.id)
            .await?
            .ok_or_else(|| not_found_error("Tariff", &tariff.id))
    }

    /// Factor del sub-servicio; sin fila = 1
    pub async fn multiplier_for(&self, sub_service: SubService) -> AppResult<Decimal> {
        Ok(self
            .repository
            .find_multiplier(sub_service)
            .await?
            .map_or(Decimal::ONE, |m| m.multiplier))
    }

    pub async fn list_multipliers(&self) -> AppResult<Vec<ServiceMultiplier>> {
        self.repository.list_multipliers().await
    }

    pub async fn upsert_multiplier(&self, sub_service: SubService, multiplier: Decimal) -> AppResult<ServiceMultiplier> {
        if validate_non_negative(&multiplier).is_err() {
            return Err(bad_request_error("multiplier must be non-negative"));
        }
        let saved = self.repository.upsert_multiplier(sub_service, multiplier).await?;
        log::info!("🔧 Multiplicador {:?} = {}", sub_service, multiplier);
        Ok(saved)
    }
}
