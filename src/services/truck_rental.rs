//! Estimación de renta de camión: distancia/duración por variante y
//! precio por variante. Siempre responde, aun sin proveedor de rutas.

use serde::Serialize;
use std::sync::Arc;

use crate::dto::rate_dto::{TollFilter, TruckRentalRequest};
use crate::services::distance_estimator::{DistanceEstimator, EstimateSource, LegEstimate, TollVariants};
use crate::services::rate_calculator::{PriceQuote, PriceRequest, RateCalculator};
use crate::utils::errors::{validation_error, AppResult};
use crate::utils::geo::LatLng;
use crate::utils::validation::validate_coordinates;

/// Variante de ruta con su precio
#[derive(Debug, Clone, Serialize)]
pub struct PricedLeg {
    pub distance_km: f64,
    pub duration_min: f64,
    pub source: EstimateSource,
    pub price: PriceQuote,
}

#[derive(Debug, Clone)]
pub struct RentalEstimate {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub non_toll: Option<PricedLeg>,
    pub toll: Option<PricedLeg>,
}

pub struct TruckRentalService {
    estimator: Arc<DistanceEstimator>,
    calculator: Arc<RateCalculator>,
}

impl TruckRentalService {
    pub fn new(estimator: Arc<DistanceEstimator>, calculator: Arc<RateCalculator>) -> Self {
        Self {
            estimator,
            calculator,
        }
    }

    pub async fn estimate(&self, request: &TruckRentalRequest) -> AppResult<RentalEstimate> {
        validate_coordinates(request.origin.lat, request.origin.lng)
            .map_err(|_| validation_error("origin", "invalid origin coordinates"))?;
        validate_coordinates(request.destination.lat, request.destination.lng)
            .map_err(|_| validation_error("destination", "invalid destination coordinates"))?;

        let variants = match request.filter {
            Some(TollFilter::Toll) => TollVariants::Toll,
            Some(TollFilter::NonToll) => TollVariants::NonToll,
            None => TollVariants::Both,
        };

        let from = LatLng::new(request.origin.lat, request.origin.lng);
        let to = LatLng::new(request.destination.lat, request.destination.lng);
        let estimate = self.estimator.estimate(from, to, variants).await;

        let non_toll = estimate
            .non_toll
            .map(|leg| self.price_variant(request, leg, false))
            .transpose()?;
        let toll = estimate
            .toll
            .map(|leg| self.price_variant(request, leg, true))
            .transpose()?;

        Ok(RentalEstimate {
            origin: request.origin.name.clone(),
            destination: request.destination.name.clone(),
            non_toll,
            toll,
        })
    }

    fn price_variant(&self, request: &TruckRentalRequest, leg: LegEstimate, include_toll: bool) -> AppResult<PricedLeg> {
        let price = self.calculator.calculate_price(&PriceRequest {
            distance_km: leg.distance_km,
            include_toll,
            origin: request.origin.name.clone(),
            destination: request.destination.name.clone(),
            is_promo: request.is_promo,
        })?;

        Ok(PricedLeg {
            distance_km: leg.distance_km,
            duration_min: leg.duration_min,
            source: leg.source,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingRules;
    use crate::dto::rate_dto::PlaceInput;
    use crate::services::rate_calculator::PriceCategory;
    use std::time::Duration;

    fn service() -> TruckRentalService {
        TruckRentalService::new(
            Arc::new(DistanceEstimator::new(None, Duration::from_secs(1))),
            Arc::new(RateCalculator::new(Arc::new(PricingRules::default()))),
        )
    }

    fn place(name: &str, lat: f64, lng: f64) -> PlaceInput {
        PlaceInput {
            name: Some(name.to_string()),
            lat,
            lng,
        }
    }

    #[tokio::test]
    async fn test_both_variants_without_filter() {
        let response = service()
            .estimate(&TruckRentalRequest {
                origin: place("Jakarta", -6.2088, 106.8456),
                destination: place("Surabaya", -7.2575, 112.7521),
                filter: None,
                is_promo: false,
            })
            .await
            .unwrap();

        let non_toll = response.non_toll.unwrap();
        let toll = response.toll.unwrap();
        assert_eq!(non_toll.source, EstimateSource::Fallback);
        assert_eq!(non_toll.price.category, PriceCategory::IntercityFtl);
        assert_eq!(non_toll.price.toll_fee, 875_000.0);
        assert_eq!(toll.price.toll_fee, 875_000.0);
        assert!(toll.distance_km < non_toll.distance_km);
    }

    #[tokio::test]
    async fn test_filter_limits_variants() {
        let response = service()
            .estimate(&TruckRentalRequest {
                origin: place("Jakarta Pusat", -6.1865, 106.8341),
                destination: place("Jakarta Selatan", -6.2615, 106.8106),
                filter: Some(TollFilter::NonToll),
                is_promo: false,
            })
            .await
            .unwrap();
        assert!(response.toll.is_none());
        let quote = response.non_toll.unwrap();
        assert_eq!(quote.price.category, PriceCategory::LocalFtl);
        assert_eq!(quote.price.total_price, 850_000.0);
    }

    #[tokio::test]
    async fn test_invalid_coordinates() {
        let result = service()
            .estimate(&TruckRentalRequest {
                origin: place("X", 95.0, 0.0),
                destination: place("Y", 0.0, 0.0),
                filter: None,
                is_promo: false,
            })
            .await;
        assert!(result.is_err());
    }
}
