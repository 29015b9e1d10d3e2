use std::sync::Arc;
use validator::Validate;

use crate::dto::common_dto::ApiResponse;
use crate::dto::rate_dto::{
    CalculatePriceRequest, CalculatePriceResponse, CostBreakdownBody, CostBreakdownResponse,
    FormattedBreakdown, TruckRentalRequest, TruckRentalResponse, VariantQuote,
};
use crate::services::cost_breakdown::CostBreakdownRequest;
use crate::services::rate_calculator::PriceRequest;
use crate::services::truck_rental::PricedLeg;
use crate::services::{CostBreakdownCalculator, RateCalculator, TruckRentalService};
use crate::state::AppState;
use crate::utils::currency::format_currency;
use crate::utils::errors::AppError;

pub struct RateController {
    truck_rental: Arc<TruckRentalService>,
    calculator: Arc<RateCalculator>,
    cost_breakdown: Arc<CostBreakdownCalculator>,
}

impl RateController {
    pub fn new(state: &AppState) -> Self {
        Self {
            truck_rental: state.truck_rental.clone(),
            calculator: state.rate_calculator.clone(),
            cost_breakdown: state.cost_breakdown.clone(),
        }
    }

    pub async fn truck_rental(&self, request: TruckRentalRequest) -> Result<ApiResponse<TruckRentalResponse>, AppError> {
        let estimate = self.truck_rental.estimate(&request).await?;
        Ok(ApiResponse::success(TruckRentalResponse {
            origin: estimate.origin,
            destination: estimate.destination,
            non_toll: estimate.non_toll.map(variant_quote),
            toll: estimate.toll.map(variant_quote),
        }))
    }

    /// Cálculo crudo, para verificar reglas
    pub fn calculate(&self, request: CalculatePriceRequest) -> Result<ApiResponse<CalculatePriceResponse>, AppError> {
        request.validate()?;
        let quote = self.calculator.calculate_price(&PriceRequest {
            distance_km: request.distance_km,
            include_toll: request.include_toll,
            origin: request.origin,
            destination: request.destination,
            is_promo: request.is_promo,
        })?;
        Ok(ApiResponse::success(CalculatePriceResponse {
            formatted_total: format_currency(quote.total_price, true),
            quote,
        }))
    }

    pub fn cost_breakdown(&self, body: CostBreakdownBody) -> Result<ApiResponse<CostBreakdownResponse>, AppError> {
        body.validate()?;
        let breakdown = self.cost_breakdown.calculate(&CostBreakdownRequest {
            origin: body.origin,
            destination: body.destination,
            truck_type: body.truck_type,
            distance_km: body.distance_km,
            known_total: body.known_total,
        })?;

        let formatted = FormattedBreakdown {
            uang_jalan: format_currency(breakdown.uang_jalan, true),
            uang_jalan_90_percent: format_currency(breakdown.uang_jalan_90_percent, true),
            uang_jalan_10_percent: format_currency(breakdown.uang_jalan_10_percent, true),
            driver1_cost: format_currency(breakdown.driver1_cost, true),
            driver2_cost: format_currency(breakdown.driver2_cost, true),
        };
        Ok(ApiResponse::success(CostBreakdownResponse { breakdown, formatted }))
    }
}

fn variant_quote(leg: PricedLeg) -> VariantQuote {
    VariantQuote {
        formatted_total: format_currency(leg.price.total_price, true),
        leg,
    }
}
