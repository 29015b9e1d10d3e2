use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dto::common_dto::ApiResponse;
use crate::dto::tariff_dto::{
    BulkCreateTariffsResponse, CreateTariffRequest, ImportReport, TariffListQuery,
    TariffQuoteRequest, TariffQuoteResponse,
};
use crate::models::tariff::{ServiceMultiplier, SubService, Tariff, TariffBundle, TariffFilters};
use crate::services::tariff_import::{import_file, save_upload};
use crate::services::{TariffAuthoringService, TariffPricingService};
use crate::state::AppState;
use crate::utils::currency::format_currency;
use crate::utils::errors::AppError;

pub struct TariffController {
    authoring: Arc<TariffAuthoringService>,
    pricing: Arc<TariffPricingService>,
    upload_dir: PathBuf,
}

impl TariffController {
    pub fn new(state: &AppState) -> Self {
        Self {
            authoring: state.tariff_authoring.clone(),
            pricing: state.tariff_pricing.clone(),
            upload_dir: state.config.upload_dir.clone(),
        }
    }

    pub async fn bulk_create(
        &self,
        tariffs: Vec<CreateTariffRequest>,
    ) -> Result<ApiResponse<BulkCreateTariffsResponse>, AppError> {
        let created = self.authoring.bulk_create(tariffs).await?;
        let count = created.len();
        Ok(ApiResponse::success_with_message(
            BulkCreateTariffsResponse {
                created: count,
                tariffs: created,
            },
            format!("{} tarifas creadas", count),
        ))
    }

    pub async fn list(&self, query: TariffListQuery) -> Result<ApiResponse<Vec<Tariff>>, AppError> {
        let filters = TariffFilters {
            service_type: query.service_type,
            sub_service: query.sub_service,
            pricing_model: query.pricing_model,
            customer_id: query.customer_id,
            is_active: query.is_active,
        };
        Ok(ApiResponse::success(self.authoring.list(&filters).await?))
    }

    pub async fn get(&self, id: &str) -> Result<ApiResponse<TariffBundle>, AppError> {
        Ok(ApiResponse::success(self.authoring.get(id).await?))
    }

    pub async fn duplicate(&self, id: &str) -> Result<ApiResponse<TariffBundle>, AppError> {
        let copy = self.authoring.duplicate(id).await?;
        Ok(ApiResponse::success_with_message(
            copy,
            "Tarifa duplicada (inactiva)".to_string(),
        ))
    }

    pub async fn set_status(&self, id: &str, is_active: bool) -> Result<ApiResponse<Tariff>, AppError> {
        Ok(ApiResponse::success(self.authoring.set_status(id, is_active).await?))
    }

    pub async fn delete(&self, id: &str) -> Result<ApiResponse<()>, AppError> {
        self.authoring.delete(id).await?;
        Ok(ApiResponse::message("Tarifa eliminada".to_string()))
    }

    /// Guarda la planilla, la valida y la borra; no persiste tarifas
    pub async fn import(&self, file_name: String, bytes: Vec<u8>) -> Result<ApiResponse<ImportReport>, AppError> {
        let path = save_upload(&self.upload_dir, &file_name, &bytes).await?;
        let report = tokio::task::spawn_blocking(move || import_file(&path, &file_name))
            .await
            .map_err(|e| AppError::Internal(format!("import task failed: {}", e)))??;
        Ok(ApiResponse::success(report))
    }

    pub async fn quote(&self, request: TariffQuoteRequest) -> Result<ApiResponse<TariffQuoteResponse>, AppError> {
        let quote = self.pricing.quote(&request).await?;
        let formatted_total = format_currency(quote.total.to_f64().unwrap_or(0.0), quote.currency == "IDR");
        Ok(ApiResponse::success(TariffQuoteResponse { quote, formatted_total }))
    }

    pub async fn list_multipliers(&self) -> Result<ApiResponse<Vec<ServiceMultiplier>>, AppError> {
        Ok(ApiResponse::success(self.pricing.list_multipliers().await?))
    }

    pub async fn upsert_multiplier(
        &self,
        sub_service: SubService,
        multiplier: Decimal,
    ) -> Result<ApiResponse<ServiceMultiplier>, AppError> {
        Ok(ApiResponse::success(
            self.pricing.upsert_multiplier(sub_service, multiplier).await?,
        ))
    }
}
