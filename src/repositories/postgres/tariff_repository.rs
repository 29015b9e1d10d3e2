use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Acquire, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::tariff::{
    DistanceConfig, RoutePrice, SeaFreightConfig, ServiceMultiplier, SubService, Surcharge, Tariff,
    TariffBundle, TariffFilters, VehicleDailyRate, WeightTier,
};
use crate::repositories::TariffRepository;
use crate::utils::errors::{AppError, AppResult, RowError};

pub struct PgTariffRepository {
    pool: PgPool,
}

impl PgTariffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Inserta una tarifa y todos sus hijos sobre la conexión dada
async fn insert_bundle(conn: &mut PgConnection, bundle: &TariffBundle) -> Result<(), sqlx::Error> {
    let t = &bundle.tariff;
    sqlx::query(
        r#"
        INSERT INTO tariffs (id, name, service_type, sub_service, pricing_model, customer_id,
            origin_zone, destination_zone, vehicle_type, currency, min_charge, sla_hours,
            is_active, effective_start, effective_end, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(&t.id)
    .bind(&t.name)
    .bind(t.service_type)
    .bind(t.sub_service)
    .bind(t.pricing_model)
    .bind(&t.customer_id)
    .bind(&t.origin_zone)
    .bind(&t.destination_zone)
    .bind(&t.vehicle_type)
    .bind(&t.currency)
    .bind(t.min_charge)
    .bind(t.sla_hours)
    .bind(t.is_active)
    .bind(t.effective_start)
    .bind(t.effective_end)
    .bind(t.created_at)
    .execute(&mut *conn)
    .await?;

    for tier in &bundle.weight_tiers {
        sqlx::query(
            "INSERT INTO tariff_weight_tiers (id, tariff_id, min_weight_kg, max_weight_kg, rate_per_kg) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(tier.id)
        .bind(&tier.tariff_id)
        .bind(tier.min_weight_kg)
        .bind(tier.max_weight_kg)
        .bind(tier.rate_per_kg)
        .execute(&mut *conn)
        .await?;
    }

    for price in &bundle.route_prices {
        sqlx::query(
            "INSERT INTO tariff_route_prices (id, tariff_id, origin_city, destination_city, item_type, price) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(price.id)
        .bind(&price.tariff_id)
        .bind(&price.origin_city)
        .bind(&price.destination_city)
        .bind(&price.item_type)
        .bind(price.price)
        .execute(&mut *conn)
        .await?;
    }

    if let Some(config) = &bundle.distance_config {
        sqlx::query(
            "INSERT INTO tariff_distance_configs (id, tariff_id, base_price, rate_per_km, max_km) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(config.id)
        .bind(&config.tariff_id)
        .bind(config.base_price)
        .bind(config.rate_per_km)
        .bind(config.max_km)
        .execute(&mut *conn)
        .await?;
    }

    for rate in &bundle.vehicle_daily_rates {
        sqlx::query(
            "INSERT INTO tariff_vehicle_daily_rates (id, tariff_id, vehicle_type, daily_rate, max_hours) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(rate.id)
        .bind(&rate.tariff_id)
        .bind(&rate.vehicle_type)
        .bind(rate.daily_rate)
        .bind(rate.max_hours)
        .execute(&mut *conn)
        .await?;
    }

    for sea in &bundle.sea_freight_configs {
        sqlx::query(
            "INSERT INTO tariff_sea_freight_configs (id, tariff_id, origin_port, destination_port, rate_per_cbm, currency) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(sea.id)
        .bind(&sea.tariff_id)
        .bind(&sea.origin_port)
        .bind(&sea.destination_port)
        .bind(sea.rate_per_cbm)
        .bind(&sea.currency)
        .execute(&mut *conn)
        .await?;
    }

    for surcharge in &bundle.surcharges {
        sqlx::query(
            "INSERT INTO tariff_surcharges (id, tariff_id, surcharge_type, calculation, value, condition) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(surcharge.id)
        .bind(&surcharge.tariff_id)
        .bind(&surcharge.surcharge_type)
        .bind(surcharge.calculation)
        .bind(surcharge.value)
        .bind(&surcharge.condition)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl TariffRepository for PgTariffRepository {
    async fn insert_batch(&self, bundles: &[TariffBundle]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut failures = Vec::new();

        // un savepoint por fila: un fallo no aborta la transacción y se
        // pueden reportar todas las filas que fallan
        for (index, bundle) in bundles.iter().enumerate() {
            let mut savepoint = Acquire::begin(&mut tx).await?;
            match insert_bundle(&mut savepoint, bundle).await {
                Ok(()) => savepoint.commit().await?,
                Err(e) => {
                    savepoint.rollback().await?;
                    log::warn!("⚠️ Fila {} ('{}') rechazada: {}", index + 1, bundle.tariff.name, e);
                    failures.push(RowError::new(index + 1, bundle.tariff.name.clone(), e.to_string()));
                }
            }
        }

        if !failures.is_empty() {
            tx.rollback().await?;
            return Err(AppError::BatchRejected(failures));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_bundle(&self, id: &str) -> AppResult<Option<TariffBundle>> {
        let tariff = sqlx::query_as::<_, Tariff>("SELECT * FROM tariffs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(tariff) = tariff else {
            return Ok(None);
        };

        let weight_tiers = sqlx::query_as::<_, WeightTier>(
            "SELECT * FROM tariff_weight_tiers WHERE tariff_id = $1 ORDER BY min_weight_kg",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let route_prices = sqlx::query_as::<_, RoutePrice>(
            "SELECT * FROM tariff_route_prices WHERE tariff_id = $1 ORDER BY origin_city, destination_city",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let distance_config = sqlx::query_as::<_, DistanceConfig>(
            "SELECT * FROM tariff_distance_configs WHERE tariff_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let vehicle_daily_rates = sqlx::query_as::<_, VehicleDailyRate>(
            "SELECT * FROM tariff_vehicle_daily_rates WHERE tariff_id = $1 ORDER BY vehicle_type",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let sea_freight_configs = sqlx::query_as::<_, SeaFreightConfig>(
            "SELECT * FROM tariff_sea_freight_configs WHERE tariff_id = $1 ORDER BY origin_port, destination_port",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let surcharges = sqlx::query_as::<_, Surcharge>(
            "SELECT * FROM tariff_surcharges WHERE tariff_id = $1 ORDER BY surcharge_type",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(TariffBundle {
            tariff,
            weight_tiers,
            route_prices,
            distance_config,
            vehicle_daily_rates,
            sea_freight_configs,
            surcharges,
        }))
    }

    async fn list(&self, filters: &TariffFilters) -> AppResult<Vec<Tariff>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM tariffs WHERE 1 = 1");
        if let Some(service_type) = filters.service_type {
            query.push(" AND service_type = ").push_bind(service_type);
        }
        if let Some(sub_service) = filters.sub_service {
            query.push(" AND sub_service = ").push_bind(sub_service);
        }
        if let Some(pricing_model) = filters.pricing_model {
            query.push(" AND pricing_model = ").push_bind(pricing_model);
        }
        if let Some(customer_id) = &filters.customer_id {
            query.push(" AND customer_id = ").push_bind(customer_id.clone());
        }
        if let Some(is_active) = filters.is_active {
            query.push(" AND is_active = ").push_bind(is_active);
        }
        query.push(" ORDER BY created_at DESC, id");

        let tariffs = query
            .build_query_as::<Tariff>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tariffs)
    }

    async fn set_active(&self, id: &str, is_active: bool) -> AppResult<Option<Tariff>> {
        let tariff = sqlx::query_as::<_, Tariff>(
            "UPDATE tariffs SET is_active = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tariff)
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tariffs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_multipliers(&self) -> AppResult<Vec<ServiceMultiplier>> {
        let rows = sqlx::query_as::<_, ServiceMultiplier>(
            "SELECT * FROM service_multipliers ORDER BY sub_service",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_multiplier(&self, sub_service: SubService) -> AppResult<Option<ServiceMultiplier>> {
        let row = sqlx::query_as::<_, ServiceMultiplier>(
            "SELECT * FROM service_multipliers WHERE sub_service = $1",
        )
        .bind(sub_service)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_multiplier(
        &self,
        sub_service: SubService,
        multiplier: Decimal,
    ) -> AppResult<ServiceMultiplier> {
        let row = sqlx::query_as::<_, ServiceMultiplier>(
            r#"
            INSERT INTO service_multipliers (sub_service, multiplier, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (sub_service) DO UPDATE
                SET multiplier = EXCLUDED.multiplier, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(sub_service)
        .bind(multiplier)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
