use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::departure::{Departure, DepartureStatus, DriverPosition};
use crate::repositories::DepartureRepository;
use crate::utils::errors::{AppError, AppResult};

pub struct PgDepartureRepository {
    pool: PgPool,
}

impl PgDepartureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn names_from(&self, table: &str, ids: &[String]) -> AppResult<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        // `table` sólo recibe literales internos
        let query = format!("SELECT id, name FROM {} WHERE id = ANY($1)", table);
        let rows: Vec<(String, String)> = sqlx::query_as(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl DepartureRepository for PgDepartureRepository {
    async fn insert(&self, d: &Departure) -> AppResult<Departure> {
        let departure = sqlx::query_as::<_, Departure>(
            r#"
            INSERT INTO departures (id, truck_id, driver_id, scheduled_at, assigned_route_id,
                current_hub, next_hub, est_fuel, est_driver1, est_driver2, other_costs,
                toll_total, grand_total, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(d.id)
        .bind(&d.truck_id)
        .bind(&d.driver_id)
        .bind(d.scheduled_at)
        .bind(d.assigned_route_id)
        .bind(&d.current_hub)
        .bind(&d.next_hub)
        .bind(d.est_fuel)
        .bind(d.est_driver1)
        .bind(d.est_driver2)
        .bind(d.other_costs)
        .bind(d.toll_total)
        .bind(d.grand_total)
        .bind(d.status)
        .bind(d.created_at)
        .bind(d.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(departure)
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Departure>> {
        let departure = sqlx::query_as::<_, Departure>("SELECT * FROM departures WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(departure)
    }

    async fn list(&self, status: Option<DepartureStatus>) -> AppResult<Vec<Departure>> {
        let departures = sqlx::query_as::<_, Departure>(
            r#"
            SELECT * FROM departures
            WHERE ($1::departure_status IS NULL OR status = $1)
            ORDER BY scheduled_at DESC, id
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(departures)
    }

    async fn update(&self, d: &Departure) -> AppResult<Departure> {
        sqlx::query_as::<_, Departure>(
            r#"
            UPDATE departures
            SET truck_id = $2, driver_id = $3, scheduled_at = $4, assigned_route_id = $5,
                current_hub = $6, next_hub = $7, est_fuel = $8, est_driver1 = $9,
                est_driver2 = $10, other_costs = $11, toll_total = $12, grand_total = $13,
                status = $14, updated_at = $15
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(d.id)
        .bind(&d.truck_id)
        .bind(&d.driver_id)
        .bind(d.scheduled_at)
        .bind(d.assigned_route_id)
        .bind(&d.current_hub)
        .bind(&d.next_hub)
        .bind(d.est_fuel)
        .bind(d.est_driver1)
        .bind(d.est_driver2)
        .bind(d.other_costs)
        .bind(d.toll_total)
        .bind(d.grand_total)
        .bind(d.status)
        .bind(d.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Departure '{}' not found", d.id)))
    }

    async fn driver_names(&self, ids: &[String]) -> AppResult<HashMap<String, String>> {
        self.names_from("drivers", ids).await
    }

    async fn hub_names(&self, ids: &[String]) -> AppResult<HashMap<String, String>> {
        self.names_from("hubs", ids).await
    }

    async fn latest_position(&self, driver_id: &str) -> AppResult<Option<DriverPosition>> {
        let position = sqlx::query_as::<_, DriverPosition>(
            r#"
            SELECT driver_id, position, recorded_at FROM driver_positions
            WHERE driver_id = $1
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(position)
    }
}
