use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::master_route::{
    GateType, MasterRoute, MasterRouteFilters, MasterRouteGate, Page, RouteGate, RouteGateOnRoute,
    RoutePolyline,
};
use crate::repositories::{GateKey, RouteRepository};
use crate::utils::errors::{conflict_error, AppError, AppResult};
use crate::utils::geo::BoundingBox;

pub struct PgRouteRepository {
    pool: PgPool,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UpsertedLink {
    #[sqlx(flatten)]
    link: MasterRouteGate,
    inserted: bool,
}

/// Traducir violaciones de unicidad a `Conflict`
fn map_unique(e: sqlx::Error, resource: &str, field: &str, value: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict_error(resource, field, value),
        _ => AppError::Database(e),
    }
}

fn push_route_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &MasterRouteFilters) {
    query.push(" WHERE 1 = 1");
    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term);
        query
            .push(" AND (route_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR origin_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR destination_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(road_constraint) = filters.road_constraint {
        query.push(" AND road_constraint = ").push_bind(road_constraint);
    }
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn route_code_exists(&self, route_code: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM master_routes WHERE route_code = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(route_code)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    async fn insert_route(&self, route: &MasterRoute) -> AppResult<MasterRoute> {
        sqlx::query_as::<_, MasterRoute>(
            r#"
            INSERT INTO master_routes (id, route_code, origin_name, origin_lat, origin_lng,
                destination_name, destination_lat, destination_lng, route_type, road_constraint,
                service_zone, default_distance_km, default_duration_min, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(route.id)
        .bind(&route.route_code)
        .bind(&route.origin_name)
        .bind(route.origin_lat)
        .bind(route.origin_lng)
        .bind(&route.destination_name)
        .bind(route.destination_lat)
        .bind(route.destination_lng)
        .bind(route.route_type)
        .bind(route.road_constraint)
        .bind(&route.service_zone)
        .bind(route.default_distance_km)
        .bind(route.default_duration_min)
        .bind(&route.created_by)
        .bind(route.created_at)
        .bind(route.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Master route", "route_code", &route.route_code))
    }

    async fn find_route(&self, id: Uuid) -> AppResult<Option<MasterRoute>> {
        let route = sqlx::query_as::<_, MasterRoute>("SELECT * FROM master_routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(route)
    }

    async fn list_routes(&self, filters: &MasterRouteFilters) -> AppResult<Page<MasterRoute>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM master_routes");
        push_route_filters(&mut count, filters);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM master_routes");
        push_route_filters(&mut query, filters);
        query
            .push(" ORDER BY created_at DESC, route_code LIMIT ")
            .push_bind(filters.limit())
            .push(" OFFSET ")
            .push_bind(filters.offset());

        let items = query
            .build_query_as::<MasterRoute>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            page: filters.page(),
            limit: filters.limit(),
        })
    }

    async fn update_route(&self, route: &MasterRoute) -> AppResult<MasterRoute> {
        sqlx::query_as::<_, MasterRoute>(
            r#"
            UPDATE master_routes
            SET route_code = $2, origin_name = $3, origin_lat = $4, origin_lng = $5,
                destination_name = $6, destination_lat = $7, destination_lng = $8,
                route_type = $9, road_constraint = $10, service_zone = $11,
                default_distance_km = $12, default_duration_min = $13, updated_at = $14
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(route.id)
        .bind(&route.route_code)
        .bind(&route.origin_name)
        .bind(route.origin_lat)
        .bind(route.origin_lng)
        .bind(&route.destination_name)
        .bind(route.destination_lat)
        .bind(route.destination_lng)
        .bind(route.route_type)
        .bind(route.road_constraint)
        .bind(&route.service_zone)
        .bind(route.default_distance_km)
        .bind(route.default_duration_min)
        .bind(route.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, "Master route", "route_code", &route.route_code))?
        .ok_or_else(|| AppError::NotFound(format!("Master route '{}' not found", route.id)))
    }

    async fn delete_route(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM master_routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_gate(&self, gate: &RouteGate) -> AppResult<RouteGate> {
        sqlx::query_as::<_, RouteGate>(
            r#"
            INSERT INTO route_gates (id, name, gate_type, lat, lng, toll_fee, external_id, master_route_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(gate.id)
        .bind(&gate.name)
        .bind(gate.gate_type)
        .bind(gate.lat)
        .bind(gate.lng)
        .bind(gate.toll_fee)
        .bind(&gate.external_id)
        .bind(gate.master_route_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique(e, "Route gate", "external_id", gate.external_id.as_deref().unwrap_or(""))
        })
    }

    async fn find_gate(&self, key: &GateKey) -> AppResult<Option<RouteGate>> {
        let gate = match key {
            GateKey::Id(id) => {
                sqlx::query_as::<_, RouteGate>("SELECT * FROM route_gates WHERE id = $1")
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            GateKey::External(external_id) => {
                sqlx::query_as::<_, RouteGate>("SELECT * FROM route_gates WHERE external_id = $1")
                    .bind(external_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(gate)
    }

    async fn gates_in_bbox(
        &self,
        bbox: &BoundingBox,
        gate_type: Option<GateType>,
    ) -> AppResult<Vec<RouteGate>> {
        let gates = sqlx::query_as::<_, RouteGate>(
            r#"
            SELECT * FROM route_gates
            WHERE lng BETWEEN $1 AND $3
              AND lat BETWEEN $2 AND $4
              AND ($5::gate_type IS NULL OR gate_type = $5)
            ORDER BY name, id
            "#,
        )
        .bind(bbox.min_lng)
        .bind(bbox.min_lat)
        .bind(bbox.max_lng)
        .bind(bbox.max_lat)
        .bind(gate_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(gates)
    }

    async fn upsert_route_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        sequence_index: Option<i32>,
        toll_fee_override: Option<f64>,
    ) -> AppResult<(MasterRouteGate, bool)> {
        // xmax = 0 sólo en filas recién insertadas
        let row = sqlx::query_as::<_, UpsertedLink>(
            r#"
            INSERT INTO master_route_gates (id, master_route_id, route_gate_id, sequence_index, toll_fee_override, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (master_route_id, route_gate_id) DO UPDATE
                SET sequence_index = EXCLUDED.sequence_index,
                    toll_fee_override = EXCLUDED.toll_fee_override
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(route_id)
        .bind(gate_id)
        .bind(sequence_index)
        .bind(toll_fee_override)
        .fetch_one(&self.pool)
        .await?;
        Ok((row.link, row.inserted))
    }

    async fn update_route_gate(
        &self,
        route_id: Uuid,
        gate_id: Uuid,
        sequence_index: Option<i32>,
        toll_fee_override: Option<f64>,
    ) -> AppResult<Option<MasterRouteGate>> {
        let link = sqlx::query_as::<_, MasterRouteGate>(
            r#"
            UPDATE master_route_gates
            SET sequence_index = $3, toll_fee_override = $4
            WHERE master_route_id = $1 AND route_gate_id = $2
            RETURNING *
            "#,
        )
        .bind(route_id)
        .bind(gate_id)
        .bind(sequence_index)
        .bind(toll_fee_override)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn remove_route_gate(&self, route_id: Uuid, gate_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM master_route_gates WHERE master_route_id = $1 AND route_gate_id = $2",
        )
        .bind(route_id)
        .bind(gate_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn route_gates(&self, route_id: Uuid) -> AppResult<Vec<RouteGateOnRoute>> {
        let links = sqlx::query_as::<_, MasterRouteGate>(
            "SELECT * FROM master_route_gates WHERE master_route_id = $1",
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        if links.is_empty() {
            return Ok(Vec::new());
        }

        let gate_ids: Vec<Uuid> = links.iter().map(|l| l.route_gate_id).collect();
        let gates: HashMap<Uuid, RouteGate> =
            sqlx::query_as::<_, RouteGate>("SELECT * FROM route_gates WHERE id = ANY($1)")
                .bind(&gate_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|g| (g.id, g))
                .collect();

        Ok(links
            .iter()
            .filter_map(|link| {
                gates
                    .get(&link.route_gate_id)
                    .map(|gate| RouteGateOnRoute::resolve(link, gate))
            })
            .collect())
    }

    async fn insert_polyline(&self, polyline: &RoutePolyline) -> AppResult<RoutePolyline> {
        let row = sqlx::query_as::<_, RoutePolyline>(
            r#"
            INSERT INTO route_polylines (id, master_route_id, geometry, distance_m, duration_s, source, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(polyline.id)
        .bind(polyline.master_route_id)
        .bind(&polyline.geometry)
        .bind(polyline.distance_m)
        .bind(polyline.duration_s)
        .bind(&polyline.source)
        .bind(polyline.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn latest_polyline(&self, route_id: Uuid) -> AppResult<Option<RoutePolyline>> {
        let row = sqlx::query_as::<_, RoutePolyline>(
            "SELECT * FROM route_polylines WHERE master_route_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(route_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
